//! gRPC surface: `pvz.v1.PVZService`.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use storage::{Pvz, PvzStore};
use tonic::{Request, Response, Status};

use crate::AppState;
use crate::error::ApiError;
use crate::proto::pvz_service_server::{PvzService, PvzServiceServer};
use crate::proto::{GetPvzListRequest, GetPvzListResponse, Pvz as PvzMessage};

/// Read-only gRPC service backed by the shared application state.
pub struct PvzGrpcService<S: PvzStore> {
    state: Arc<AppState<S>>,
}

impl<S: PvzStore + Clone + 'static> PvzGrpcService<S> {
    pub fn new(state: Arc<AppState<S>>) -> Self {
        Self { state }
    }

    /// Wraps the service for `tonic::transport::Server::add_service`.
    pub fn into_server(self) -> PvzServiceServer<Self> {
        PvzServiceServer::new(self)
    }
}

fn timestamp(at: DateTime<Utc>) -> prost_types::Timestamp {
    prost_types::Timestamp {
        seconds: at.timestamp(),
        nanos: i32::try_from(at.timestamp_subsec_nanos()).unwrap_or(0),
    }
}

impl From<Pvz> for PvzMessage {
    fn from(pvz: Pvz) -> Self {
        Self {
            id: pvz.id.to_string(),
            registration_date: Some(timestamp(pvz.created_at)),
            city: pvz.city.to_string(),
        }
    }
}

#[tonic::async_trait]
impl<S: PvzStore + Clone + 'static> PvzService for PvzGrpcService<S> {
    async fn get_pvz_list(
        &self,
        request: Request<GetPvzListRequest>,
    ) -> Result<Response<GetPvzListResponse>, Status> {
        let started = Instant::now();
        let peer = request
            .remote_addr()
            .map_or_else(|| "unknown".to_string(), |addr| addr.to_string());

        let result = self.state.query.list_all_pickup_points().await;
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        let status = if result.is_ok() { "ok" } else { "error" };
        metrics::counter!("grpc_requests_total", "method" => "GetPVZList", "status" => status)
            .increment(1);

        let listed = result.map_err(|err| {
            tracing::warn!(%peer, elapsed_ms, error = %err, "GetPVZList failed");
            Status::from(ApiError::from(err))
        })?;
        tracing::info!(%peer, count = listed.len(), elapsed_ms, "GetPVZList served");

        Ok(Response::new(GetPvzListResponse {
            pvzs: listed.into_iter().map(PvzMessage::from).collect(),
        }))
    }
}
