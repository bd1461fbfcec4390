//! Reception endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use domain::{Operation, ReceptionView};
use serde::{Deserialize, Serialize};
use storage::{PvzId, PvzStore, Reception, ReceptionId, ReceptionStatus};

use crate::AppState;
use crate::auth::Caller;
use crate::error::ApiError;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenReceptionRequest {
    pub pvz_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceptionResponse {
    pub id: ReceptionId,
    pub date_time: DateTime<Utc>,
    pub pvz_id: PvzId,
    pub status: ReceptionStatus,
}

impl From<Reception> for ReceptionResponse {
    fn from(reception: Reception) -> Self {
        Self {
            id: reception.id,
            date_time: reception.created_at,
            pvz_id: reception.pvz_id,
            status: reception.status,
        }
    }
}

impl From<&ReceptionView> for ReceptionResponse {
    fn from(view: &ReceptionView) -> Self {
        Self {
            id: view.id,
            date_time: view.date_time,
            pvz_id: view.pvz_id,
            status: view.status,
        }
    }
}

/// POST /receptions: opens a reception at the pickup point.
#[tracing::instrument(skip(state, body))]
pub async fn open<S: PvzStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    caller: Caller,
    body: Result<Json<OpenReceptionRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ReceptionResponse>), ApiError> {
    caller.require(Operation::OpenReception)?;
    let Json(req) = body?;
    let reception = state
        .engine
        .open_reception(caller.subject, &req.pvz_id)
        .await?;
    Ok((StatusCode::CREATED, Json(reception.into())))
}
