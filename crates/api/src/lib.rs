//! HTTP, gRPC and metrics server for the PVZ service.
//!
//! Provides the REST endpoints for pickup points, receptions and products,
//! the read-only `pvz.v1.PVZService` gRPC service, and a separate Prometheus
//! listener, with structured logging (tracing) throughout.

pub mod auth;
pub mod config;
pub mod error;
pub mod grpc;
pub mod routes;

/// Generated protobuf types and gRPC service traits.
pub mod proto {
    #![allow(clippy::all)]
    tonic::include_proto!("pvz.v1");
}

use std::sync::Arc;

use axum::Router;
use axum::middleware;
use axum::routing::{get, post};
use domain::{IdentityService, LifecycleEngine, PvzQuery};
use metrics_exporter_prometheus::PrometheusHandle;
use storage::PvzStore;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use auth::TokenAuthority;

/// Shared application state accessible from all handlers.
pub struct AppState<S: PvzStore> {
    pub engine: LifecycleEngine<S>,
    pub query: PvzQuery<S>,
    pub identity: IdentityService<S>,
    pub tokens: Arc<dyn TokenAuthority>,
}

/// Wires the domain services over one store.
pub fn create_state<S: PvzStore + Clone + 'static>(
    store: S,
    tokens: Arc<dyn TokenAuthority>,
) -> Arc<AppState<S>> {
    Arc::new(AppState {
        engine: LifecycleEngine::new(store.clone()),
        query: PvzQuery::new(store.clone()),
        identity: IdentityService::new(store),
        tokens,
    })
}

/// Creates the Axum application router with all API routes.
pub fn create_app<S: PvzStore + Clone + 'static>(state: Arc<AppState<S>>) -> Router {
    Router::new()
        .route("/ping", get(routes::ping::ping))
        .route("/dummyLogin", post(routes::auth::dummy_login::<S>))
        .route("/register", post(routes::auth::register::<S>))
        .route("/login", post(routes::auth::login::<S>))
        .route(
            "/pvz",
            post(routes::pvz::create::<S>).get(routes::pvz::list::<S>),
        )
        .route(
            "/pvz/{pvz_id}/close_last_reception",
            post(routes::pvz::close_last_reception::<S>),
        )
        .route(
            "/pvz/{pvz_id}/delete_last_product",
            post(routes::pvz::delete_last_product::<S>),
        )
        .route("/receptions", post(routes::receptions::open::<S>))
        .route("/products", post(routes::products::add::<S>))
        .route_layer(middleware::from_fn(routes::metrics::track_requests))
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the router served on the metrics port.
pub fn create_metrics_app(metrics_handle: PrometheusHandle) -> Router {
    Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle)
}
