//! API server entry point.
//!
//! Runs the HTTP API, the metrics listener and the gRPC service as separate
//! tasks. A shared watch channel tells all of them to stop, either on SIGINT /
//! SIGTERM or when any one of them exits on its own.

use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use api::AppState;
use api::auth::{JwtAuth, TokenAuthority};
use api::config::Config;
use api::grpc::PvzGrpcService;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use storage::{InMemoryPvzStore, PostgresPvzStore, PvzStore};
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

const DB_MAX_CONNECTIONS: u32 = 10;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
#[allow(clippy::expect_used)]
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

/// Resolves once shutdown has been requested or the sender is gone.
async fn stopped(mut shutdown: watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}

/// Runs one listener until it exits, or until shutdown is requested and it
/// finishes draining. Draining longer than `drain` abandons open connections.
async fn supervise<F, E>(
    name: &'static str,
    server: F,
    shutdown: watch::Receiver<bool>,
    drain: Duration,
) -> Result<(), BoxError>
where
    F: Future<Output = Result<(), E>> + Send,
    E: Into<BoxError> + Send,
{
    tokio::pin!(server);

    tokio::select! {
        result = &mut server => {
            tracing::warn!(listener = name, "listener exited before shutdown");
            return result.map_err(Into::into);
        }
        () = stopped(shutdown) => {}
    }

    tracing::info!(listener = name, "draining");
    match tokio::time::timeout(drain, server).await {
        Ok(result) => result.map_err(Into::into),
        Err(_) => {
            tracing::warn!(listener = name, ?drain, "drain timed out, dropping open connections");
            Ok(())
        }
    }
}

async fn serve<S: PvzStore + Clone + 'static>(
    config: &Config,
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Result<(), BoxError> {
    let http_listener = TcpListener::bind(config.addr()).await?;
    let metrics_listener = TcpListener::bind(config.metrics_addr()).await?;
    let grpc_addr: SocketAddr = config.grpc_addr().parse()?;

    tracing::info!(addr = %config.addr(), "starting API server");
    tracing::info!(addr = %config.metrics_addr(), "starting metrics server");
    tracing::info!(addr = %grpc_addr, "starting gRPC server");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let drain = config.shutdown_timeout;
    let mut tasks = JoinSet::new();

    let http = axum::serve(http_listener, api::create_app(state.clone()))
        .with_graceful_shutdown(stopped(shutdown_rx.clone()))
        .into_future();
    tasks.spawn(supervise("http", http, shutdown_rx.clone(), drain));

    let metrics = axum::serve(metrics_listener, api::create_metrics_app(metrics_handle))
        .with_graceful_shutdown(stopped(shutdown_rx.clone()))
        .into_future();
    tasks.spawn(supervise("metrics", metrics, shutdown_rx.clone(), drain));

    let grpc = tonic::transport::Server::builder()
        .add_service(PvzGrpcService::new(state).into_server())
        .serve_with_shutdown(grpc_addr, stopped(shutdown_rx.clone()));
    tasks.spawn(supervise("grpc", grpc, shutdown_rx, drain));

    let mut failure: Option<BoxError> = None;
    tokio::select! {
        () = shutdown_signal() => {}
        Some(joined) = tasks.join_next() => {
            failure = joined_error(joined);
        }
    }

    let _ = shutdown_tx.send(true);
    while let Some(joined) = tasks.join_next().await {
        if let Some(err) = joined_error(joined) {
            tracing::error!(error = %err, "listener failed during shutdown");
            failure.get_or_insert(err);
        }
    }

    match failure {
        Some(err) => Err(err),
        None => {
            tracing::info!("server shut down gracefully");
            Ok(())
        }
    }
}

fn joined_error(
    joined: Result<Result<(), BoxError>, tokio::task::JoinError>,
) -> Option<BoxError> {
    match joined {
        Ok(Ok(())) => None,
        Ok(Err(err)) => Some(err),
        Err(err) => Some(Box::new(err)),
    }
}

async fn run(config: Config) -> Result<(), BoxError> {
    let metrics_handle = PrometheusBuilder::new().install_recorder()?;

    if config.uses_default_secret() {
        tracing::warn!("JWT_SECRET_KEY is not set, signing tokens with the development secret");
    }
    let tokens: Arc<dyn TokenAuthority> = Arc::new(JwtAuth::new(&config.jwt_secret));

    match config.database_url.as_deref() {
        Some(url) => {
            let store = PostgresPvzStore::connect(url, DB_MAX_CONNECTIONS).await?;
            store.run_migrations().await?;
            tracing::info!("connected to PostgreSQL, migrations applied");
            serve(&config, api::create_state(store, tokens), metrics_handle).await
        }
        None => {
            tracing::warn!("no database configured, using the in-memory store");
            let store = InMemoryPvzStore::new();
            serve(&config, api::create_state(store, tokens), metrics_handle).await
        }
    }
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    if config.json_logs {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("invalid configuration: {err}");
            return ExitCode::FAILURE;
        }
    };
    init_tracing(&config);

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "server failed");
            ExitCode::FAILURE
        }
    }
}
