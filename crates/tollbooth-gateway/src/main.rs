//! Tollbooth gateway binary.
//!
//! - Config: `tollbooth.yaml` (or `$TOLLBOOTH_CONFIG`), strict parsing + validation
//! - Quota store: in-process or Redis, chosen by `rate_limit.store.backend`
//! - Graceful shutdown on ctrl-c (readiness flips to draining first)

use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{fmt, EnvFilter};

use tollbooth_core::error::{GateError, Result};
use tollbooth_gateway::{app_state::AppState, config, ingest::DiscardSink, router, store};

#[tokio::main]
async fn main() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, "tollbooth-gateway failed");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let path = config::config_path();
    let cfg = config::load_from_file(&path)?;
    let listen: SocketAddr = cfg
        .server
        .listen
        .parse()
        .map_err(|e| GateError::Config(format!("server.listen must be a valid SocketAddr: {e}")))?;

    let store = store::build(&cfg.rate_limit.store).await?;
    let state = AppState::new(cfg, store, Arc::new(DiscardSink))?;
    let app = router::build_router(state.clone())?;

    tracing::info!(%listen, config = %path, "tollbooth-gateway starting");
    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .map_err(|e| GateError::Internal(format!("bind {listen} failed: {e}")))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(state))
        .await
        .map_err(|e| GateError::Internal(format!("server failed: {e}")))
}

async fn shutdown_signal(state: AppState) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "ctrl-c handler unavailable");
        std::future::pending::<()>().await;
    }
    state.metrics().set_draining();
    tracing::info!("shutdown requested, draining");
}
