//! otelpush demo service.
//!
//! - `GET /` records `http.server.requests` and `http.server.active_requests`
//! - Cumulative snapshots are pushed every `exporter.interval_ms` to
//!   `OTEL_EXPORTER_OTLP_ENDPOINT` + `/v1/metrics`
//! - Ctrl-C drains HTTP, then flushes the collector once

use std::net::SocketAddr;
use tracing_subscriber::{fmt, EnvFilter};

use otelpush_core::error::{MetricsError, Result};
use otelpush_runtime::{app_state::AppState, config, router};

#[tokio::main]
async fn main() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, code = e.code().as_str(), "otelpush-demo failed");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cfg = config::load()?;
    let listen: SocketAddr = cfg
        .app
        .listen
        .parse()
        .map_err(|e| MetricsError::Config(format!("app.listen must be a valid SocketAddr: {e}")))?;

    let state = AppState::from_config(cfg)?;
    state.collector().start()?;
    let app = router::build_router(state.clone());

    tracing::info!(%listen, endpoint = %state.cfg().exporter.url(), "otelpush-demo starting");
    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .map_err(|e| MetricsError::Internal(format!("failed to bind {listen}: {e}")))?;

    let drain = state.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown requested, draining");
            drain.set_draining();
        })
        .await
        .map_err(|e| MetricsError::Internal(format!("server failed: {e}")))?;

    state.collector().shutdown().await
}
