//! HTTP handlers.
//!
//! - `/`        : demo page, instrumented with the request counters
//! - `/healthz` : liveness
//! - `/readyz`  : readiness (503 when draining)
//! - `/metrics` : Prometheus text rendering of the current snapshot

use axum::extract::{MatchedPath, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};

use crate::app_state::AppState;
use crate::obs::prometheus;

pub async fn hello(State(state): State<AppState>, path: MatchedPath) -> Html<&'static str> {
    let instruments = state.instruments();
    let _active = instruments.track_active();
    instruments.record_request(path.as_str());

    Html(
        "<h1>Welcome to the OpenTelemetry Metrics Demo!</h1>\
         <p>Each visit increments the <b>http.server.requests</b> counter.</p>\
         <p>Raw values are available at <code>/metrics</code>.</p>",
    )
}

pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

pub async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    if state.is_draining() {
        (StatusCode::SERVICE_UNAVAILABLE, "draining")
    } else {
        (StatusCode::OK, "ready")
    }
}

pub async fn metrics(State(state): State<AppState>) -> Response {
    let snapshot = state.provider().snapshot();
    let body = prometheus::render_with_stats(&snapshot, &state.collector().stats());

    (
        StatusCode::OK,
        [(axum::http::header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        body,
    )
        .into_response()
}
