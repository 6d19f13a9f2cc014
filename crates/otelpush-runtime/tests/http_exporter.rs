//! HTTP exporter against a local mock collector.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::routing::post;
use axum::Router;

use otelpush_core::{KeyValue, MeterProvider, Snapshot};
use otelpush_runtime::export::{ExportError, HttpExporter, MetricExporter};

#[derive(Clone, Default)]
struct Captured {
    requests: Arc<Mutex<Vec<(String, Bytes)>>>,
}

async fn accept(State(c): State<Captured>, headers: HeaderMap, body: Bytes) -> StatusCode {
    let ct = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    c.requests.lock().unwrap().push((ct, body));
    StatusCode::OK
}

async fn partial() -> (StatusCode, &'static str) {
    (
        StatusCode::OK,
        r#"{"partialSuccess":{"rejectedDataPoints":"2","errorMessage":"unit mismatch"}}"#,
    )
}

async fn overloaded() -> (StatusCode, &'static str) {
    (StatusCode::SERVICE_UNAVAILABLE, "overloaded")
}

async fn garbage() -> (StatusCode, &'static str) {
    (StatusCode::OK, "<html>not otlp</html>")
}

async fn slow() -> StatusCode {
    tokio::time::sleep(Duration::from_secs(5)).await;
    StatusCode::OK
}

async fn mock_collector() -> (SocketAddr, Captured) {
    let captured = Captured::default();
    let app = Router::new()
        .route("/v1/metrics", post(accept))
        .route("/partial", post(partial))
        .route("/overloaded", post(overloaded))
        .route("/garbage", post(garbage))
        .route("/slow", post(slow))
        .with_state(captured.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, captured)
}

fn snapshot_with(value: i64) -> Snapshot {
    let p = MeterProvider::builder().build().unwrap();
    let c = p.meter("demo").create_counter("http.server.requests", "", "{requests}").unwrap();
    c.add(value, &[KeyValue::new("http.route", "/")]).unwrap();
    p.snapshot()
}

fn exporter(addr: SocketAddr, path: &str, timeout: Duration) -> HttpExporter {
    HttpExporter::new(format!("http://{addr}{path}"), timeout).unwrap()
}

#[tokio::test]
async fn posts_json_and_acks_2xx() {
    let (addr, captured) = mock_collector().await;
    let exp = exporter(addr, "/v1/metrics", Duration::from_secs(2));

    let ack = exp.export(snapshot_with(5)).await.unwrap();
    assert_eq!(ack.status, 200);
    assert_eq!(ack.rejected_data_points, 0);
    assert_eq!(exp.describe(), format!("http://{addr}/v1/metrics"));

    let reqs = captured.requests.lock().unwrap();
    assert_eq!(reqs.len(), 1);
    assert_eq!(reqs[0].0, "application/json");
    let body: serde_json::Value = serde_json::from_slice(&reqs[0].1).unwrap();
    let dp = &body["resourceMetrics"][0]["scopeMetrics"][0]["metrics"][0]["sum"]["dataPoints"][0];
    assert_eq!(dp["asInt"], "5");
}

#[tokio::test]
async fn partial_success_is_reported_in_ack() {
    let (addr, _) = mock_collector().await;
    let ack = exporter(addr, "/partial", Duration::from_secs(2))
        .export(snapshot_with(1))
        .await
        .unwrap();
    assert_eq!(ack.rejected_data_points, 2);
    assert_eq!(ack.message.as_deref(), Some("unit mismatch"));
}

#[tokio::test]
async fn non_2xx_is_protocol_error() {
    let (addr, _) = mock_collector().await;
    let err = exporter(addr, "/overloaded", Duration::from_secs(2))
        .export(snapshot_with(1))
        .await
        .unwrap_err();
    match err {
        ExportError::Protocol { status, message } => {
            assert_eq!(status, Some(503));
            assert!(message.contains("overloaded"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn unknown_path_is_protocol_error() {
    let (addr, _) = mock_collector().await;
    let err = exporter(addr, "/nope", Duration::from_secs(2))
        .export(snapshot_with(1))
        .await
        .unwrap_err();
    assert!(matches!(err, ExportError::Protocol { status: Some(404), .. }));
    assert!(!err.is_transport_like());
}

#[tokio::test]
async fn malformed_body_is_protocol_error() {
    let (addr, _) = mock_collector().await;
    let err = exporter(addr, "/garbage", Duration::from_secs(2))
        .export(snapshot_with(1))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "protocol");
}

#[tokio::test]
async fn connection_refused_is_transport_error() {
    let addr = {
        let l = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        l.local_addr().unwrap()
    };
    let err = exporter(addr, "/v1/metrics", Duration::from_secs(2))
        .export(snapshot_with(1))
        .await
        .unwrap_err();
    assert!(matches!(err, ExportError::Transport(_)), "got {err}");
    assert!(err.is_transport_like());
}

#[tokio::test]
async fn request_timeout_is_transport_error() {
    let (addr, _) = mock_collector().await;
    let err = exporter(addr, "/slow", Duration::from_millis(200))
        .export(snapshot_with(1))
        .await
        .unwrap_err();
    assert!(err.is_transport_like(), "got {err}");
}
