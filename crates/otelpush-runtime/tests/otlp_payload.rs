//! OTLP/JSON wire shape.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::fs;

use serde_json::Value as Json;

use otelpush_core::{KeyValue, MeterProvider, ResourceIdentity};
use otelpush_runtime::export::otlp_json;

fn load(name: &str) -> Json {
    let s = fs::read_to_string(format!("tests/vectors/{name}")).unwrap();
    serde_json::from_str(&s).unwrap()
}

fn demo_provider() -> MeterProvider {
    let resource = ResourceIdentity::builder()
        .service_name("otel-metrics-demo")
        .service_version("0.1.0")
        .instance_id("test-1")
        .build();
    MeterProvider::builder().with_resource(resource).build().unwrap()
}

/// Replace the (non-deterministic) timestamps with "0" after checking them.
fn zero_timestamps(v: &mut Json) {
    for rm in v["resourceMetrics"].as_array_mut().unwrap() {
        for sm in rm["scopeMetrics"].as_array_mut().unwrap() {
            for m in sm["metrics"].as_array_mut().unwrap() {
                for dp in m["sum"]["dataPoints"].as_array_mut().unwrap() {
                    for field in ["startTimeUnixNano", "timeUnixNano"] {
                        let ts: u64 = dp[field].as_str().unwrap().parse().unwrap();
                        assert!(ts > 0, "{field} must be set");
                        dp[field] = Json::String("0".into());
                    }
                }
            }
        }
    }
}

#[test]
fn demo_payload_matches_vector() {
    let p = demo_provider();
    let meter = p.meter("otel-metrics-demo");
    let requests = meter
        .create_counter("http.server.requests", "Total number of HTTP requests received.", "{requests}")
        .unwrap();
    let active = meter
        .create_up_down_counter("http.server.active_requests", "Number of in-flight requests.", "{requests}")
        .unwrap();
    for _ in 0..5 {
        requests.add(1, &[KeyValue::new("http.route", "/")]).unwrap();
    }
    active.add(1, &[]);
    active.add(-1, &[]);

    let body = otlp_json::encode(&p.snapshot()).unwrap();
    let mut got: Json = serde_json::from_slice(&body).unwrap();
    zero_timestamps(&mut got);
    assert_eq!(got, load("payload_demo.json"));
}

#[test]
fn attribute_value_types_encode_per_proto3_json() {
    let p = demo_provider();
    let c = p.meter("types").create_counter("typed", "", "").unwrap();
    c.add(
        1,
        &[
            KeyValue::new("b", true),
            KeyValue::new("d", 0.5),
            KeyValue::new("i", 9_007_199_254_740_993_i64),
            KeyValue::new("s", "x"),
        ],
    )
    .unwrap();

    let v: Json = serde_json::from_slice(&otlp_json::encode(&p.snapshot()).unwrap()).unwrap();
    let attrs = &v["resourceMetrics"][0]["scopeMetrics"][0]["metrics"][0]["sum"]["dataPoints"][0]["attributes"];
    assert_eq!(attrs[0]["value"]["boolValue"], Json::Bool(true));
    assert_eq!(attrs[1]["value"]["doubleValue"], serde_json::json!(0.5));
    // beyond 2^53: must stay exact, hence a string
    assert_eq!(attrs[2]["value"]["intValue"], Json::String("9007199254740993".into()));
    assert_eq!(attrs[3]["value"]["stringValue"], Json::String("x".into()));
}

#[test]
fn records_are_grouped_per_scope_and_instrument() {
    let p = demo_provider();
    let a = p.meter("a").create_counter("hits", "", "").unwrap();
    let b = p.meter("b").create_counter("hits", "", "").unwrap();
    a.add(1, &[KeyValue::new("k", "1")]).unwrap();
    a.add(1, &[KeyValue::new("k", "2")]).unwrap();
    b.add(7, &[]).unwrap();

    let v: Json = serde_json::from_slice(&otlp_json::encode(&p.snapshot()).unwrap()).unwrap();
    let scopes = v["resourceMetrics"][0]["scopeMetrics"].as_array().unwrap();
    assert_eq!(scopes.len(), 2);
    assert_eq!(scopes[0]["scope"]["name"], "a");
    assert_eq!(scopes[0]["metrics"].as_array().unwrap().len(), 1);
    assert_eq!(scopes[0]["metrics"][0]["sum"]["dataPoints"].as_array().unwrap().len(), 2);
    assert_eq!(scopes[1]["metrics"][0]["sum"]["dataPoints"][0]["asInt"], "7");
}

#[test]
fn empty_snapshot_still_carries_resource() {
    let p = demo_provider();
    let v: Json = serde_json::from_slice(&otlp_json::encode(&p.snapshot()).unwrap()).unwrap();
    assert_eq!(v["resourceMetrics"][0]["scopeMetrics"], serde_json::json!([]));
    assert!(!v["resourceMetrics"][0]["resource"]["attributes"].as_array().unwrap().is_empty());
}

#[test]
fn response_decoding() {
    assert!(otlp_json::decode_response(b"").unwrap().partial_success.is_none());
    assert!(otlp_json::decode_response(b"{}").unwrap().partial_success.is_none());

    let r = otlp_json::decode_response(br#"{"partialSuccess":{"rejectedDataPoints":"3","errorMessage":"bad"}}"#).unwrap();
    let ps = r.partial_success.unwrap();
    assert_eq!(ps.rejected().unwrap(), 3);
    assert_eq!(ps.error_message.as_deref(), Some("bad"));

    let r = otlp_json::decode_response(br#"{"partialSuccess":{"rejectedDataPoints":4}}"#).unwrap();
    assert_eq!(r.partial_success.unwrap().rejected().unwrap(), 4);

    assert!(otlp_json::decode_response(b"<html>").is_err());
}
