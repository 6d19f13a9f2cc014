#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::collections::HashMap;

use otelpush_core::error::ErrorCode;
use otelpush_runtime::config;
use otelpush_runtime::config::PipelineConfig;

#[test]
fn deny_unknown_fields_nested() {
    let bad = r#"
version: 1
exporter:
  endpoint: "http://collector:4318"
  intervall_ms: 1000 # typo should fail
"#;

    let err = config::load_from_str(bad).expect_err("must fail");
    assert_eq!(err.code().as_str(), "CONFIG");
}

#[test]
fn ok_minimal_config() {
    let cfg = config::load_from_str("version: 1\n").expect("must parse");
    assert_eq!(cfg.version, 1);
    assert_eq!(cfg.service.name, "otel-metrics-demo");
    assert_eq!(cfg.exporter.interval_ms, 3000);
    assert_eq!(cfg.exporter.url(), "http://localhost:4318/v1/metrics");
    assert_eq!(cfg.app.listen, "0.0.0.0:8000");
    assert!(cfg.limits.cardinality_limit.is_none());
}

#[test]
fn full_config() {
    let ok = r#"
version: 1
service: { name: checkout, version: 2.3.1, instance_id: pod-7 }
exporter:
  endpoint: "https://otel.example.com/"
  interval_ms: 10000
  timeout_ms: 5000
  shutdown_grace_ms: 2000
limits: { cardinality_limit: 500 }
app: { listen: "127.0.0.1:9000" }
"#;
    let cfg = config::load_from_str(ok).unwrap();
    assert_eq!(cfg.service.instance_id.as_deref(), Some("pod-7"));
    assert_eq!(cfg.exporter.url(), "https://otel.example.com/v1/metrics");
    assert_eq!(cfg.limits.cardinality_limit, Some(500));
}

#[test]
fn timeout_must_be_below_interval() {
    let bad = r#"
version: 1
exporter: { interval_ms: 1000, timeout_ms: 1000 }
"#;
    assert_eq!(config::load_from_str(bad).unwrap_err().code(), ErrorCode::Config);
}

#[test]
fn rejects_bad_values() {
    for bad in [
        "version: 2\n",
        "version: 1\nexporter: { endpoint: \"localhost:4318\" }\n",
        "version: 1\nexporter: { path: \"v1/metrics\" }\n",
        "version: 1\nexporter: { interval_ms: 50, timeout_ms: 10 }\n",
        "version: 1\nexporter: { shutdown_grace_ms: 0 }\n",
        "version: 1\nlimits: { cardinality_limit: 1 }\n",
        "version: 1\nservice: { name: \"  \" }\n",
    ] {
        assert_eq!(config::load_from_str(bad).unwrap_err().code(), ErrorCode::Config, "{bad}");
    }
}

#[test]
fn env_overrides_apply() {
    let env: HashMap<&str, &str> = [
        ("OTEL_SERVICE_NAME", "from-env"),
        ("OTEL_EXPORTER_OTLP_ENDPOINT", "http://collector:4318"),
        ("OTEL_METRIC_EXPORT_INTERVAL", "5000"),
        ("OTEL_METRIC_EXPORT_TIMEOUT", "4000"),
    ]
    .into_iter()
    .collect();

    let mut cfg = PipelineConfig::default();
    cfg.apply_env(|k| env.get(k).map(|v| v.to_string())).unwrap();
    cfg.validate().unwrap();
    assert_eq!(cfg.service.name, "from-env");
    assert_eq!(cfg.exporter.url(), "http://collector:4318/v1/metrics");
    assert_eq!(cfg.exporter.interval_ms, 5000);
    assert_eq!(cfg.exporter.timeout_ms(), 4000);
}

#[test]
fn interval_alone_derives_timeout() {
    let mut cfg = PipelineConfig::default();
    cfg.apply_env(|k| (k == "OTEL_METRIC_EXPORT_INTERVAL").then(|| "1000".to_string()))
        .unwrap();
    cfg.validate().unwrap();
    assert_eq!(cfg.exporter.interval_ms, 1000);
    assert_eq!(cfg.exporter.timeout_ms(), 666);

    let cfg = config::load_from_str("version: 1\nexporter: { interval_ms: 500 }\n").unwrap();
    assert_eq!(cfg.exporter.timeout_ms(), 333);

    // defaults are unchanged for long intervals
    assert_eq!(PipelineConfig::default().exporter.timeout_ms(), 2000);
}

#[test]
fn explicit_timeout_is_not_clamped() {
    let mut cfg = PipelineConfig::default();
    cfg.apply_env(|k| match k {
        "OTEL_METRIC_EXPORT_INTERVAL" => Some("1000".to_string()),
        "OTEL_METRIC_EXPORT_TIMEOUT" => Some("1500".to_string()),
        _ => None,
    })
    .unwrap();
    assert_eq!(cfg.validate().unwrap_err().code(), ErrorCode::Config);
}

#[test]
fn env_bad_number_is_config_error() {
    let mut cfg = PipelineConfig::default();
    let err = cfg
        .apply_env(|k| (k == "OTEL_METRIC_EXPORT_INTERVAL").then(|| "soon".to_string()))
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::Config);
}
