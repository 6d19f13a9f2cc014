//! OTLP/HTTP JSON encoding of snapshots.
//!
//! Follows the proto3 JSON mapping of `ExportMetricsServiceRequest`:
//! camelCase field names, 64-bit integers as strings, enums as numbers.
//! Records are grouped per scope, then per instrument; counters become
//! cumulative `sum` metrics.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use otelpush_core::{KeyValue, MetricRecord, Snapshot, Value};

pub const CONTENT_TYPE: &str = "application/json";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportMetricsServiceRequest<'a> {
    pub resource_metrics: Vec<ResourceMetrics<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceMetrics<'a> {
    pub resource: Resource<'a>,
    pub scope_metrics: Vec<ScopeMetrics<'a>>,
}

#[derive(Debug, Serialize)]
pub struct Resource<'a> {
    pub attributes: Vec<AttributeJson<'a>>,
}

#[derive(Debug, Serialize)]
pub struct ScopeMetrics<'a> {
    pub scope: Scope<'a>,
    pub metrics: Vec<Metric<'a>>,
}

#[derive(Debug, Serialize)]
pub struct Scope<'a> {
    pub name: &'a str,
}

#[derive(Debug, Serialize)]
pub struct Metric<'a> {
    pub name: &'a str,
    pub description: &'a str,
    pub unit: &'a str,
    pub sum: Sum<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Sum<'a> {
    pub data_points: Vec<NumberDataPoint<'a>>,
    pub aggregation_temporality: i32,
    pub is_monotonic: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NumberDataPoint<'a> {
    pub attributes: Vec<AttributeJson<'a>>,
    pub start_time_unix_nano: String,
    pub time_unix_nano: String,
    pub as_int: String,
}

#[derive(Debug, Serialize)]
pub struct AttributeJson<'a> {
    pub key: &'a str,
    pub value: AnyValue<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AnyValue<'a> {
    StringValue(&'a str),
    IntValue(String),
    DoubleValue(f64),
    BoolValue(bool),
}

impl<'a> From<&'a Value> for AnyValue<'a> {
    fn from(v: &'a Value) -> Self {
        match v {
            Value::String(s) => AnyValue::StringValue(s),
            Value::I64(i) => AnyValue::IntValue(i.to_string()),
            Value::F64(f) => AnyValue::DoubleValue(*f),
            Value::Bool(b) => AnyValue::BoolValue(*b),
        }
    }
}

fn attribute(kv: &KeyValue) -> AttributeJson<'_> {
    AttributeJson {
        key: &kv.key,
        value: AnyValue::from(&kv.value),
    }
}

/// Build the request view over a snapshot (borrows, no copies of strings).
pub fn request(snapshot: &Snapshot) -> ExportMetricsServiceRequest<'_> {
    let start = snapshot.start_time_unix_nano().to_string();
    let time = snapshot.time_unix_nano().to_string();
    let temporality = snapshot.temporality.otlp_code();

    let mut scopes: Vec<ScopeMetrics<'_>> = Vec::new();
    for rec in &snapshot.records {
        let scope_idx = match scopes.iter().position(|s| s.scope.name == &*rec.scope) {
            Some(i) => i,
            None => {
                scopes.push(ScopeMetrics {
                    scope: Scope { name: &rec.scope },
                    metrics: Vec::new(),
                });
                scopes.len() - 1
            }
        };
        let metrics = &mut scopes[scope_idx].metrics;

        let point = data_point(rec, &start, &time);
        match metrics.iter_mut().find(|m| m.name == rec.descriptor.name) {
            Some(m) => m.sum.data_points.push(point),
            None => metrics.push(Metric {
                name: &rec.descriptor.name,
                description: &rec.descriptor.description,
                unit: &rec.descriptor.unit,
                sum: Sum {
                    data_points: vec![point],
                    aggregation_temporality: temporality,
                    is_monotonic: rec.descriptor.kind.is_monotonic(),
                },
            }),
        }
    }

    ExportMetricsServiceRequest {
        resource_metrics: vec![ResourceMetrics {
            resource: Resource {
                attributes: snapshot
                    .resource
                    .iter()
                    .map(|(k, v)| AttributeJson {
                        key: k,
                        value: AnyValue::StringValue(v),
                    })
                    .collect(),
            },
            scope_metrics: scopes,
        }],
    }
}

fn data_point<'a>(rec: &'a MetricRecord, start: &str, time: &str) -> NumberDataPoint<'a> {
    NumberDataPoint {
        attributes: rec.attributes.iter().map(attribute).collect(),
        start_time_unix_nano: start.to_string(),
        time_unix_nano: time.to_string(),
        as_int: rec.value.to_string(),
    }
}

/// Serialize a snapshot into the request body.
pub fn encode(snapshot: &Snapshot) -> serde_json::Result<Bytes> {
    serde_json::to_vec(&request(snapshot)).map(Bytes::from)
}

/// `ExportMetricsServiceResponse`. An empty body means full success.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportMetricsServiceResponse {
    #[serde(default)]
    pub partial_success: Option<PartialSuccess>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialSuccess {
    /// int64: collectors send either a JSON string or a number.
    #[serde(default)]
    pub rejected_data_points: Option<serde_json::Value>,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl PartialSuccess {
    pub fn rejected(&self) -> Result<u64, String> {
        match &self.rejected_data_points {
            None | Some(serde_json::Value::Null) => Ok(0),
            Some(serde_json::Value::Number(n)) => n
                .as_u64()
                .ok_or_else(|| format!("rejectedDataPoints out of range: {n}")),
            Some(serde_json::Value::String(s)) => s
                .parse::<u64>()
                .map_err(|e| format!("rejectedDataPoints not an integer: {e}")),
            Some(other) => Err(format!("rejectedDataPoints has unexpected type: {other}")),
        }
    }
}

pub fn decode_response(body: &[u8]) -> Result<ExportMetricsServiceResponse, String> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(ExportMetricsServiceResponse::default());
    }
    serde_json::from_slice(body).map_err(|e| format!("malformed response body: {e}"))
}
