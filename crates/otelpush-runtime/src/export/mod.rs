//! Exporters: ship a [`Snapshot`] to a collector.
//!
//! An exporter makes exactly one delivery attempt per call. Retry policy
//! belongs to the periodic collector; with cumulative temporality the next
//! cycle supersedes a failed one, so there is no retry queue.

pub mod http;
pub mod memory;
pub mod otlp_json;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use otelpush_core::Snapshot;

pub use http::HttpExporter;
pub use memory::InMemoryExporter;

/// Collector acknowledgement of one export.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ack {
    /// HTTP status (0 for non-network exporters).
    pub status: u16,
    /// Data points the collector reported as rejected (partial success).
    pub rejected_data_points: u64,
    pub message: Option<String>,
}

#[derive(Debug, Error)]
pub enum ExportError {
    /// Connection refused, DNS failure, I/O error, client-side timeout.
    #[error("transport error: {0}")]
    Transport(String),
    /// Non-2xx status or malformed response body.
    #[error("protocol error (status {status:?}): {message}")]
    Protocol { status: Option<u16>, message: String },
    /// Export abandoned by the collector after the export timeout.
    #[error("export timed out after {0:?}")]
    Timeout(Duration),
}

impl ExportError {
    /// Timeouts are handled exactly like transport failures.
    pub fn is_transport_like(&self) -> bool {
        matches!(self, ExportError::Transport(_) | ExportError::Timeout(_))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ExportError::Transport(_) => "transport",
            ExportError::Protocol { .. } => "protocol",
            ExportError::Timeout(_) => "timeout",
        }
    }
}

#[async_trait]
pub trait MetricExporter: Send + Sync {
    /// One delivery attempt for `snapshot`.
    async fn export(&self, snapshot: Snapshot) -> Result<Ack, ExportError>;

    /// Destination for log context (endpoint URL, "in-memory", ...).
    fn describe(&self) -> String;
}
