//! OTLP/HTTP JSON push exporter.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;

use otelpush_core::error::{MetricsError, Result};
use otelpush_core::Snapshot;

use super::otlp_json;
use super::{Ack, ExportError, MetricExporter};

pub struct HttpExporter {
    client: reqwest::Client,
    url: String,
}

impl HttpExporter {
    /// `url` is the full push URL (base endpoint + path). `timeout` bounds a
    /// single request; the collector applies its own export timeout on top.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MetricsError::Config(format!("http client build failed: {e}")))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl MetricExporter for HttpExporter {
    async fn export(&self, snapshot: Snapshot) -> std::result::Result<Ack, ExportError> {
        let body = otlp_json::encode(&snapshot)
            .map_err(|e| ExportError::Protocol {
                status: None,
                message: format!("encode failed: {e}"),
            })?;

        let resp = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, otlp_json::CONTENT_TYPE)
            .body(body)
            .send()
            .await
            .map_err(|e| ExportError::Transport(e.to_string()))?;

        let status = resp.status();
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| ExportError::Transport(format!("read response failed: {e}")))?;

        if !status.is_success() {
            let snippet = String::from_utf8_lossy(&bytes[..bytes.len().min(256)]).into_owned();
            return Err(ExportError::Protocol {
                status: Some(status.as_u16()),
                message: if snippet.is_empty() {
                    status.to_string()
                } else {
                    snippet
                },
            });
        }

        let decoded = otlp_json::decode_response(&bytes).map_err(|message| ExportError::Protocol {
            status: Some(status.as_u16()),
            message,
        })?;

        let mut ack = Ack {
            status: status.as_u16(),
            ..Ack::default()
        };
        if let Some(partial) = decoded.partial_success {
            ack.rejected_data_points = partial.rejected().map_err(|message| ExportError::Protocol {
                status: Some(status.as_u16()),
                message,
            })?;
            ack.message = partial.error_message.filter(|m| !m.is_empty());
        }
        Ok(ack)
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}
