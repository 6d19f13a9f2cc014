use std::sync::Mutex;

use async_trait::async_trait;

use otelpush_core::Snapshot;

use super::{Ack, ExportError, MetricExporter};

/// Keeps every exported snapshot in memory. Handy for tests and local runs.
#[derive(Debug, Default)]
pub struct InMemoryExporter {
    exported: Mutex<Vec<Snapshot>>,
}

impl InMemoryExporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshots(&self) -> Vec<Snapshot> {
        self.exported
            .lock()
            .map(|v| v.clone())
            .unwrap_or_default()
    }

    pub fn last(&self) -> Option<Snapshot> {
        self.exported.lock().ok().and_then(|v| v.last().cloned())
    }

    pub fn len(&self) -> usize {
        self.exported.lock().map(|v| v.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl MetricExporter for InMemoryExporter {
    async fn export(&self, snapshot: Snapshot) -> Result<Ack, ExportError> {
        let records = snapshot.len();
        self.exported
            .lock()
            .map_err(|_| ExportError::Transport("in-memory exporter poisoned".into()))?
            .push(snapshot);
        tracing::trace!(records, "snapshot stored in memory");
        Ok(Ack::default())
    }

    fn describe(&self) -> String {
        "in-memory".to_string()
    }
}
