//! Immutable point-in-time copies of the aggregation store.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::attributes::{AttributeSet, KeyValue};
use crate::instrument::InstrumentDescriptor;
use crate::resource::ResourceIdentity;

/// Window an exported value covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Temporality {
    /// Running total since the instrument was created.
    Cumulative,
    /// Change since the previous collection.
    Delta,
}

impl Temporality {
    /// `AggregationTemporality` enum value on the OTLP wire.
    pub fn otlp_code(self) -> i32 {
        match self {
            Temporality::Delta => 1,
            Temporality::Cumulative => 2,
        }
    }
}

/// One (instrument, attribute set, value) entry.
#[derive(Debug, Clone)]
pub struct MetricRecord {
    pub scope: Arc<str>,
    pub descriptor: Arc<InstrumentDescriptor>,
    pub attributes: AttributeSet,
    pub value: i64,
}

/// Unit of work handed to an exporter. Shares no mutable state with the store.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub resource: Arc<ResourceIdentity>,
    pub temporality: Temporality,
    pub start_time: SystemTime,
    pub time: SystemTime,
    pub records: Vec<MetricRecord>,
}

impl Snapshot {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Value of the series `name` + `attributes`, if present.
    pub fn value(&self, name: &str, attributes: &[KeyValue]) -> Option<i64> {
        let attrs = AttributeSet::from_slice(attributes);
        self.records
            .iter()
            .find(|r| r.descriptor.name == name && r.attributes == attrs)
            .map(|r| r.value)
    }

    /// All records of one instrument.
    pub fn records_for<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a MetricRecord> + 'a {
        self.records.iter().filter(move |r| r.descriptor.name == name)
    }

    pub fn start_time_unix_nano(&self) -> u64 {
        unix_nanos(self.start_time)
    }

    pub fn time_unix_nano(&self) -> u64 {
        unix_nanos(self.time)
    }
}

pub fn unix_nanos(t: SystemTime) -> u64 {
    t.duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_nanos()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}
