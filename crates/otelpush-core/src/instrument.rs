//! Instruments: named recording surfaces bound to the aggregation store.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize};
use std::sync::Arc;

use crate::attributes::{AttributeSet, KeyValue};
use crate::error::{MetricsError, Result};
use crate::store::AggregationStore;

const MAX_NAME_LEN: usize = 255;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstrumentKind {
    /// Monotonic sum; negative deltas are rejected.
    Counter,
    /// Signed sum; any delta is accepted.
    UpDownCounter,
}

impl InstrumentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            InstrumentKind::Counter => "counter",
            InstrumentKind::UpDownCounter => "up_down_counter",
        }
    }

    pub fn is_monotonic(self) -> bool {
        matches!(self, InstrumentKind::Counter)
    }
}

impl fmt::Display for InstrumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstrumentDescriptor {
    pub name: String,
    pub kind: InstrumentKind,
    pub description: String,
    pub unit: String,
}

impl InstrumentDescriptor {
    pub fn new(
        name: impl Into<String>,
        kind: InstrumentKind,
        description: impl Into<String>,
        unit: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            description: description.into(),
            unit: unit.into(),
        }
    }
}

/// Instrument names: ASCII letter first, then alphanumerics or `_ . - /`,
/// at most 255 characters.
pub fn validate_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return Err(MetricsError::InvalidArgument(
            "instrument name must not be empty".into(),
        ));
    };
    if name.len() > MAX_NAME_LEN {
        return Err(MetricsError::InvalidArgument(format!(
            "instrument name exceeds {MAX_NAME_LEN} characters: {name}"
        )));
    }
    if !first.is_ascii_alphabetic() {
        return Err(MetricsError::InvalidArgument(format!(
            "instrument name must start with a letter: {name}"
        )));
    }
    if let Some(bad) = chars.find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-' | '/'))) {
        return Err(MetricsError::InvalidArgument(format!(
            "instrument name contains invalid character {bad:?}: {name}"
        )));
    }
    Ok(())
}

/// Registration record shared by an instrument handle and its series.
#[derive(Debug)]
pub struct InstrumentEntry {
    id: u64,
    scope: Arc<str>,
    descriptor: Arc<InstrumentDescriptor>,
    pub(crate) series: AtomicUsize,
    pub(crate) overflow_warned: AtomicBool,
}

impl InstrumentEntry {
    pub(crate) fn new(id: u64, scope: Arc<str>, descriptor: InstrumentDescriptor) -> Self {
        Self {
            id,
            scope,
            descriptor: Arc::new(descriptor),
            series: AtomicUsize::new(0),
            overflow_warned: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn scope(&self) -> &Arc<str> {
        &self.scope
    }

    pub fn descriptor(&self) -> &Arc<InstrumentDescriptor> {
        &self.descriptor
    }
}

/// Monotonic counter handle. Cheap to clone; all clones feed the same series.
#[derive(Debug, Clone)]
pub struct Counter {
    entry: Arc<InstrumentEntry>,
    store: Arc<AggregationStore>,
}

impl Counter {
    pub(crate) fn new(entry: Arc<InstrumentEntry>, store: Arc<AggregationStore>) -> Self {
        Self { entry, store }
    }

    /// Add a non-negative delta to the series for `attributes`. Negative
    /// deltas and deltas that would overflow the running sum are rejected.
    pub fn add(&self, delta: i64, attributes: &[KeyValue]) -> Result<()> {
        if delta < 0 {
            return Err(MetricsError::InvalidArgument(format!(
                "counter {} received negative delta {delta}",
                self.entry.descriptor.name
            )));
        }
        self.store
            .record_monotonic(&self.entry, AttributeSet::from_slice(attributes), delta)
    }

    pub fn descriptor(&self) -> &InstrumentDescriptor {
        &self.entry.descriptor
    }

    /// Whether both handles record into the same instrument.
    pub fn same_instrument(&self, other: &Counter) -> bool {
        Arc::ptr_eq(&self.entry, &other.entry)
    }
}

/// Signed counter handle (in-flight requests, queue depth, ...).
#[derive(Debug, Clone)]
pub struct UpDownCounter {
    entry: Arc<InstrumentEntry>,
    store: Arc<AggregationStore>,
}

impl UpDownCounter {
    pub(crate) fn new(entry: Arc<InstrumentEntry>, store: Arc<AggregationStore>) -> Self {
        Self { entry, store }
    }

    pub fn add(&self, delta: i64, attributes: &[KeyValue]) {
        self.store
            .record_delta(&self.entry, AttributeSet::from_slice(attributes), delta);
    }

    pub fn descriptor(&self) -> &InstrumentDescriptor {
        &self.entry.descriptor
    }

    pub fn same_instrument(&self, other: &UpDownCounter) -> bool {
        Arc::ptr_eq(&self.entry, &other.entry)
    }
}
