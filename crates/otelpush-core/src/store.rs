//! Aggregation store: (instrument, attribute set) -> running value.
//!
//! Backed by a sharded `DashMap`, so writers only contend with each other on
//! the shard that holds their series, and only when creating a new series.
//! Existing series are updated with lock-free atomics (`fetch_add`, or a
//! checked `fetch_update` for counters) under a shard read guard, which the snapshot pass also takes; writers therefore never wait
//! for the reader to finish iterating.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::SystemTime;

use dashmap::DashMap;

use crate::attributes::{AttributeSet, KeyValue};
use crate::error::{MetricsError, Result};
use crate::instrument::InstrumentEntry;
use crate::resource::ResourceIdentity;
use crate::snapshot::{MetricRecord, Snapshot, Temporality};

/// Attribute marking the series that absorbs measurements past the
/// cardinality limit.
pub const OVERFLOW_ATTRIBUTE: &str = "otel.metric.overflow";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct SeriesKey {
    instrument: u64,
    attributes: AttributeSet,
}

/// Running value for one series.
#[derive(Debug)]
pub struct Accumulator {
    entry: Arc<InstrumentEntry>,
    value: AtomicI64,
}

impl Accumulator {
    fn new(entry: Arc<InstrumentEntry>) -> Self {
        Self {
            entry,
            value: AtomicI64::new(0),
        }
    }

    /// Signed add; wraps on overflow.
    fn add(&self, delta: i64) {
        self.value.fetch_add(delta, Ordering::Relaxed);
    }

    /// Add that leaves the value untouched when the sum would overflow.
    fn checked_add(&self, delta: i64) -> Option<i64> {
        self.value
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| v.checked_add(delta))
            .ok()
    }

    pub fn value(&self) -> i64 {
        self.value.load(Ordering::Relaxed)
    }
}

#[derive(Debug)]
pub struct AggregationStore {
    resource: Arc<ResourceIdentity>,
    series: DashMap<SeriesKey, Accumulator>,
    start_time: SystemTime,
    cardinality_limit: Option<usize>,
}

impl AggregationStore {
    pub fn new(resource: Arc<ResourceIdentity>, cardinality_limit: Option<usize>) -> Self {
        Self {
            resource,
            series: DashMap::new(),
            start_time: SystemTime::now(),
            cardinality_limit,
        }
    }

    pub fn resource(&self) -> &Arc<ResourceIdentity> {
        &self.resource
    }

    /// Number of live series across all instruments.
    pub fn series_count(&self) -> usize {
        self.series.len()
    }

    /// Apply `delta` to the series, creating it at 0 on first observation.
    /// Sign checks belong to the instrument; the store accepts any delta and
    /// wraps on overflow.
    pub fn record_delta(&self, entry: &Arc<InstrumentEntry>, attributes: AttributeSet, delta: i64) {
        self.with_series(entry, attributes, |acc| acc.add(delta));
    }

    /// Apply `delta` to a monotonic series. A delta that would push the sum
    /// past `i64::MAX` is rejected and the series keeps its value.
    pub fn record_monotonic(
        &self,
        entry: &Arc<InstrumentEntry>,
        attributes: AttributeSet,
        delta: i64,
    ) -> Result<()> {
        match self.with_series(entry, attributes, |acc| acc.checked_add(delta)) {
            Some(_) => Ok(()),
            None => Err(MetricsError::InvalidArgument(format!(
                "counter {} would overflow adding {delta}",
                entry.descriptor().name
            ))),
        }
    }

    fn with_series<R>(
        &self,
        entry: &Arc<InstrumentEntry>,
        attributes: AttributeSet,
        apply: impl FnOnce(&Accumulator) -> R,
    ) -> R {
        let key = SeriesKey {
            instrument: entry.id(),
            attributes,
        };
        if let Some(acc) = self.series.get(&key) {
            return apply(acc.value());
        }

        let key = if self.over_limit(entry) {
            if !entry.overflow_warned.swap(true, Ordering::Relaxed) {
                tracing::warn!(
                    instrument = %entry.descriptor().name,
                    limit = ?self.cardinality_limit,
                    "cardinality limit reached, routing new attribute sets to overflow series"
                );
            }
            SeriesKey {
                instrument: entry.id(),
                attributes: overflow_attributes(),
            }
        } else {
            key
        };

        let acc = self.series.entry(key).or_insert_with(|| {
            entry.series.fetch_add(1, Ordering::Relaxed);
            Accumulator::new(Arc::clone(entry))
        });
        apply(acc.value())
    }

    /// One slot is kept free for the overflow series itself.
    fn over_limit(&self, entry: &InstrumentEntry) -> bool {
        self.cardinality_limit
            .is_some_and(|limit| entry.series.load(Ordering::Relaxed) >= limit.saturating_sub(1))
    }

    /// Copy every series into a [`Snapshot`].
    ///
    /// Each value is read atomically, but entries are not read at a single
    /// instant across the store. `reset_after_read` selects delta temporality
    /// and is fixed at `false` for this pipeline: exports are cumulative, so a
    /// failed export is superseded by the next one without losing data.
    /// Passing `true` is rejected.
    pub fn snapshot_and_optionally_reset(&self, reset_after_read: bool) -> Result<Snapshot> {
        if reset_after_read {
            return Err(MetricsError::InvalidArgument(
                "delta temporality (reset_after_read) is not supported".into(),
            ));
        }
        Ok(self.snapshot())
    }

    /// Cumulative snapshot.
    pub fn snapshot(&self) -> Snapshot {
        let mut records: Vec<(u64, MetricRecord)> = self
            .series
            .iter()
            .map(|r| {
                let acc = r.value();
                (
                    r.key().instrument,
                    MetricRecord {
                        scope: Arc::clone(acc.entry.scope()),
                        descriptor: Arc::clone(acc.entry.descriptor()),
                        attributes: r.key().attributes.clone(),
                        value: acc.value(),
                    },
                )
            })
            .collect();
        records.sort_by_key(|(id, _)| *id);

        Snapshot {
            resource: Arc::clone(&self.resource),
            temporality: Temporality::Cumulative,
            start_time: self.start_time,
            time: SystemTime::now(),
            records: records.into_iter().map(|(_, r)| r).collect(),
        }
    }
}

fn overflow_attributes() -> AttributeSet {
    AttributeSet::from_slice(&[KeyValue::new(OVERFLOW_ATTRIBUTE, true)])
}
