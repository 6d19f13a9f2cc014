//! otelpush core: runtime-free metrics data model and the recording hot path.
//!
//! This crate owns instruments, attribute canonicalization, the aggregation
//! store and the immutable snapshots handed to exporters. It carries no async
//! runtime or network dependencies so request handlers can record measurements
//! without pulling in the export pipeline.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here. Every fallible path
//! surfaces as `MetricsError`/`Result` so a bad measurement never takes the
//! process down.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod attributes;
pub mod error;
pub mod instrument;
pub mod meter;
pub mod resource;
pub mod snapshot;
pub mod store;

/// Shared result type.
pub use error::{MetricsError, Result};

pub use attributes::{AttributeSet, KeyValue, Value};
pub use instrument::{Counter, InstrumentDescriptor, InstrumentKind, UpDownCounter};
pub use meter::{Meter, MeterProvider, MeterProviderBuilder};
pub use resource::ResourceIdentity;
pub use snapshot::{MetricRecord, Snapshot, Temporality};
pub use store::AggregationStore;
