//! otelpush runtime: periodic export pipeline and the demo application.
//!
//! This crate wires the core aggregation store to a tokio-driven collector and
//! an OTLP/HTTP exporter. The axum app (`router`, `ops`, `app_state`) is the
//! instrumented application that records into the core; it is consumed by the
//! binary (`main.rs`) and by integration tests.

pub mod app_state;
pub mod collector;
pub mod config;
pub mod export;
pub mod obs;
pub mod ops;
pub mod router;

pub use collector::{CollectorConfig, CollectorState, CollectorStats, PeriodicCollector};
pub use export::{Ack, ExportError, HttpExporter, InMemoryExporter, MetricExporter};
