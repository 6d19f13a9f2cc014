//! Local observability: Prometheus text rendering of a snapshot.
//!
//! Backs the `/metrics` debug endpoint of the demo app so the current
//! cumulative values can be inspected without a collector.

pub mod prometheus;
