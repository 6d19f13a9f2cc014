//! Periodic collector: freezes the aggregation store on a fixed clock and
//! hands each snapshot to the exporter.
//!
//! Lifecycle: `Stopped -> Running -> Stopping -> Stopped`.
//! - Each tick takes a cumulative snapshot and spawns one export bounded by
//!   `export_timeout` (strictly less than the interval).
//! - At most one export is in flight. A tick that finds the previous export
//!   still running is dropped and counted as a missed cycle.
//! - Export failures are logged and counted; they never stop the ticker.
//! - `shutdown()` stops ticking, waits for the in-flight export, then does one
//!   final flush. Both share a single `shutdown_grace` deadline, after which
//!   outstanding work is aborted.
//!
//! Writers never touch this module: `Counter::add` only reaches the store.

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{timeout, timeout_at, Instant, MissedTickBehavior};

use otelpush_core::error::{MetricsError, Result};
use otelpush_core::{AggregationStore, MeterProvider, Snapshot};

use crate::config::ExporterSection;
use crate::export::{Ack, ExportError, MetricExporter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectorState {
    Stopped,
    Running,
    Stopping,
}

const STOPPED: u8 = 0;
const RUNNING: u8 = 1;
const STOPPING: u8 = 2;

impl CollectorState {
    fn from_u8(v: u8) -> Self {
        match v {
            RUNNING => CollectorState::Running,
            STOPPING => CollectorState::Stopping,
            _ => CollectorState::Stopped,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectorConfig {
    interval: Duration,
    export_timeout: Duration,
    shutdown_grace: Duration,
}

impl CollectorConfig {
    pub fn new(interval: Duration, export_timeout: Duration, shutdown_grace: Duration) -> Result<Self> {
        if interval.is_zero() || export_timeout.is_zero() || shutdown_grace.is_zero() {
            return Err(MetricsError::Config(
                "collector durations must be greater than zero".into(),
            ));
        }
        if export_timeout >= interval {
            return Err(MetricsError::Config(format!(
                "export timeout ({export_timeout:?}) must be less than the interval ({interval:?})"
            )));
        }
        Ok(Self {
            interval,
            export_timeout,
            shutdown_grace,
        })
    }

    pub fn from_section(section: &ExporterSection) -> Result<Self> {
        Self::new(
            Duration::from_millis(section.interval_ms),
            Duration::from_millis(section.timeout_ms()),
            Duration::from_millis(section.shutdown_grace_ms),
        )
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn export_timeout(&self) -> Duration {
        self.export_timeout
    }

    pub fn shutdown_grace(&self) -> Duration {
        self.shutdown_grace
    }
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(3000),
            export_timeout: Duration::from_millis(2000),
            shutdown_grace: Duration::from_millis(1000),
        }
    }
}

/// Point-in-time copy of the collector counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollectorStats {
    pub ticks: u64,
    pub exports_ok: u64,
    pub exports_failed: u64,
    pub missed_cycles: u64,
}

#[derive(Default)]
struct Stats {
    ticks: AtomicU64,
    exports_ok: AtomicU64,
    exports_failed: AtomicU64,
    missed_cycles: AtomicU64,
}

struct Shared {
    store: Arc<AggregationStore>,
    exporter: Arc<dyn MetricExporter>,
    cfg: CollectorConfig,
    state: AtomicU8,
    stats: Stats,
}

struct Control {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

pub struct PeriodicCollector {
    shared: Arc<Shared>,
    control: Mutex<Option<Control>>,
}

impl PeriodicCollector {
    pub fn new(provider: &MeterProvider, exporter: Arc<dyn MetricExporter>, cfg: CollectorConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                store: Arc::clone(provider.store()),
                exporter,
                cfg,
                state: AtomicU8::new(STOPPED),
                stats: Stats::default(),
            }),
            control: Mutex::new(None),
        }
    }

    pub fn state(&self) -> CollectorState {
        CollectorState::from_u8(self.shared.state.load(Ordering::Acquire))
    }

    pub fn stats(&self) -> CollectorStats {
        let s = &self.shared.stats;
        CollectorStats {
            ticks: s.ticks.load(Ordering::Relaxed),
            exports_ok: s.exports_ok.load(Ordering::Relaxed),
            exports_failed: s.exports_failed.load(Ordering::Relaxed),
            missed_cycles: s.missed_cycles.load(Ordering::Relaxed),
        }
    }

    pub fn config(&self) -> &CollectorConfig {
        &self.shared.cfg
    }

    /// Spawn the ticker on the current tokio runtime.
    pub fn start(&self) -> Result<()> {
        if tokio::runtime::Handle::try_current().is_err() {
            return Err(MetricsError::InvalidState(
                "collector must be started inside a tokio runtime".into(),
            ));
        }
        // held across the transition so shutdown never sees Running without a task
        let mut control = self
            .control
            .lock()
            .map_err(|_| MetricsError::Internal("collector control lock poisoned".into()))?;

        self.shared
            .state
            .compare_exchange(STOPPED, RUNNING, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|cur| {
                MetricsError::InvalidState(format!(
                    "collector cannot start while {:?}",
                    CollectorState::from_u8(cur)
                ))
            })?;

        let (stop_tx, stop_rx) = watch::channel(false);
        let task = tokio::spawn(run(Arc::clone(&self.shared), stop_rx));
        *control = Some(Control { stop_tx, task });
        drop(control);

        tracing::info!(
            endpoint = %self.shared.exporter.describe(),
            interval_ms = self.shared.cfg.interval.as_millis() as u64,
            timeout_ms = self.shared.cfg.export_timeout.as_millis() as u64,
            "metrics collector started"
        );
        Ok(())
    }

    /// Stop ticking, flush once, and wait for the task. Returns within the
    /// shutdown grace period. A no-op unless the collector is running.
    pub async fn shutdown(&self) -> Result<()> {
        if self
            .shared
            .state
            .compare_exchange(RUNNING, STOPPING, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Ok(());
        }

        let control = self
            .control
            .lock()
            .map_err(|_| MetricsError::Internal("collector control lock poisoned".into()))?
            .take();

        if let Some(Control { stop_tx, mut task }) = control {
            let _ = stop_tx.send(true);
            // the task enforces the grace deadline itself; this is a backstop
            let backstop = self.shared.cfg.shutdown_grace + Duration::from_millis(50);
            if timeout(backstop, &mut task).await.is_err() {
                task.abort();
                tracing::warn!("metrics collector did not stop within grace period, aborted");
            }
        }

        self.shared.state.store(STOPPED, Ordering::Release);
        tracing::info!(stats = ?self.stats(), "metrics collector stopped");
        Ok(())
    }
}

impl Drop for PeriodicCollector {
    fn drop(&mut self) {
        if let Ok(mut control) = self.control.lock() {
            if let Some(c) = control.take() {
                c.task.abort();
            }
        }
    }
}

/// Export task owned by the ticker. Tearing the ticker down aborts it.
struct InFlight(JoinHandle<()>);

impl InFlight {
    fn is_finished(&self) -> bool {
        self.0.is_finished()
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.abort();
    }
}

async fn run(shared: Arc<Shared>, mut stop_rx: watch::Receiver<bool>) {
    let period = shared.cfg.interval;
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut in_flight: Option<InFlight> = None;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                shared.stats.ticks.fetch_add(1, Ordering::Relaxed);

                if in_flight.as_ref().is_some_and(|h| !h.is_finished()) {
                    shared.stats.missed_cycles.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!(
                        endpoint = %shared.exporter.describe(),
                        "previous export still in flight, skipping cycle"
                    );
                    continue;
                }

                let snapshot = match shared.store.snapshot_and_optionally_reset(false) {
                    Ok(s) => s,
                    Err(e) => {
                        tracing::error!(error = %e, "snapshot failed");
                        continue;
                    }
                };
                let s = Arc::clone(&shared);
                in_flight = Some(InFlight(tokio::spawn(async move {
                    let _ = s.export_once(snapshot, s.cfg.export_timeout).await;
                })));
            }

            // stop requested, or the collector handle was dropped
            _ = stop_rx.changed() => break,
        }
    }

    let deadline = Instant::now() + shared.cfg.shutdown_grace;

    if let Some(mut h) = in_flight.take() {
        if timeout_at(deadline, &mut h.0).await.is_err() {
            tracing::warn!("in-flight export abandoned at shutdown");
        }
    }

    let remaining = deadline.saturating_duration_since(Instant::now());
    if remaining.is_zero() {
        tracing::warn!("no grace time left, final flush skipped");
        return;
    }
    match shared.store.snapshot_and_optionally_reset(false) {
        Ok(snapshot) => {
            let _ = shared.export_once(snapshot, remaining).await;
        }
        Err(e) => tracing::error!(error = %e, "final snapshot failed"),
    }
}

impl Shared {
    async fn export_once(&self, snapshot: Snapshot, limit: Duration) -> std::result::Result<Ack, ExportError> {
        let records = snapshot.len();
        let timestamp = snapshot.time_unix_nano();
        let started = Instant::now();

        let res = match timeout(limit, self.exporter.export(snapshot)).await {
            Ok(r) => r,
            Err(_) => Err(ExportError::Timeout(limit)),
        };

        match &res {
            Ok(ack) => {
                self.stats.exports_ok.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(
                    records,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    status = ack.status,
                    "metrics exported"
                );
                if ack.rejected_data_points > 0 {
                    tracing::warn!(
                        endpoint = %self.exporter.describe(),
                        rejected = ack.rejected_data_points,
                        message = ?ack.message,
                        "collector partially rejected export"
                    );
                }
            }
            Err(e) => {
                self.stats.exports_failed.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    endpoint = %self.exporter.describe(),
                    timestamp,
                    records,
                    kind = e.kind(),
                    error = %e,
                    "metrics export failed"
                );
            }
        }
        res
    }
}
