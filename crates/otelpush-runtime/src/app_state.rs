//! Shared application state for the demo service.
//!
//! Owns the meter provider, the request instruments and the collector. The
//! provider is injected into everything that records; nothing looks it up
//! globally.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use otelpush_core::error::Result;
use otelpush_core::{Counter, KeyValue, MeterProvider, ResourceIdentity, UpDownCounter};

use crate::collector::{CollectorConfig, PeriodicCollector};
use crate::config::PipelineConfig;
use crate::export::{HttpExporter, MetricExporter};

pub const REQUESTS: &str = "http.server.requests";
pub const ACTIVE_REQUESTS: &str = "http.server.active_requests";
pub const ROUTE_ATTRIBUTE: &str = "http.route";

/// Instruments recorded by the HTTP handlers.
#[derive(Clone)]
pub struct RequestInstruments {
    pub requests: Counter,
    pub active: UpDownCounter,
}

impl RequestInstruments {
    pub fn new(provider: &MeterProvider, scope: &str) -> Result<Self> {
        let meter = provider.meter(scope);
        Ok(Self {
            requests: meter.create_counter(REQUESTS, "Total number of HTTP requests received.", "{requests}")?,
            active: meter.create_up_down_counter(ACTIVE_REQUESTS, "Number of in-flight requests.", "{requests}")?,
        })
    }

    /// Count one request for `route`.
    pub fn record_request(&self, route: &str) {
        let attrs = [KeyValue::new(ROUTE_ATTRIBUTE, route.to_string())];
        if let Err(e) = self.requests.add(1, &attrs) {
            tracing::error!(error = %e, code = e.code().as_str(), "request counter rejected measurement");
        }
    }

    /// +1 in-flight now, -1 when the guard drops (also on early return/panic).
    pub fn track_active(&self) -> ActiveGuard {
        self.active.add(1, &[]);
        ActiveGuard {
            active: self.active.clone(),
        }
    }
}

pub struct ActiveGuard {
    active: UpDownCounter,
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.active.add(-1, &[]);
    }
}

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    cfg: PipelineConfig,
    provider: MeterProvider,
    instruments: RequestInstruments,
    collector: PeriodicCollector,
    draining: AtomicBool,
}

impl AppState {
    /// Build state with the OTLP/HTTP exporter described by `cfg`.
    pub fn from_config(cfg: PipelineConfig) -> Result<Self> {
        let exporter = HttpExporter::new(
            cfg.exporter.url(),
            Duration::from_millis(cfg.exporter.timeout_ms()),
        )?;
        Self::new(cfg, Arc::new(exporter))
    }

    /// Build state around any exporter. The collector is created but not started.
    pub fn new(cfg: PipelineConfig, exporter: Arc<dyn MetricExporter>) -> Result<Self> {
        cfg.validate()?;

        let mut resource = ResourceIdentity::builder()
            .service_name(cfg.service.name.clone())
            .service_version(cfg.service.version.clone());
        if let Some(id) = &cfg.service.instance_id {
            resource = resource.instance_id(id.clone());
        }

        let mut builder = MeterProvider::builder().with_resource(resource.build());
        if let Some(limit) = cfg.limits.cardinality_limit {
            builder = builder.with_cardinality_limit(limit);
        }
        let provider = builder.build()?;

        let instruments = RequestInstruments::new(&provider, &cfg.service.name)?;
        let collector = PeriodicCollector::new(
            &provider,
            exporter,
            CollectorConfig::from_section(&cfg.exporter)?,
        );

        Ok(Self {
            inner: Arc::new(AppStateInner {
                cfg,
                provider,
                instruments,
                collector,
                draining: AtomicBool::new(false),
            }),
        })
    }

    pub fn cfg(&self) -> &PipelineConfig {
        &self.inner.cfg
    }

    pub fn provider(&self) -> &MeterProvider {
        &self.inner.provider
    }

    pub fn instruments(&self) -> &RequestInstruments {
        &self.inner.instruments
    }

    pub fn collector(&self) -> &PeriodicCollector {
        &self.inner.collector
    }

    /// Mark draining state.
    pub fn set_draining(&self) {
        self.inner.draining.store(true, Ordering::Relaxed);
    }

    /// Return whether draining is active.
    pub fn is_draining(&self) -> bool {
        self.inner.draining.load(Ordering::Relaxed)
    }
}
