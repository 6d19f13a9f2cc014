use serde::Deserialize;

use otelpush_core::error::{MetricsError, Result};

pub const ENV_SERVICE_NAME: &str = "OTEL_SERVICE_NAME";
pub const ENV_ENDPOINT: &str = "OTEL_EXPORTER_OTLP_ENDPOINT";
pub const ENV_INTERVAL: &str = "OTEL_METRIC_EXPORT_INTERVAL";
pub const ENV_TIMEOUT: &str = "OTEL_METRIC_EXPORT_TIMEOUT";

const DEFAULT_TIMEOUT_MS: u64 = 2000;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    pub version: u32,

    #[serde(default)]
    pub service: ServiceSection,

    #[serde(default)]
    pub exporter: ExporterSection,

    #[serde(default)]
    pub limits: LimitsSection,

    #[serde(default)]
    pub app: AppSection,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            version: 1,
            service: ServiceSection::default(),
            exporter: ExporterSection::default(),
            limits: LimitsSection::default(),
            app: AppSection::default(),
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(MetricsError::Config(format!(
                "unsupported config version {}",
                self.version
            )));
        }
        if self.service.name.trim().is_empty() {
            return Err(MetricsError::Config("service.name must not be empty".into()));
        }

        self.exporter.validate()?;
        self.limits.validate()?;

        Ok(())
    }

    /// Apply `OTEL_*` overrides. `lookup` is injected so tests need not touch
    /// the process environment.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup(ENV_SERVICE_NAME) {
            self.service.name = v;
        }
        if let Some(v) = lookup(ENV_ENDPOINT) {
            self.exporter.endpoint = v;
        }
        if let Some(v) = lookup(ENV_INTERVAL) {
            self.exporter.interval_ms = parse_ms(ENV_INTERVAL, &v)?;
        }
        if let Some(v) = lookup(ENV_TIMEOUT) {
            self.exporter.timeout_ms = Some(parse_ms(ENV_TIMEOUT, &v)?);
        }
        Ok(())
    }
}

fn parse_ms(var: &str, v: &str) -> Result<u64> {
    v.trim()
        .parse::<u64>()
        .map_err(|e| MetricsError::Config(format!("{var} must be milliseconds: {e}")))
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceSection {
    #[serde(default = "default_service_name")]
    pub name: String,

    #[serde(default = "default_service_version")]
    pub version: String,

    #[serde(default)]
    pub instance_id: Option<String>,
}

impl Default for ServiceSection {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            version: default_service_version(),
            instance_id: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExporterSection {
    /// Base URL of the collector; `path` is appended.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_path")]
    pub path: String,

    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Unset means derived from the interval, see [`ExporterSection::timeout_ms`].
    #[serde(default)]
    pub timeout_ms: Option<u64>,

    #[serde(default = "default_shutdown_grace_ms")]
    pub shutdown_grace_ms: u64,
}

impl Default for ExporterSection {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            path: default_path(),
            interval_ms: default_interval_ms(),
            timeout_ms: None,
            shutdown_grace_ms: default_shutdown_grace_ms(),
        }
    }
}

impl ExporterSection {
    pub fn validate(&self) -> Result<()> {
        if !(self.endpoint.starts_with("http://") || self.endpoint.starts_with("https://")) {
            return Err(MetricsError::Config(format!(
                "exporter.endpoint must be an http(s) URL, got {:?}",
                self.endpoint
            )));
        }
        if !self.path.starts_with('/') {
            return Err(MetricsError::Config("exporter.path must start with '/'".into()));
        }
        if !(100..=3_600_000).contains(&self.interval_ms) {
            return Err(MetricsError::Config(
                "exporter.interval_ms must be between 100 and 3600000".into(),
            ));
        }
        let timeout_ms = self.timeout_ms();
        if timeout_ms == 0 || timeout_ms >= self.interval_ms {
            return Err(MetricsError::Config(
                "exporter.timeout_ms must be greater than 0 and less than interval_ms".into(),
            ));
        }
        if self.shutdown_grace_ms == 0 {
            return Err(MetricsError::Config(
                "exporter.shutdown_grace_ms must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    /// Effective export timeout: the configured value, or the default capped
    /// at two thirds of the interval so a shorter interval alone stays valid.
    pub fn timeout_ms(&self) -> u64 {
        self.timeout_ms
            .unwrap_or_else(|| DEFAULT_TIMEOUT_MS.min(self.interval_ms.saturating_mul(2) / 3))
    }

    /// Full push URL: endpoint (without trailing `/`) + path.
    pub fn url(&self) -> String {
        format!("{}{}", self.endpoint.trim_end_matches('/'), self.path)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LimitsSection {
    #[serde(default)]
    pub cardinality_limit: Option<usize>,
}

impl LimitsSection {
    pub fn validate(&self) -> Result<()> {
        if let Some(limit) = self.cardinality_limit {
            if limit < 2 {
                return Err(MetricsError::Config(
                    "limits.cardinality_limit must be at least 2".into(),
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppSection {
    #[serde(default = "default_listen")]
    pub listen: String,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

fn default_service_name() -> String {
    "otel-metrics-demo".into()
}
fn default_service_version() -> String {
    "0.1.0".into()
}
fn default_endpoint() -> String {
    "http://localhost:4318".into()
}
fn default_path() -> String {
    "/v1/metrics".into()
}
fn default_interval_ms() -> u64 {
    3000
}
fn default_shutdown_grace_ms() -> u64 {
    1000
}
fn default_listen() -> String {
    "0.0.0.0:8000".into()
}
