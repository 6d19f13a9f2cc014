//! Pipeline config loader (strict YAML parsing + OTel environment overrides).

pub mod schema;

use std::fs;

use otelpush_core::error::{MetricsError, Result};

pub use schema::{AppSection, ExporterSection, LimitsSection, PipelineConfig, ServiceSection};

/// Default config file looked up by the binary.
pub const DEFAULT_CONFIG_PATH: &str = "otelpush.yaml";
/// Env var overriding [`DEFAULT_CONFIG_PATH`].
pub const CONFIG_PATH_ENV: &str = "OTELPUSH_CONFIG";

pub fn load_from_file(path: &str) -> Result<PipelineConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| MetricsError::Config(format!("read config failed ({path}): {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<PipelineConfig> {
    let cfg: PipelineConfig = serde_yaml::from_str(s)
        .map_err(|e| MetricsError::Config(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Resolve the process config: file (if present) + process environment.
pub fn load() -> Result<PipelineConfig> {
    let path = std::env::var(CONFIG_PATH_ENV).ok();
    let explicit = path.is_some();
    let path = path.unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

    let mut cfg = match fs::read_to_string(&path) {
        Ok(s) => serde_yaml::from_str(&s)
            .map_err(|e| MetricsError::Config(format!("invalid yaml ({path}): {e}")))?,
        Err(e) if explicit => {
            return Err(MetricsError::Config(format!("read config failed ({path}): {e}")));
        }
        Err(_) => PipelineConfig::default(),
    };
    cfg.apply_env(|k| std::env::var(k).ok())?;
    cfg.validate()?;
    Ok(cfg)
}
