//! Server config loader (strict parsing).

pub mod schema;

use std::fs;
use std::path::Path;

use cpuload_core::error::{CpuLoadError, Result};

pub use schema::{LoadConfig, MetricsSection, ServerSection, WorkloadSection};

/// Environment variable naming an alternate config file.
pub const CONFIG_ENV: &str = "CPULOAD_CONFIG";
/// Config file picked up from the working directory when present.
pub const DEFAULT_CONFIG_PATH: &str = "cpuload.yaml";

pub fn load_from_file(path: &str) -> Result<LoadConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| CpuLoadError::Internal(format!("read config failed ({path}): {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<LoadConfig> {
    let cfg: LoadConfig = serde_yaml::from_str(s)
        .map_err(|e| CpuLoadError::BadRequest(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Resolve config at boot: `$CPULOAD_CONFIG` must exist when set,
/// `cpuload.yaml` is optional, built-in defaults otherwise.
pub fn load() -> Result<LoadConfig> {
    if let Ok(path) = std::env::var(CONFIG_ENV) {
        return load_from_file(&path);
    }
    if Path::new(DEFAULT_CONFIG_PATH).exists() {
        return load_from_file(DEFAULT_CONFIG_PATH);
    }
    tracing::info!("no config file found; using defaults");
    let cfg = LoadConfig::default();
    cfg.validate()?;
    Ok(cfg)
}
