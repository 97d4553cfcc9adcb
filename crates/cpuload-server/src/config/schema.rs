use std::net::SocketAddr;

use serde::Deserialize;

use cpuload_core::error::{CpuLoadError, Result};
use cpuload_core::workload::{WorkloadOptions, DEFAULT_KEYGEN_BITS};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoadConfig {
    pub version: u32,

    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub metrics: MetricsSection,

    #[serde(default)]
    pub workloads: WorkloadSection,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            version: 1,
            server: ServerSection::default(),
            metrics: MetricsSection::default(),
            workloads: WorkloadSection::default(),
        }
    }
}

impl LoadConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(CpuLoadError::UnsupportedVersion);
        }

        self.server.validate()?;
        self.metrics.validate()?;
        self.workloads.validate()?;

        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Value of the `instance_id` label; falls back to `$HOSTNAME`.
    #[serde(default)]
    pub instance_id: Option<String>,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            instance_id: None,
        }
    }
}

impl ServerSection {
    pub fn validate(&self) -> Result<()> {
        self.listen_addr()?;
        if matches!(&self.instance_id, Some(id) if id.trim().is_empty()) {
            return Err(CpuLoadError::BadRequest(
                "server.instance_id must not be blank".into(),
            ));
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr> {
        self.listen.parse().map_err(|e| {
            CpuLoadError::BadRequest(format!(
                "server.listen must be a valid SocketAddr ({}): {e}",
                self.listen
            ))
        })
    }

    pub fn resolve_instance_id(&self) -> String {
        self.instance_id
            .clone()
            .or_else(|| std::env::var("HOSTNAME").ok().filter(|h| !h.is_empty()))
            .unwrap_or_else(|| "unknown".into())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricsSection {
    #[serde(default = "default_namespace")]
    pub namespace: String,

    #[serde(default = "default_subsystem")]
    pub subsystem: String,
}

impl Default for MetricsSection {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            subsystem: default_subsystem(),
        }
    }
}

impl MetricsSection {
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [("namespace", &self.namespace), ("subsystem", &self.subsystem)] {
            // empty parts are dropped from the prefix
            if !value.is_empty() && !is_metric_name(value) {
                return Err(CpuLoadError::BadRequest(format!(
                    "metrics.{field} must match [a-zA-Z_][a-zA-Z0-9_]*"
                )));
            }
        }
        Ok(())
    }
}

fn is_metric_name(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkloadSection {
    #[serde(default = "default_keygen_bits")]
    pub keygen_bits: usize,

    /// Optional per-request ceiling on `iterations`.
    #[serde(default)]
    pub max_iterations: Option<u64>,
}

impl Default for WorkloadSection {
    fn default() -> Self {
        Self {
            keygen_bits: default_keygen_bits(),
            max_iterations: None,
        }
    }
}

impl WorkloadSection {
    pub fn validate(&self) -> Result<()> {
        if !(1024..=8192).contains(&self.keygen_bits) || self.keygen_bits % 8 != 0 {
            return Err(CpuLoadError::BadRequest(
                "workloads.keygen_bits must be a multiple of 8 between 1024 and 8192".into(),
            ));
        }
        Ok(())
    }

    pub fn options(&self) -> WorkloadOptions {
        WorkloadOptions {
            keygen_bits: self.keygen_bits,
        }
    }
}

fn default_listen() -> String {
    "0.0.0.0:8090".into()
}
fn default_namespace() -> String {
    "load_test".into()
}
fn default_subsystem() -> String {
    "stress_tester".into()
}
fn default_keygen_bits() -> usize {
    DEFAULT_KEYGEN_BITS
}
