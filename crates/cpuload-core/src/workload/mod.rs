//! Workload library (series summation + RSA key generation).
//!
//! Every workload is synchronous and CPU-bound. It never yields, sleeps or
//! touches I/O: the point is to hold a thread busy for a time proportional to
//! `iterations`. Callers that live on an async runtime must move the call onto
//! a blocking thread themselves.

pub mod euler;
pub mod keygen;

use crate::error::Result;

/// Default RSA modulus size for the `keygen` workload.
pub const DEFAULT_KEYGEN_BITS: usize = 4096;

/// Closed set of workloads selectable by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkloadKind {
    /// Truncated series approximating Euler's number.
    Euler,
    /// RSA key pair generation plus public-key fingerprint.
    Keygen,
}

impl WorkloadKind {
    pub const ALL: [WorkloadKind; 2] = [WorkloadKind::Euler, WorkloadKind::Keygen];

    /// Resolve a query-string name. Unknown names yield `None`.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "euler" => Some(WorkloadKind::Euler),
            "keygen" => Some(WorkloadKind::Keygen),
            _ => None,
        }
    }

    /// Name used on the wire and as the metrics `function` label.
    pub fn as_str(self) -> &'static str {
        match self {
            WorkloadKind::Euler => "euler",
            WorkloadKind::Keygen => "keygen",
        }
    }

    /// Run the workload `iterations` times on the calling thread.
    pub fn run(self, iterations: u64, opts: &WorkloadOptions) -> Result<()> {
        match self {
            WorkloadKind::Euler => {
                euler::euler(iterations);
                Ok(())
            }
            WorkloadKind::Keygen => keygen::keygen(iterations, opts.keygen_bits),
        }
    }
}

/// Tunables shared by all workloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkloadOptions {
    pub keygen_bits: usize,
}

impl Default for WorkloadOptions {
    fn default() -> Self {
        Self {
            keygen_bits: DEFAULT_KEYGEN_BITS,
        }
    }
}
