//! Shared error type across cpuload crates.

use thiserror::Error;

/// Outcome classes surfaced to HTTP clients (stable API).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing/unknown function, malformed iterations, invalid config.
    ClientInput,
    /// A workload failed while running (e.g. key generation).
    WorkloadExecution,
    /// Internal server error.
    Internal,
}

impl ErrorKind {
    /// String representation used in logs and tests.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::ClientInput => "CLIENT_INPUT",
            ErrorKind::WorkloadExecution => "WORKLOAD_EXECUTION",
            ErrorKind::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, CpuLoadError>;

/// Unified error type used by core and server.
#[derive(Debug, Error)]
pub enum CpuLoadError {
    #[error("missing function parameter in query string")]
    MissingFunction,
    #[error("unknown function '{0}'")]
    UnknownFunction(String),
    #[error("invalid value for iterations: {0}")]
    InvalidIterations(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("unsupported config version")]
    UnsupportedVersion,
    #[error("error in key generation: {0}")]
    Generation(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl CpuLoadError {
    /// Map an error to its client-facing outcome class.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CpuLoadError::MissingFunction
            | CpuLoadError::UnknownFunction(_)
            | CpuLoadError::InvalidIterations(_)
            | CpuLoadError::BadRequest(_)
            | CpuLoadError::UnsupportedVersion => ErrorKind::ClientInput,
            CpuLoadError::Generation(_) => ErrorKind::WorkloadExecution,
            CpuLoadError::Internal(_) => ErrorKind::Internal,
        }
    }
}
