//! cpuload core: the workload library and the error surface shared with the
//! HTTP server.
//!
//! Workloads are plain synchronous functions. They carry no runtime, I/O or
//! shared state, so any number of requests may run them at once.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! All fallible paths surface as `CpuLoadError`/`Result`.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod escape;
pub mod workload;

/// Shared result type.
pub use error::{CpuLoadError, ErrorKind, Result};
pub use workload::WorkloadKind;
