//! Top-level facade crate for cpuload.
//!
//! Re-exports the workload library and the HTTP server so users can depend on a single crate.

pub mod core {
    pub use cpuload_core::*;
}

pub mod server {
    pub use cpuload_server::*;
}
