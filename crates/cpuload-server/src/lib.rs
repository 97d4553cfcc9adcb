//! cpuload server library entry.
//!
//! Wires config, the metrics registry, the dispatcher and the HTTP routes
//! into a load-generator service. Consumed by the binary (`main.rs`) and by
//! integration tests.

pub mod app_state;
pub mod config;
pub mod dispatch;
pub mod obs;
pub mod ops;
pub mod router;
pub mod transport;
