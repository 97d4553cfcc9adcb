//! Lightweight in-process metrics.
//!
//! Metrics are stored as atomics inside an explicitly constructed registry
//! and rendered by the `/metrics` handler.

pub mod metrics;

pub use metrics::{CounterVec, FloatGaugeVec, GaugeVec, InFlightGuard, LoadMetrics};
