//! Shared application state for the load generator.
//!
//! Built once at boot: the metrics registry is constructed here and handed to
//! the dispatcher, then shared read-only with the `/metrics` handler.

use std::sync::Arc;

use crate::config::LoadConfig;
use crate::dispatch::Dispatcher;
use crate::obs::LoadMetrics;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
    metrics: Arc<LoadMetrics>,
    dispatcher: Arc<Dispatcher>,
}

struct AppStateInner {
    cfg: LoadConfig,
    instance_id: String,
}

impl AppState {
    /// Build application state from a validated config.
    pub fn new(cfg: LoadConfig) -> Self {
        let instance_id = cfg.server.resolve_instance_id();
        let metrics = Arc::new(LoadMetrics::new(
            &cfg.metrics.namespace,
            &cfg.metrics.subsystem,
        ));

        let dispatcher = Dispatcher::new(
            Arc::clone(&metrics),
            cfg.workloads.options(),
            cfg.workloads.max_iterations,
            instance_id.clone(),
        );

        tracing::info!(
            %instance_id,
            keygen_bits = cfg.workloads.keygen_bits,
            max_iterations = ?cfg.workloads.max_iterations,
            "app state ready"
        );

        Self {
            inner: Arc::new(AppStateInner { cfg, instance_id }),
            metrics,
            dispatcher: Arc::new(dispatcher),
        }
    }

    pub fn cfg(&self) -> &LoadConfig {
        &self.inner.cfg
    }

    pub fn instance_id(&self) -> &str {
        &self.inner.instance_id
    }

    pub fn metrics(&self) -> Arc<LoadMetrics> {
        Arc::clone(&self.metrics)
    }

    pub fn dispatcher(&self) -> Arc<Dispatcher> {
        Arc::clone(&self.dispatcher)
    }
}
