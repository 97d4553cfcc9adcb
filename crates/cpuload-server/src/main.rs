//! cpuload-server
//!
//! - `GET /run?function=euler|keygen&iterations=N` burns CPU and reports elapsed time
//! - `GET /metrics` exposes request counters and gauges
//! - Graceful shutdown on Ctrl-C (readyz flips to 503 first)

use tracing_subscriber::{fmt, EnvFilter};

use cpuload_server::{app_state, config, router};

#[tokio::main]
async fn main() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let cfg = config::load().expect("config load failed");
    let listen = cfg.server.listen_addr().expect("server.listen must be a valid SocketAddr");

    log_env_names();

    let state = app_state::AppState::new(cfg);
    let metrics = state.metrics();
    let app = router::build_router(state);

    tracing::info!(%listen, "cpuload-server starting");
    let listener = tokio::net::TcpListener::bind(listen).await.expect("failed to bind");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::warn!(error = %err, "ctrl_c listener error");
            }
            metrics.set_draining();
            tracing::info!("shutdown signal received, draining");
        })
        .await
        .expect("server failed");
}

/// Names only; values may hold secrets.
fn log_env_names() {
    for (key, _) in std::env::vars_os() {
        tracing::info!(name = %key.to_string_lossy(), "environment variable");
    }
}
