//! `/run` handler.
//!
//! Parameters are extracted as raw strings. A typed extractor would reject a
//! malformed `iterations` before the dispatcher sees it, and that request
//! would never be counted.
//!
//! The workload runs on tokio's blocking pool. It keeps that thread busy until
//! it finishes and is not cancelled if the client goes away.

use std::time::Instant;

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use tokio::task::JoinError;

use crate::app_state::AppState;
use crate::dispatch::{function_label, RunOutcome, RunQuery};
use crate::obs::LoadMetrics;

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

pub async fn run(
    State(app): State<AppState>,
    Query(params): Query<Vec<(String, String)>>,
) -> Response {
    let query = RunQuery::from_params(params);
    let function = function_label(query.function.as_deref());
    let dispatcher = app.dispatcher();
    let start = Instant::now();

    let joined = tokio::task::spawn_blocking(move || dispatcher.handle(&query)).await;
    respond(joined, function, start, &app.metrics())
}

/// Build the HTTP response. A task that died before producing an outcome is
/// still recorded once, as a 500.
fn respond(
    joined: Result<RunOutcome, JoinError>,
    function: &str,
    start: Instant,
    metrics: &LoadMetrics,
) -> Response {
    match joined {
        Ok(outcome) => (outcome.status, [(header::CONTENT_TYPE, TEXT_PLAIN)], outcome.body)
            .into_response(),
        Err(e) => {
            let elapsed = start.elapsed();
            let status = StatusCode::INTERNAL_SERVER_ERROR;
            metrics.observe_run(function, status.as_u16(), elapsed);
            tracing::error!(function, error = %e, "run task aborted");
            (
                status,
                [(header::CONTENT_TYPE, TEXT_PLAIN)],
                format!("Error: internal error\nElapsed Time: {:.6}", elapsed.as_secs_f64()),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn aborted_task_is_counted_as_500() {
        let metrics = LoadMetrics::new("t", "s");
        let start = Instant::now();
        let joined = tokio::task::spawn_blocking(|| -> RunOutcome { panic!("workload blew up") }).await;
        assert!(joined.is_err());

        let resp = respond(joined, "keygen", start, &metrics);
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let body = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(body.starts_with("Error: internal error\n"), "{body}");
        assert!(body.lines().last().unwrap().starts_with("Elapsed Time: "), "{body}");

        let labels = [("function", "keygen"), ("status_code", "500")];
        assert_eq!(metrics.requests_total.get(&labels), 1);
        assert_eq!(metrics.requests_total.total(), 1);
        assert!(metrics.run_duration_seconds.get(&labels).is_some());
    }
}
