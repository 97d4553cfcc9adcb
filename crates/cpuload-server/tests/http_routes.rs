//! End-to-end route tests through the axum router (no socket).

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use tower::ServiceExt;

use cpuload_server::{app_state::AppState, config, router};

fn app() -> (Router, AppState) {
    let cfg = config::load_from_str(
        r#"
version: 1
server:
  instance_id: "pod-http"
workloads:
  keygen_bits: 1024
"#,
    )
    .expect("config");
    let state = AppState::new(cfg);
    (router::build_router(state.clone()), state)
}

async fn get(app: &Router, uri: &str) -> (StatusCode, String) {
    let resp = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

#[tokio::test]
async fn state_carries_config() {
    let (_, state) = app();
    assert_eq!(state.instance_id(), "pod-http");
    assert_eq!(state.cfg().workloads.keygen_bits, 1024);
}

#[tokio::test]
async fn run_euler_ok() {
    let (app, _) = app();
    let (status, body) = get(&app, "/run?function=euler&iterations=0").await;
    assert_eq!(status, StatusCode::OK);
    let secs: f64 = body.strip_prefix("Elapsed Time: ").unwrap().parse().unwrap();
    assert!(secs >= 0.0);
}

#[tokio::test]
async fn run_missing_function() {
    let (app, _) = app();
    let (status, body) = get(&app, "/run").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("missing function parameter"));

    let (status, _) = get(&app, "/run?function=&iterations=5").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn run_escapes_unknown_function() {
    let (app, _) = app();
    let (status, body) = get(&app, "/run?function=%3Cscript%3Ebogus%3C%2Fscript%3E").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("bogus"));
    assert!(!body.contains("<script>"));
}

#[tokio::test]
async fn run_malformed_iterations_is_counted() {
    let (app, state) = app();
    let (status, body) = get(&app, "/run?function=euler&iterations=-4").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("invalid value for iterations"));
    assert_eq!(
        state
            .metrics()
            .requests_total
            .get(&[("function", "euler"), ("status_code", "400")]),
        1
    );
}

#[tokio::test]
async fn run_repeated_params_keep_first() {
    let (app, state) = app();
    let (status, body) = get(&app, "/run?function=euler&iterations=0&function=bogus&iterations=x").await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(
        state
            .metrics()
            .requests_total
            .get(&[("function", "euler"), ("status_code", "200")]),
        1
    );
}

#[tokio::test]
async fn run_keygen_ok() {
    let (app, _) = app();
    let (status, body) = get(&app, "/run?function=keygen&iterations=1").await;
    assert_eq!(status, StatusCode::OK, "{body}");
}

#[tokio::test]
async fn metrics_reflect_runs() {
    let (app, state) = app();
    get(&app, "/run?function=euler&iterations=1").await;
    get(&app, "/run?function=euler&iterations=1").await;
    get(&app, "/run?function=nope").await;

    let (status, body) = get(&app, "/metrics").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(
        "load_test_stress_tester_requests_total{function=\"euler\",status_code=\"200\"} 2"
    ));
    assert!(body.contains(
        "load_test_stress_tester_requests_total{function=\"unknown\",status_code=\"400\"} 1"
    ));
    assert!(body.contains("load_test_stress_tester_run_duration_seconds{function=\"euler\",status_code=\"200\"}"));
    assert!(body.contains(
        "load_test_stress_tester_in_flight_threads{function=\"run\",instance_id=\"pod-http\"} 0"
    ));
    assert_eq!(state.metrics().requests_total.total(), 3);
}

#[tokio::test]
async fn health_and_readiness() {
    let (app, state) = app();
    assert_eq!(get(&app, "/healthz").await, (StatusCode::OK, "ok".to_string()));
    assert_eq!(get(&app, "/readyz").await, (StatusCode::OK, "ready".to_string()));

    state.metrics().set_draining();
    assert_eq!(
        get(&app, "/readyz").await,
        (StatusCode::SERVICE_UNAVAILABLE, "draining".to_string())
    );
    assert!(get(&app, "/metrics").await.1.contains("load_test_stress_tester_draining 1"));
}

#[tokio::test]
async fn concurrent_http_requests_are_counted() {
    let (app, state) = app();
    let mut tasks = Vec::new();
    for i in 0..40 {
        let app = app.clone();
        let uri = if i % 2 == 0 {
            "/run?function=euler&iterations=10"
        } else {
            "/run?function=keygen&iterations=oops"
        };
        tasks.push(tokio::spawn(async move { get(&app, uri).await }));
    }
    for t in tasks {
        t.await.unwrap();
    }
    assert_eq!(state.metrics().requests_total.total(), 40);
    assert_eq!(
        state
            .metrics()
            .requests_total
            .get(&[("function", "keygen"), ("status_code", "400")]),
        20
    );
}
