//! End-to-end API tests
//!
//! Each test runs against a fresh server with its own QR cache directory.

use std::time::Duration;

use axum::http::{header, StatusCode};
use axum_test::TestServer;
use serde_json::{json, Value};
use tempfile::TempDir;

use chest_numbers_server::{app, config::Config, state::AppState};

fn test_server() -> (TestServer, AppState, TempDir) {
    let dir = TempDir::new().unwrap();
    let mut config = Config::default();
    config.cache.dir = dir.path().to_path_buf();
    let state = AppState::new(config).unwrap();
    let server = TestServer::new(app(state.clone())).unwrap();
    (server, state, dir)
}

fn count(haystack: &[u8], needle: &[u8]) -> usize {
    haystack.windows(needle.len()).filter(|w| *w == needle).count()
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

#[tokio::test]
async fn health_check_reports_healthy() {
    let (server, _state, _dir) = test_server();
    let response = server.get("/health").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn range_request_streams_a_paginated_pdf() {
    let (server, _state, dir) = test_server();

    let response = server
        .post("/api/generate-pdf")
        .json(&json!({ "start": 1, "end": 3 }))
        .await;
    response.assert_status_ok();

    let headers = response.headers();
    assert_eq!(
        headers.get(header::CONTENT_TYPE).unwrap(),
        "application/pdf"
    );
    assert!(headers
        .get(header::CONTENT_DISPOSITION)
        .unwrap()
        .to_str()
        .unwrap()
        .contains("Jerseys_1_to_3.pdf"));

    let body = response.as_bytes();
    assert!(body.starts_with(b"%PDF"));
    assert!(body.ends_with(b"%%EOF\n"));
    // Two consecutive records per page: ceil(3 / 2) pages.
    assert_eq!(count(&body, b"/Type /Page "), 2);

    let p1 = find(&body, b"(001) Tj").expect("missing label 001");
    let p2 = find(&body, b"(002) Tj").expect("missing label 002");
    let p3 = find(&body, b"(003) Tj").expect("missing label 003");
    assert!(p1 < p2 && p2 < p3, "labels must appear in order");

    // One cached artifact per number.
    let cached = std::fs::read_dir(dir.path()).unwrap().count();
    assert_eq!(cached, 3);
}

#[tokio::test]
async fn explicit_list_is_deduplicated_and_sorted() {
    let (server, _state, dir) = test_server();

    let response = server
        .post("/api/generate-pdf")
        .json(&json!({ "numbers": [5, 5, 2, 10] }))
        .await;
    response.assert_status_ok();

    assert!(response
        .headers()
        .get(header::CONTENT_DISPOSITION)
        .unwrap()
        .to_str()
        .unwrap()
        .contains("Jerseys_custom_3.pdf"));

    let body = response.as_bytes();
    assert_eq!(count(&body, b"/Type /Page "), 2);
    let p1 = find(&body, b"(002) Tj").unwrap();
    let p2 = find(&body, b"(005) Tj").unwrap();
    let p3 = find(&body, b"(010) Tj").unwrap();
    assert!(p1 < p2 && p2 < p3);

    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 3);
}

#[tokio::test]
async fn inverted_range_is_rejected_before_any_work() {
    let (server, _state, dir) = test_server();

    let response = server
        .post("/api/generate-pdf")
        .json(&json!({ "start": 10, "end": 1 }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let body: Value = response.json();
    assert_eq!(body["error"], "invalid_input");

    // No cache calls, no artifacts.
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn all_invalid_numbers_are_rejected() {
    let (server, _state, _dir) = test_server();

    let response = server
        .post("/api/generate-pdf")
        .json(&json!({ "numbers": ["x", 0, -4] }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn repeated_request_reuses_cached_artifacts() {
    let (server, state, _dir) = test_server();

    let request = json!({ "start": 1, "end": 2 });
    server.post("/api/generate-pdf").json(&request).await.assert_status_ok();
    assert_eq!(state.qr_cache().generations(), 2);

    server.post("/api/generate-pdf").json(&request).await.assert_status_ok();
    assert_eq!(
        state.qr_cache().generations(),
        2,
        "second request must not re-synthesize"
    );
}

#[tokio::test]
async fn progress_reaches_100_after_generation() {
    let (server, state, _dir) = test_server();

    let response = server
        .post("/api/generate-pdf")
        .json(&json!({ "start": 1, "end": 4, "requestId": "job-1" }))
        .await;
    response.assert_status_ok();
    assert!(response.as_bytes().starts_with(b"%PDF"));

    // Completion is settled by the render task just after the last byte is
    // handed over; give it a moment.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        if state.progress().get("job-1") == 100 {
            break;
        }
        assert!(tokio::time::Instant::now() < deadline, "never reached 100");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn progress_channel_closes_after_completion() {
    let (server, state, _dir) = test_server();
    state.progress().complete("done-job");

    // The SSE stream terminates right after emitting 100, so the response
    // body completes and can be collected whole.
    let response = server.get("/api/progress/done-job").await;
    response.assert_status_ok();
    assert!(response.text().contains(r#"{"progress":100}"#));
}
