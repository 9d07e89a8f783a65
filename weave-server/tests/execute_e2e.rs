//! End-to-end HTTP test for the `/execute` request surface (§6.1), driven
//! straight through the axum router via `tower::ServiceExt::oneshot` — no
//! real socket needed.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use weave_engine::{AgentRegistry, ExecutionEngine};
use weave_server::{router, AppState};

fn state() -> AppState {
    AppState {
        engine: Arc::new(ExecutionEngine::new(AgentRegistry::new(), vec![])),
        request_timeout: std::time::Duration::from_secs(300),
    }
}

#[tokio::test]
async fn pass_through_prompt_streams_a_done_event_with_the_prompt_text() {
    let body = serde_json::json!({
        "message": "ignored",
        "workflow_nodes": [
            { "id": "p1", "type": "input", "position": {"x": 0, "y": 0}, "data": { "nodeType": "prompt", "promptText": "Hello there" } },
            { "id": "r1", "type": "output", "position": {"x": 1, "y": 0}, "data": { "nodeType": "response" } }
        ],
        "workflow_edges": [
            { "id": "e1", "source": "p1", "target": "r1" }
        ]
    });

    let request = Request::builder()
        .method("POST")
        .uri("/execute")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();

    let response = router(state()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8(bytes.to_vec()).unwrap();

    assert!(text.contains("event: done"));
    assert!(text.contains("Hello there"));
}

#[tokio::test]
async fn cyclic_workflow_is_rejected_before_the_stream_opens() {
    let body = serde_json::json!({
        "message": "hi",
        "workflow_nodes": [
            { "id": "a", "type": "input", "position": {"x": 0, "y": 0}, "data": { "nodeType": "prompt" } },
            { "id": "b", "type": "agent", "position": {"x": 1, "y": 0}, "data": { "nodeType": "synthesis" } }
        ],
        "workflow_edges": [
            { "id": "e1", "source": "a", "target": "b" },
            { "id": "e2", "source": "b", "target": "a" }
        ]
    });

    let request = Request::builder()
        .method("POST")
        .uri("/execute")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();

    let response = router(state()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn healthz_returns_ok_unconditionally() {
    let request = Request::builder().method("GET").uri("/healthz").body(Body::empty()).unwrap();

    let response = router(state()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn malformed_json_body_is_rejected() {
    let request = Request::builder()
        .method("POST")
        .uri("/execute")
        .header("content-type", "application/json")
        .body(Body::from("not json"))
        .unwrap();

    let response = router(state()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
