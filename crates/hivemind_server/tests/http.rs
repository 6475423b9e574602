//! The HTTP surface: JSON-RPC over POST /mcp, auth enforcement, and the
//! tool-error wire shape.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use common::test_state;
use hivemind_server::router;

async fn rpc(
    app: &axum::Router,
    token: Option<&str>,
    body: Value,
) -> Value {
    let mut request = Request::builder()
        .method("POST")
        .uri("/mcp")
        .header("content-type", "application/json");
    if let Some(token) = token {
        request = request.header("authorization", format!("Bearer {token}"));
    }
    let response = app
        .clone()
        .oneshot(request.body(Body::from(body.to_string())).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn call(id: i64, method: &str, params: Value) -> Value {
    json!({ "jsonrpc": "2.0", "id": id, "method": method, "params": params })
}

/// Tool results arrive as a JSON string inside the first content block.
fn tool_payload(response: &Value) -> Value {
    let text = response["result"]["content"][0]["text"].as_str().unwrap();
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

#[tokio::test]
async fn ping_needs_no_credential() {
    let (state, _store) = test_state().await;
    let app = router(state);

    let response = rpc(&app, None, call(1, "ping", json!({}))).await;
    assert!(response["error"].is_null());
}

#[tokio::test]
async fn tool_calls_without_credential_are_rejected() {
    let (state, _store) = test_state().await;
    let app = router(state);

    let response = rpc(
        &app,
        None,
        call(1, "tools/call", json!({ "name": "list_knowledge", "arguments": {} })),
    )
    .await;
    assert_eq!(response["error"]["code"], -32001);
    assert_eq!(response["error"]["message"], "authentication failed");
}

#[tokio::test]
async fn initialize_and_tools_list_round_trip() {
    let (state, _store) = test_state().await;
    let app = router(state);

    let init = rpc(
        &app,
        Some("token-t1-a1"),
        call(
            1,
            "initialize",
            json!({
                "protocolVersion": "2024-11-05",
                "capabilities": {},
                "clientInfo": { "name": "test", "version": "0" }
            }),
        ),
    )
    .await;
    assert_eq!(init["result"]["protocolVersion"], "2024-11-05");
    assert_eq!(init["result"]["serverInfo"]["name"], "hivemind");

    let tools = rpc(&app, Some("token-t1-a1"), call(2, "tools/list", json!({}))).await;
    let names: Vec<&str> = tools["result"]["tools"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert_eq!(
        names,
        vec![
            "add_knowledge",
            "delete_knowledge",
            "list_knowledge",
            "search_knowledge"
        ]
    );
}

#[tokio::test]
async fn add_and_search_over_http() {
    let (state, _store) = test_state().await;
    let app = router(state.clone());

    let added = rpc(
        &app,
        Some("token-t1-a1"),
        call(
            1,
            "tools/call",
            json!({
                "name": "add_knowledge",
                "arguments": {
                    "content": "The fix for Redis pipeline timeouts in staging is to set PINGINTERVAL=5.",
                    "category": "bug_fix",
                    "confidence": 0.9
                }
            }),
        ),
    )
    .await;
    let receipt = tool_payload(&added);
    assert_eq!(receipt["status"], "queued");
    let id = receipt["contribution_id"].as_str().unwrap().to_string();

    state
        .approval
        .approve(
            hivemind_types::SnippetId::parse(&id).unwrap(),
            hivemind_server::services::ApprovalRequest::default(),
        )
        .await
        .unwrap();

    let found = rpc(
        &app,
        Some("token-t1-a2"),
        call(
            2,
            "tools/call",
            json!({
                "name": "search_knowledge",
                "arguments": { "query": "redis timeout staging", "limit": 5 }
            }),
        ),
    )
    .await;
    let payload = tool_payload(&found);
    assert_eq!(payload["results"][0]["id"], id);
}

#[tokio::test]
async fn tool_failures_use_the_error_flag_with_one_message() {
    let (state, _store) = test_state().await;
    let app = router(state);

    let response = rpc(
        &app,
        Some("token-t1-a1"),
        call(
            1,
            "tools/call",
            json!({
                "name": "add_knowledge",
                "arguments": { "content": "x", "category": "not_a_category", "confidence": 0.5 }
            }),
        ),
    )
    .await;

    assert!(response["error"].is_null(), "tool errors are not RPC errors");
    assert_eq!(response["result"]["isError"], true);
    let message = response["result"]["content"][0]["text"].as_str().unwrap();
    assert!(message.starts_with("invalid input"), "got: {message}");
    assert!(!message.contains("backtrace"));
}

#[tokio::test]
async fn unknown_method_is_method_not_found() {
    let (state, _store) = test_state().await;
    let app = router(state);

    let response = rpc(
        &app,
        Some("token-t1-a1"),
        call(1, "resources/list", json!({})),
    )
    .await;
    assert_eq!(response["error"]["code"], -32601);
}

#[tokio::test]
async fn healthz_reports_model_identity() {
    let (state, _store) = test_state().await;
    let app = router(state);

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/healthz")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["embedding_model"], "hivemind-test/deterministic-bow");
}

#[tokio::test]
async fn events_endpoint_requires_a_credential() {
    let (state, _store) = test_state().await;
    let app = router(state);

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/events")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
