//! HTTP transport: the MCP endpoint, the SSE event stream, and health.
//!
//! `POST /mcp` carries one JSON-RPC message per request. Every method
//! except `ping` requires a verified credential; tool-level failures are
//! reported as tool results with the error flag set, so agents see a
//! single human-readable message and never a stack trace.

use std::convert::Infallible;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::sse::{Event as SseEvent, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::stream::Stream;
use serde_json::{json, Value};
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tower_http::trace::TraceLayer;
use tracing::info;

use hivemind_types::CoreError;

use crate::auth::Principal;
use crate::notifier::OutboundEvent;
use crate::protocol::{
    methods, ErrorCode, InitializeResult, JsonRpcError, JsonRpcRequest, JsonRpcResponse,
    ServerCapabilities, ServerInfo, ToolCallParams, ToolCallResult, ToolsCapability,
    ToolsListResult, AUTH_ERROR_CODE, JSONRPC_VERSION, MCP_PROTOCOL_VERSION,
};
use crate::services::with_deadline;
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/mcp", post(mcp_handler))
        .route("/events", get(events_handler))
        .route("/healthz", get(healthz_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn mcp_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Json<JsonRpcResponse> {
    let request: JsonRpcRequest = match serde_json::from_str(&body) {
        Ok(req) => req,
        Err(e) => {
            return Json(JsonRpcResponse::error(
                None,
                JsonRpcError::new(ErrorCode::ParseError, format!("invalid JSON: {e}")),
            ));
        }
    };

    if request.jsonrpc != JSONRPC_VERSION {
        return Json(JsonRpcResponse::error(
            request.id,
            JsonRpcError::new(
                ErrorCode::InvalidRequest,
                format!("unsupported JSON-RPC version: {}", request.jsonrpc),
            ),
        ));
    }

    // Keepalive is unauthenticated; everything else resolves a principal.
    if request.method == methods::PING {
        return Json(JsonRpcResponse::success(request.id, json!({})));
    }

    let principal = match state.auth.authenticate(&headers) {
        Ok(p) => p,
        Err(e) => {
            return Json(JsonRpcResponse::error(
                request.id,
                JsonRpcError::new(ErrorCode::ServerError(AUTH_ERROR_CODE), e.public_message()),
            ));
        }
    };

    match request.method.as_str() {
        methods::INITIALIZE => {
            info!(tenant = %principal.tenant_id, agent = %principal.agent_id, "initialize");
            let result = InitializeResult {
                protocol_version: MCP_PROTOCOL_VERSION.to_string(),
                capabilities: ServerCapabilities {
                    tools: Some(ToolsCapability {
                        list_changed: false,
                    }),
                },
                server_info: ServerInfo {
                    name: state.settings.server_name.clone(),
                    version: state.settings.server_version.clone(),
                },
            };
            Json(JsonRpcResponse::success(
                request.id,
                serde_json::to_value(result).unwrap_or(Value::Null),
            ))
        }
        methods::INITIALIZED => {
            // A notification; acknowledge with an empty result so the
            // HTTP exchange still has a body.
            Json(JsonRpcResponse::success(request.id, Value::Null))
        }
        methods::TOOLS_LIST => {
            let result = ToolsListResult {
                tools: state.registry.list_tools(),
            };
            Json(JsonRpcResponse::success(
                request.id,
                serde_json::to_value(result).unwrap_or(Value::Null),
            ))
        }
        methods::TOOLS_CALL => Json(handle_tool_call(state, principal, request).await),
        other => Json(JsonRpcResponse::error(
            request.id,
            JsonRpcError::new(ErrorCode::MethodNotFound, format!("unknown method: {other}")),
        )),
    }
}

async fn handle_tool_call(
    state: AppState,
    principal: Principal,
    request: JsonRpcRequest,
) -> JsonRpcResponse {
    let params: ToolCallParams = match request.params.map(serde_json::from_value).transpose() {
        Ok(Some(params)) => params,
        Ok(None) => {
            return JsonRpcResponse::error(
                request.id,
                JsonRpcError::new(ErrorCode::InvalidParams, "missing tool call params"),
            );
        }
        Err(e) => {
            return JsonRpcResponse::error(
                request.id,
                JsonRpcError::new(ErrorCode::InvalidParams, format!("invalid params: {e}")),
            );
        }
    };

    info!(tool = %params.name, tenant = %principal.tenant_id, "tool call");

    let deadline = state.settings.deadline;
    let registry = state.registry.clone();
    let result = with_deadline(
        deadline,
        registry.call_tool(&params.name, &principal, params.arguments, &state),
    )
    .await;

    let tool_result = match result {
        Ok(value) => ToolCallResult::ok(&value),
        Err(error) => tool_failure(error),
    };

    JsonRpcResponse::success(
        request.id,
        serde_json::to_value(tool_result).unwrap_or(Value::Null),
    )
}

/// Taxonomy → wire message. One human-readable line, nothing internal.
fn tool_failure(error: CoreError) -> ToolCallResult {
    ToolCallResult::failed(error.public_message())
}

async fn events_handler(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let principal = match state.auth.authenticate(&headers) {
        Ok(p) => p,
        Err(e) => return (StatusCode::UNAUTHORIZED, e.public_message()).into_response(),
    };

    let subscription = match state.notifier.subscribe(principal.tenant_id.clone()).await {
        Ok(s) => s,
        Err(e) => return (StatusCode::SERVICE_UNAVAILABLE, e.public_message()).into_response(),
    };

    info!(tenant = %principal.tenant_id, "event stream subscriber connected");
    Sse::new(event_stream(subscription)).into_response()
}

fn event_stream(
    subscription: crate::notifier::Subscription,
) -> impl Stream<Item = Result<SseEvent, Infallible>> {
    ReceiverStream::new(subscription.into_inner()).map(|event| {
        let sse = match event {
            OutboundEvent::Public(payload) => SseEvent::default()
                .event("public")
                .data(serde_json::to_string(&payload).unwrap_or_else(|_| "{}".into())),
            OutboundEvent::Private(payload) => SseEvent::default()
                .event("private")
                .data(serde_json::to_string(&payload).unwrap_or_else(|_| "{}".into())),
            OutboundEvent::Ping => SseEvent::default().event("ping").data("{}"),
        };
        Ok(sse)
    })
}

async fn healthz_handler(State(state): State<AppState>) -> Response {
    match state.store.load_identity().await {
        Ok(identity) => Json(json!({
            "status": "ok",
            "embedding_model": state.embedder.model_id(),
            "dimensions": state.embedder.dimensions(),
            "identity_pinned": identity.is_some(),
        }))
        .into_response(),
        Err(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "degraded" })),
        )
            .into_response(),
    }
}
