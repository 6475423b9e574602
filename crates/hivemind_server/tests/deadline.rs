//! Request deadlines and inference backpressure surface as *busy*.

mod common;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use common::{build_state, principal};
use hivemind_embed::{EmbedError, Embedder};
use hivemind_server::{NotifierConfig, ServerSettings};
use hivemind_test_utils::MemoryStore;
use hivemind_types::CoreError;

/// Embedder that never answers in time.
struct StalledEmbedder;

#[async_trait]
impl Embedder for StalledEmbedder {
    fn model_id(&self) -> &str {
        "hivemind-test/stalled"
    }

    fn dimensions(&self) -> usize {
        8
    }

    async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbedError> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Err(EmbedError::Busy)
    }

    async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Err(EmbedError::Busy)
    }
}

/// Embedder whose queue is permanently full.
struct SaturatedEmbedder;

#[async_trait]
impl Embedder for SaturatedEmbedder {
    fn model_id(&self) -> &str {
        "hivemind-test/saturated"
    }

    fn dimensions(&self) -> usize {
        8
    }

    async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbedError> {
        Err(EmbedError::Busy)
    }

    async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        Err(EmbedError::Busy)
    }
}

#[tokio::test]
async fn search_past_the_deadline_is_busy() {
    let settings = ServerSettings {
        deadline: Duration::from_millis(50),
        ..Default::default()
    };
    let (state, _store) = build_state(
        MemoryStore::new(),
        Arc::new(StalledEmbedder),
        settings,
        NotifierConfig::default(),
    )
    .await;

    let err = hivemind_server::services::with_deadline(
        state.settings.deadline,
        state.registry.call_tool(
            "search_knowledge",
            &principal("T1", "a1"),
            json!({ "query": "anything" }),
            &state,
        ),
    )
    .await
    .unwrap_err();

    match err {
        CoreError::Busy(reason) => assert!(reason.contains("deadline"), "got: {reason}"),
        other => panic!("expected busy, got {other:?}"),
    }
}

#[tokio::test]
async fn saturated_inference_queue_is_busy_immediately() {
    let (state, _store) = build_state(
        MemoryStore::new(),
        Arc::new(SaturatedEmbedder),
        ServerSettings::default(),
        NotifierConfig::default(),
    )
    .await;

    let err = state
        .registry
        .call_tool(
            "search_knowledge",
            &principal("T1", "a1"),
            json!({ "query": "anything" }),
            &state,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, CoreError::Busy(_)));
}
