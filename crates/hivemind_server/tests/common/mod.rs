//! Shared harness for the server integration suites: full app state over
//! the in-memory store and the deterministic embedder.
#![allow(dead_code)]

use std::sync::Arc;

use hivemind_db::store::KnowledgeStore;
use hivemind_embed::Embedder;
use hivemind_sanitize::Sanitizer;
use hivemind_server::{
    ApiKeyAuthenticator, AppState, Notifier, NotifierConfig, Principal, ServerSettings,
};
use hivemind_test_utils::{DeterministicEmbedder, MemoryStore};
use hivemind_types::{AgentId, TenantId};

pub async fn test_state() -> (AppState, MemoryStore) {
    test_state_with(ServerSettings::default(), NotifierConfig::default()).await
}

pub async fn test_state_with(
    settings: ServerSettings,
    notifier_config: NotifierConfig,
) -> (AppState, MemoryStore) {
    let store = MemoryStore::new();
    let embedder: Arc<dyn Embedder> = Arc::new(DeterministicEmbedder::new());
    build_state(store, embedder, settings, notifier_config).await
}

pub async fn build_state(
    store: MemoryStore,
    embedder: Arc<dyn Embedder>,
    settings: ServerSettings,
    notifier_config: NotifierConfig,
) -> (AppState, MemoryStore) {
    let sanitizer = Arc::new(Sanitizer::new().expect("sanitizer construction"));
    let auth = Arc::new(ApiKeyAuthenticator::from_toml(CREDENTIALS).expect("credentials"));

    let stream = store
        .subscribe_approvals()
        .await
        .expect("approval subscription");
    let (notifier, _task) = Notifier::spawn(stream, notifier_config);

    let state = AppState::new(
        Arc::new(store.clone()),
        sanitizer,
        embedder,
        auth,
        notifier,
        settings,
    );
    (state, store)
}

pub const CREDENTIALS: &str = r#"
[[keys]]
token = "token-t1-a1"
tenant_id = "T1"
agent_id = "a1"

[[keys]]
token = "token-t1-a2"
tenant_id = "T1"
agent_id = "a2"

[[keys]]
token = "token-t2-a1"
tenant_id = "T2"
agent_id = "a1"

[[keys]]
token = "token-t3-a3"
tenant_id = "T3"
agent_id = "a3"

[[keys]]
token = "token-operator"
tenant_id = "T1"
agent_id = "reviewer"
operator = true
"#;

pub fn principal(tenant: &str, agent: &str) -> Principal {
    Principal {
        tenant_id: TenantId::new(tenant),
        agent_id: AgentId::new(agent),
        operator: false,
    }
}
