//! Approval fan-out: tenant filtering, heartbeats, commit-only emission.

mod common;

use std::time::Duration;

use serde_json::json;

use common::{principal, test_state, test_state_with};
use hivemind_server::services::ApprovalRequest;
use hivemind_server::{NotifierConfig, OutboundEvent, ServerSettings};
use hivemind_types::{SnippetId, TenantId};

const WAIT: Duration = Duration::from_secs(5);

async fn next_event(
    sub: &mut hivemind_server::Subscription,
) -> Option<OutboundEvent> {
    loop {
        match tokio::time::timeout(WAIT, sub.next()).await {
            Ok(Some(OutboundEvent::Ping)) => continue,
            Ok(event) => return event,
            Err(_) => return None,
        }
    }
}

async fn queue_contribution(
    state: &hivemind_server::AppState,
    tenant: &str,
    content: &str,
) -> SnippetId {
    let result = state
        .registry
        .call_tool(
            "add_knowledge",
            &principal(tenant, "a1"),
            json!({ "content": content, "category": "bug_fix", "confidence": 0.9 }),
            state,
        )
        .await
        .unwrap();
    SnippetId::parse(result["contribution_id"].as_str().unwrap()).unwrap()
}

#[tokio::test]
async fn private_approval_reaches_only_the_owning_tenant() {
    let (state, _store) = test_state().await;

    let mut t1_sub = state.notifier.subscribe(TenantId::new("T1")).await.unwrap();
    let mut t2_sub = state.notifier.subscribe(TenantId::new("T2")).await.unwrap();

    let id = queue_contribution(&state, "T1", "private tenant-one knowledge").await;
    state
        .approval
        .approve(id, ApprovalRequest::default())
        .await
        .unwrap();

    match next_event(&mut t1_sub).await {
        Some(OutboundEvent::Private(event)) => {
            assert_eq!(event.id, id);
            assert!(!event.is_public);
        }
        other => panic!("T1 expected a private event, got {other:?}"),
    }

    // T2 must see nothing but heartbeats; give the fan-out a moment.
    let quiet = tokio::time::timeout(Duration::from_millis(300), async {
        loop {
            match t2_sub.next().await {
                Some(OutboundEvent::Ping) => continue,
                other => return other,
            }
        }
    })
    .await;
    assert!(quiet.is_err(), "T2 received a cross-tenant event: {quiet:?}");
}

#[tokio::test]
async fn public_approval_fans_out_to_everyone_and_twice_to_the_owner() {
    let (state, _store) = test_state().await;

    let mut t1_sub = state.notifier.subscribe(TenantId::new("T1")).await.unwrap();
    let mut t2_sub = state.notifier.subscribe(TenantId::new("T2")).await.unwrap();

    let id = queue_contribution(&state, "T1", "public knowledge for the commons").await;
    state
        .approval
        .approve(
            id,
            ApprovalRequest {
                is_public: true,
                category_override: None,
            },
        )
        .await
        .unwrap();

    // Owner tenant: public event plus the private copy.
    let mut owner_events = Vec::new();
    for _ in 0..2 {
        match next_event(&mut t1_sub).await {
            Some(event) => owner_events.push(event),
            None => break,
        }
    }
    assert!(
        owner_events
            .iter()
            .any(|e| matches!(e, OutboundEvent::Public(p) if p.id == id)),
        "owner missing public event: {owner_events:?}"
    );
    assert!(
        owner_events
            .iter()
            .any(|e| matches!(e, OutboundEvent::Private(p) if p.id == id)),
        "owner missing private event: {owner_events:?}"
    );

    // Other tenant: public only.
    match next_event(&mut t2_sub).await {
        Some(OutboundEvent::Public(event)) => assert_eq!(event.id, id),
        other => panic!("T2 expected the public event, got {other:?}"),
    }
}

#[tokio::test]
async fn heartbeats_arrive_within_the_contract_window() {
    let (state, _store) = test_state_with(
        ServerSettings::default(),
        NotifierConfig {
            buffer: 16,
            heartbeat: Duration::from_millis(50),
        },
    )
    .await;

    let mut sub = state.notifier.subscribe(TenantId::new("T1")).await.unwrap();
    let ping = tokio::time::timeout(Duration::from_secs(2), sub.next())
        .await
        .expect("heartbeat within window")
        .expect("stream open");
    assert_eq!(ping, OutboundEvent::Ping);
}

#[tokio::test]
async fn rejection_emits_no_event() {
    let (state, _store) = test_state().await;

    let mut sub = state.notifier.subscribe(TenantId::new("T1")).await.unwrap();
    let id = queue_contribution(&state, "T1", "soon to be rejected").await;
    state.approval.reject(id).await.unwrap();

    let quiet = tokio::time::timeout(Duration::from_millis(300), async {
        loop {
            match sub.next().await {
                Some(OutboundEvent::Ping) => continue,
                other => return other,
            }
        }
    })
    .await;
    assert!(quiet.is_err(), "rejection must not emit: {quiet:?}");
}
