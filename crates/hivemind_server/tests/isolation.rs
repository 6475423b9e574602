//! Tenant isolation, soft-delete shadowing, and listing.

mod common;

use serde_json::json;

use common::{principal, test_state};
use hivemind_server::services::{ApprovalRequest, SearchRequest};
use hivemind_types::{CoreError, SnippetId};

async fn approved_snippet(
    state: &hivemind_server::AppState,
    tenant: &str,
    agent: &str,
    content: &str,
    public: bool,
) -> SnippetId {
    let result = state
        .registry
        .call_tool(
            "add_knowledge",
            &principal(tenant, agent),
            json!({ "content": content, "category": "bug_fix", "confidence": 0.9 }),
            state,
        )
        .await
        .unwrap();
    let id = SnippetId::parse(result["contribution_id"].as_str().unwrap()).unwrap();
    state
        .approval
        .approve(
            id,
            ApprovalRequest {
                is_public: public,
                category_override: None,
            },
        )
        .await
        .unwrap();
    id
}

fn search_request(query: &str) -> SearchRequest {
    SearchRequest {
        query: query.into(),
        limit: Some(10),
        category: None,
        cursor: None,
    }
}

#[tokio::test]
async fn private_snippets_are_invisible_across_tenants() {
    let (state, _store) = test_state().await;

    let id = approved_snippet(
        &state,
        "T1",
        "a1",
        "The fix for Redis pipeline timeouts in staging is to set PINGINTERVAL=5.",
        false,
    )
    .await;

    let other_tenant = state
        .retrieval
        .search(&principal("T2", "a1"), search_request("redis timeout"))
        .await
        .unwrap();
    assert!(
        other_tenant.results.iter().all(|r| r.id != id),
        "private snippet leaked across tenants"
    );
    assert_eq!(other_tenant.total_found, 0);

    // Fetch by id is not-found, never forbidden.
    let err = state
        .retrieval
        .fetch(&principal("T2", "a1"), id)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::NotFound));
}

#[tokio::test]
async fn public_snippets_cross_tenants_with_attribution() {
    let (state, _store) = test_state().await;

    let id = approved_snippet(
        &state,
        "T1",
        "a1",
        "Set connection pool max to twice the worker count for the queue service",
        true,
    )
    .await;

    let response = state
        .retrieval
        .search(&principal("T2", "a1"), search_request("connection pool worker count"))
        .await
        .unwrap();
    assert_eq!(response.results[0].id, id);
    assert_eq!(
        response.results[0].contributor_tenant_id,
        principal("T1", "a1").tenant_id
    );
}

#[tokio::test]
async fn soft_delete_shadows_everywhere_but_keeps_the_row() {
    let (state, store) = test_state().await;

    let id = approved_snippet(
        &state,
        "T1",
        "a1",
        "Bump the fsync interval to smooth out write latency spikes",
        false,
    )
    .await;

    let result = state
        .registry
        .call_tool(
            "delete_knowledge",
            &principal("T1", "a1"),
            json!({ "id": id.to_string() }),
            &state,
        )
        .await
        .unwrap();
    assert_eq!(result["deleted"], true);

    // Gone from search and fetch for the owner too.
    let response = state
        .retrieval
        .search(&principal("T1", "a1"), search_request("fsync write latency"))
        .await
        .unwrap();
    assert!(response.results.iter().all(|r| r.id != id));

    let err = state
        .retrieval
        .fetch(&principal("T1", "a1"), id)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::NotFound));

    // But the row exists, stamped.
    let raw = store.raw_approved(id).expect("row must survive soft delete");
    assert!(raw.deleted_at.is_some());

    // Deleting again: not-found.
    let err = state
        .registry
        .call_tool(
            "delete_knowledge",
            &principal("T1", "a1"),
            json!({ "id": id.to_string() }),
            &state,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::NotFound));
}

#[tokio::test]
async fn cross_tenant_and_cross_agent_delete_is_not_found() {
    let (state, _store) = test_state().await;

    let id = approved_snippet(&state, "T1", "a1", "Owned by a1 in tenant one", false).await;

    // Different tenant.
    let err = state
        .registry
        .call_tool(
            "delete_knowledge",
            &principal("T3", "a3"),
            json!({ "id": id.to_string() }),
            &state,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::NotFound));

    // Same tenant, different agent: agent ownership applies.
    let err = state
        .registry
        .call_tool(
            "delete_knowledge",
            &principal("T1", "a2"),
            json!({ "id": id.to_string() }),
            &state,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::NotFound));
}

#[tokio::test]
async fn empty_search_yields_empty_page_without_cursor() {
    let (state, _store) = test_state().await;

    let response = state
        .retrieval
        .search(&principal("T1", "a1"), search_request("anything at all"))
        .await
        .unwrap();
    assert!(response.results.is_empty());
    assert_eq!(response.total_found, 0);
    assert!(response.next_cursor.is_none());
}

#[tokio::test]
async fn list_knowledge_merges_pending_and_approved_for_one_agent() {
    let (state, _store) = test_state().await;

    // One approved, one still pending, and one from another agent.
    let approved = approved_snippet(&state, "T1", "a1", "approved knowledge entry", false).await;

    let pending_result = state
        .registry
        .call_tool(
            "add_knowledge",
            &principal("T1", "a1"),
            json!({ "content": "still waiting for review", "category": "other", "confidence": 0.4 }),
            &state,
        )
        .await
        .unwrap();
    let pending =
        SnippetId::parse(pending_result["contribution_id"].as_str().unwrap()).unwrap();

    approved_snippet(&state, "T1", "a2", "someone else's knowledge", false).await;

    let listing = state
        .registry
        .call_tool("list_knowledge", &principal("T1", "a1"), json!({}), &state)
        .await
        .unwrap();

    let items = listing["items"].as_array().unwrap();
    assert_eq!(items.len(), 2, "only the caller's items: {items:?}");

    let ids: Vec<&str> = items.iter().map(|i| i["id"].as_str().unwrap()).collect();
    assert!(ids.contains(&approved.to_string().as_str()));
    assert!(ids.contains(&pending.to_string().as_str()));

    for item in items {
        match item["status"].as_str().unwrap() {
            "pending" => assert!(item.get("submitted_at").is_some()),
            "approved" => assert!(item.get("approved_at").is_some()),
            other => panic!("unexpected status {other}"),
        }
    }
}

#[tokio::test]
async fn list_knowledge_paginates_with_cursor() {
    let (state, _store) = test_state().await;

    for i in 0..5 {
        state
            .registry
            .call_tool(
                "add_knowledge",
                &principal("T1", "a1"),
                json!({ "content": format!("note number {i}"), "category": "other", "confidence": 0.5 }),
                &state,
            )
            .await
            .unwrap();
    }

    let first = state
        .registry
        .call_tool(
            "list_knowledge",
            &principal("T1", "a1"),
            json!({ "limit": 2 }),
            &state,
        )
        .await
        .unwrap();
    assert_eq!(first["items"].as_array().unwrap().len(), 2);
    let cursor = first["next_cursor"].as_str().expect("cursor on full page");

    let second = state
        .registry
        .call_tool(
            "list_knowledge",
            &principal("T1", "a1"),
            json!({ "limit": 2, "cursor": cursor }),
            &state,
        )
        .await
        .unwrap();
    let first_ids: Vec<&str> = first["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["id"].as_str().unwrap())
        .collect();
    for item in second["items"].as_array().unwrap() {
        assert!(!first_ids.contains(&item["id"].as_str().unwrap()));
    }
}

#[tokio::test]
async fn fetch_bumps_retrieval_counter() {
    let (state, store) = test_state().await;

    let id = approved_snippet(&state, "T1", "a1", "counted knowledge entry", false).await;
    state.retrieval.fetch(&principal("T1", "a2"), id).await.unwrap();
    state.retrieval.fetch(&principal("T1", "a2"), id).await.unwrap();

    assert_eq!(store.raw_approved(id).unwrap().retrieval_count, 2);
}

#[tokio::test]
async fn stats_aggregate_per_tenant() {
    let (state, _store) = test_state().await;

    approved_snippet(&state, "T1", "a1", "first entry of knowledge", false).await;
    approved_snippet(&state, "T1", "a1", "second entry of knowledge", true).await;
    approved_snippet(&state, "T2", "a1", "other tenant entry", false).await;
    state
        .registry
        .call_tool(
            "add_knowledge",
            &principal("T1", "a2"),
            json!({ "content": "pending entry", "category": "other", "confidence": 0.5 }),
            &state,
        )
        .await
        .unwrap();

    let stats = state
        .reviewer
        .stats(&principal("T1", "a1").tenant_id)
        .await
        .unwrap();
    assert_eq!(stats.pending, 1);
    assert_eq!(stats.approved, 2);
    assert_eq!(stats.public, 1);
    assert_eq!(stats.by_agent.len(), 1);
    assert_eq!(stats.by_agent[0].approved, 2);
}
