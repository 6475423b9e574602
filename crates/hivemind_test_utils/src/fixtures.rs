//! Fixture builders.

use chrono::Utc;

use hivemind_types::{
    content_hash, AgentId, Category, NewContribution, PendingContribution, SnippetId, TenantId,
};

/// A ready-to-ingest contribution with sensible defaults.
pub fn contribution(content: &str) -> NewContribution {
    NewContribution {
        content: content.to_string(),
        category: Category::BugFix,
        confidence: 0.9,
        framework: None,
        language: None,
        tags: Vec::new(),
        run_id: None,
    }
}

/// A pending row as the ingest service would have written it.
pub fn pending_row(tenant: &str, agent: &str, content: &str) -> PendingContribution {
    PendingContribution {
        id: SnippetId::generate(),
        tenant_id: TenantId::new(tenant),
        agent_id: AgentId::new(agent),
        run_id: None,
        content: content.to_string(),
        category: Category::BugFix,
        confidence: 0.9,
        framework: None,
        language: None,
        tags: Vec::new(),
        content_hash: content_hash(content),
        sensitive_flag: false,
        submitted_at: Utc::now(),
    }
}
