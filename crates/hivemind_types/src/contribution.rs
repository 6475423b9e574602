//! Pending contributions, approved snippets, and the approval event.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::category::Category;
use crate::hash::title_of;
use crate::ids::{AgentId, RunId, SnippetId, TenantId};

/// Validated agent input, before sanitisation. Carries no identity: the
/// tenant and agent come from the verified credential.
#[derive(Debug, Clone)]
pub struct NewContribution {
    pub content: String,
    pub category: Category,
    pub confidence: f64,
    pub framework: Option<String>,
    pub language: Option<String>,
    pub tags: Vec<String>,
    pub run_id: Option<RunId>,
}

/// A quarantined, already-sanitised submission awaiting review.
///
/// `content` is sanitised text; raw agent input never reaches this type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingContribution {
    pub id: SnippetId,
    pub tenant_id: TenantId,
    pub agent_id: AgentId,
    pub run_id: Option<RunId>,
    pub content: String,
    pub category: Category,
    pub confidence: f64,
    pub framework: Option<String>,
    pub language: Option<String>,
    pub tags: Vec<String>,
    pub content_hash: String,
    pub sensitive_flag: bool,
    pub submitted_at: DateTime<Utc>,
}

impl PendingContribution {
    pub fn title(&self) -> String {
        title_of(&self.content)
    }
}

/// A promoted contribution. Content, hash, embedding, and provenance are
/// frozen at promotion; only `deleted_at` and the counters mutate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovedSnippet {
    pub id: SnippetId,
    pub tenant_id: TenantId,
    pub agent_id: AgentId,
    pub run_id: Option<RunId>,
    pub content: String,
    pub category: Category,
    /// The agent-suggested category when the reviewer overrode it.
    pub original_category: Option<Category>,
    pub confidence: f64,
    pub framework: Option<String>,
    pub language: Option<String>,
    pub tags: Vec<String>,
    pub content_hash: String,
    pub is_public: bool,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub embedding: Vec<f32>,
    pub approved_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub retrieval_count: i64,
    pub helpful_count: i64,
    pub not_helpful_count: i64,
}

impl ApprovedSnippet {
    pub fn title(&self) -> String {
        title_of(&self.content)
    }
}

/// Payload published on the approval channel and fanned out to
/// subscribers. Derived from the approved row; the durable record is the
/// source of truth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalEvent {
    pub id: SnippetId,
    pub tenant_id: TenantId,
    pub category: Category,
    pub is_public: bool,
    pub title: String,
}

impl ApprovalEvent {
    pub fn for_snippet(snippet: &ApprovedSnippet) -> Self {
        Self {
            id: snippet.id,
            tenant_id: snippet.tenant_id.clone(),
            category: snippet.category,
            is_public: snippet.is_public,
            title: snippet.title(),
        }
    }
}

/// Summary tier returned by search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnippetSummary {
    pub id: SnippetId,
    pub title: String,
    pub category: Category,
    pub confidence: f64,
    /// Org attribution: the contributing tenant.
    pub contributor_tenant_id: TenantId,
    /// `1 - cosine_distance`, in [0, 1] for unit vectors.
    pub relevance_score: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snippet(content: &str) -> ApprovedSnippet {
        ApprovedSnippet {
            id: SnippetId::generate(),
            tenant_id: TenantId::new("t1"),
            agent_id: AgentId::new("a1"),
            run_id: None,
            content: content.to_string(),
            category: Category::BugFix,
            original_category: None,
            confidence: 0.9,
            framework: None,
            language: None,
            tags: vec![],
            content_hash: crate::hash::content_hash(content),
            is_public: false,
            embedding: vec![],
            approved_at: Utc::now(),
            deleted_at: None,
            retrieval_count: 0,
            helpful_count: 0,
            not_helpful_count: 0,
        }
    }

    #[test]
    fn approval_event_copies_provenance() {
        let s = snippet("Set PINGINTERVAL=5 for Redis pipeline timeouts.");
        let e = ApprovalEvent::for_snippet(&s);
        assert_eq!(e.id, s.id);
        assert_eq!(e.tenant_id, s.tenant_id);
        assert_eq!(e.title, s.title());
        assert!(!e.is_public);
    }

    #[test]
    fn event_title_is_capped() {
        let s = snippet(&"word ".repeat(100));
        let e = ApprovalEvent::for_snippet(&s);
        assert!(e.title.chars().count() <= crate::hash::TITLE_MAX_CHARS);
    }
}
