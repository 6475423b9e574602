//! The store contract.
//!
//! `KnowledgeStore` is the only shared mutable authority in the system;
//! every cross-component interaction goes through it or through the
//! approval channel it backs. The production implementation is
//! [`crate::PgStore`]; the test suites run against an in-memory
//! implementation honouring the same contract.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use hivemind_types::{
    AgentId, ApprovalEvent, ApprovedSnippet, Category, DeploymentIdentity, PendingContribution,
    SnippetId, TenantId,
};

use crate::error::Result;

/// Reviewer decision accompanying an approval.
#[derive(Debug, Clone, Default)]
pub struct ApproveDecision {
    pub is_public: bool,
    /// Replaces the agent-suggested category; the original is retained
    /// in the promoted row for audit.
    pub category_override: Option<Category>,
}

/// One entry of the agent-facing `list_knowledge` view: pending and
/// approved rows merged, newest state change first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeListing {
    pub id: SnippetId,
    pub status: ListingStatus,
    pub category: Category,
    pub title: String,
    /// `submitted_at` for pending rows, `approved_at` for approved ones.
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingStatus {
    Pending,
    Approved,
}

/// Aggregate counters for the reviewer `stats` surface.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TenantStats {
    pub pending: i64,
    pub approved: i64,
    pub public: i64,
    pub total_retrievals: i64,
    pub helpful: i64,
    pub not_helpful: i64,
    pub by_agent: Vec<AgentContribution>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AgentContribution {
    pub agent_id: AgentId,
    pub approved: i64,
}

/// Parameters of a similarity lookup. The visible set is always
/// `tenant_id = caller ∨ is_public`, never wider, and soft-deleted rows
/// are filtered out.
#[derive(Debug, Clone)]
pub struct SimilarityQuery {
    pub vector: Vec<f32>,
    pub tenant_id: TenantId,
    pub limit: u32,
    pub offset: u64,
    pub exclude_ids: Vec<SnippetId>,
    /// Cap results at this cosine distance when present.
    pub distance_ceiling: Option<f64>,
    /// Equality filter on category when present.
    pub category: Option<Category>,
}

impl SimilarityQuery {
    pub fn new(vector: Vec<f32>, tenant_id: TenantId, limit: u32) -> Self {
        Self {
            vector,
            tenant_id,
            limit,
            offset: 0,
            exclude_ids: Vec::new(),
            distance_ceiling: None,
            category: None,
        }
    }
}

/// Live feed of committed approvals. Lazy, infinite, non-restartable:
/// read until the subscriber goes away. Events before the subscription
/// are never replayed; the durable rows are the source of truth.
pub struct ApprovalStream {
    rx: mpsc::Receiver<ApprovalEvent>,
}

impl ApprovalStream {
    pub fn new(rx: mpsc::Receiver<ApprovalEvent>) -> Self {
        Self { rx }
    }

    /// Next committed approval, or `None` once the feed is closed.
    pub async fn next(&mut self) -> Option<ApprovalEvent> {
        self.rx.recv().await
    }
}

/// A claimed slice of the quarantine queue.
///
/// The rows are invisible to every other reviewer session for as long as
/// this value lives. Decisions execute inside the claim; `commit`
/// publishes them, and dropping the batch without committing returns all
/// undecided rows to the queue (crash-safety comes for free: the claim
/// dies with the session's transaction).
#[async_trait]
pub trait ReviewBatch: Send {
    fn rows(&self) -> &[PendingContribution];

    /// Promote one claimed row. A duplicate content hash fails only this
    /// decision; the claim and any other staged decisions survive.
    async fn approve(
        &mut self,
        id: SnippetId,
        embedding: Vec<f32>,
        decision: ApproveDecision,
    ) -> Result<ApprovalEvent>;

    /// Discard one claimed row. Not a soft delete: rejection destroys.
    async fn reject(&mut self, id: SnippetId) -> Result<()>;

    /// Raise the sensitive flag; the row stays in quarantine.
    async fn flag_sensitive(&mut self, id: SnippetId) -> Result<()>;

    async fn commit(self: Box<Self>) -> Result<()>;
}

#[async_trait]
pub trait KnowledgeStore: Send + Sync {
    // ------------------------------------------------------------------
    // Quarantine
    // ------------------------------------------------------------------

    async fn insert_pending(&self, row: &PendingContribution) -> Result<()>;

    /// Load one pending row without claiming it (pre-screen path).
    async fn pending_by_id(&self, id: SnippetId) -> Result<Option<PendingContribution>>;

    /// Claim the next `limit` unclaimed pending rows for this tenant,
    /// FIFO by submission time. Concurrent claims receive disjoint rows.
    async fn claim_pending(&self, tenant: &TenantId, limit: u32) -> Result<Box<dyn ReviewBatch>>;

    /// Standalone approval of a single pending row (reviewer-by-id
    /// path): locks the row, promotes it, deletes it from quarantine and
    /// publishes the approval, atomically. Absent row → `Gone`;
    /// hash collision → `Duplicate` with the pending row preserved.
    async fn approve_pending(
        &self,
        id: SnippetId,
        embedding: Vec<f32>,
        decision: ApproveDecision,
    ) -> Result<ApprovalEvent>;

    async fn reject_pending(&self, id: SnippetId) -> Result<()>;

    async fn flag_sensitive(&self, id: SnippetId) -> Result<()>;

    // ------------------------------------------------------------------
    // Commons
    // ------------------------------------------------------------------

    /// Tenant-scoped similarity search, cosine distance ascending.
    async fn nearest_approved(
        &self,
        query: &SimilarityQuery,
    ) -> Result<Vec<(ApprovedSnippet, f64)>>;

    /// `None` covers both not-exists and not-visible; callers cannot
    /// distinguish them, by design.
    async fn fetch_approved(
        &self,
        id: SnippetId,
        tenant: &TenantId,
    ) -> Result<Option<ApprovedSnippet>>;

    /// Retrieval-signal bump on full-content reads.
    async fn bump_retrieval(&self, id: SnippetId) -> Result<()>;

    /// Ownership-checked soft delete. `false` means not-owned or
    /// not-found, without distinguishing.
    async fn mark_deleted(&self, id: SnippetId, tenant: &TenantId, agent: &AgentId)
        -> Result<bool>;

    /// Pending and approved rows of one agent, merged, newest first.
    async fn list_by_agent(
        &self,
        tenant: &TenantId,
        agent: &AgentId,
        offset: u64,
        limit: u32,
    ) -> Result<Vec<KnowledgeListing>>;

    async fn tenant_stats(&self, tenant: &TenantId) -> Result<TenantStats>;

    // ------------------------------------------------------------------
    // Approval feed & identity
    // ------------------------------------------------------------------

    /// Subscribe to committed approvals. Implementations use a dedicated
    /// connection, never the transactional pool.
    async fn subscribe_approvals(&self) -> Result<ApprovalStream>;

    async fn load_identity(&self) -> Result<Option<DeploymentIdentity>>;

    /// Write the deployment identity. Only called when absent; races are
    /// resolved by first-writer-wins and re-verification.
    async fn pin_identity(&self, identity: &DeploymentIdentity) -> Result<()>;
}
