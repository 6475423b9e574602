//! In-memory `KnowledgeStore`.
//!
//! Honours the production contract the server tests care about: tenant
//! isolation, soft-delete shadowing, hash-scoped uniqueness, disjoint
//! quarantine claims, and commit-time approval events. State lives under
//! one synchronous mutex; no lock is ever held across an await.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{broadcast, mpsc};

use hivemind_db::{
    AgentContribution, ApprovalStream, ApproveDecision, DbError, KnowledgeListing, KnowledgeStore,
    ListingStatus, ReviewBatch, Result, SimilarityQuery, TenantStats,
};
use hivemind_embed::cosine_distance;
use hivemind_types::{
    AgentId, ApprovalEvent, ApprovedSnippet, DeploymentIdentity, PendingContribution, SnippetId,
    TenantId,
};

#[derive(Default)]
struct State {
    pending: Vec<PendingContribution>,
    approved: Vec<ApprovedSnippet>,
    claimed: HashSet<SnippetId>,
    identity: Option<DeploymentIdentity>,
}

impl State {
    fn duplicate_exists(&self, tenant: &TenantId, hash: &str, is_public: bool) -> bool {
        self.approved.iter().any(|s| {
            if is_public {
                s.is_public && s.content_hash == hash
            } else {
                !s.is_public && s.tenant_id == *tenant && s.content_hash == hash
            }
        })
    }

    fn promote(
        &mut self,
        id: SnippetId,
        embedding: Vec<f32>,
        decision: &ApproveDecision,
    ) -> Result<(ApprovedSnippet, ApprovalEvent)> {
        let idx = self
            .pending
            .iter()
            .position(|p| p.id == id)
            .ok_or(DbError::Gone)?;
        let pending = &self.pending[idx];

        if self.duplicate_exists(&pending.tenant_id, &pending.content_hash, decision.is_public) {
            return Err(DbError::Duplicate);
        }

        let pending = self.pending.remove(idx);
        let category = decision.category_override.unwrap_or(pending.category);
        let snippet = ApprovedSnippet {
            id: pending.id,
            tenant_id: pending.tenant_id.clone(),
            agent_id: pending.agent_id.clone(),
            run_id: pending.run_id.clone(),
            content: pending.content.clone(),
            category,
            original_category: decision
                .category_override
                .filter(|c| *c != pending.category)
                .map(|_| pending.category),
            confidence: pending.confidence,
            framework: pending.framework.clone(),
            language: pending.language.clone(),
            tags: pending.tags.clone(),
            content_hash: pending.content_hash.clone(),
            is_public: decision.is_public,
            embedding,
            approved_at: Utc::now(),
            deleted_at: None,
            retrieval_count: 0,
            helpful_count: 0,
            not_helpful_count: 0,
        };
        let event = ApprovalEvent::for_snippet(&snippet);
        self.approved.push(snippet.clone());
        Ok((snippet, event))
    }
}

#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<Mutex<State>>,
    events: broadcast::Sender<ApprovalEvent>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            inner: Arc::new(Mutex::new(State::default())),
            events,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.inner.lock().expect("memory store poisoned")
    }

    /// Raw view of an approved row regardless of visibility, for
    /// asserting soft-delete shadowing in tests.
    pub fn raw_approved(&self, id: SnippetId) -> Option<ApprovedSnippet> {
        self.lock().approved.iter().find(|s| s.id == id).cloned()
    }

    /// Synchronous pending lookup for test assertions.
    pub fn pending_by_id_sync(&self, id: SnippetId) -> Option<PendingContribution> {
        self.lock().pending.iter().find(|p| p.id == id).cloned()
    }

    pub fn pending_count(&self) -> usize {
        self.lock().pending.len()
    }
}

enum StagedDecision {
    Approve(ApprovedSnippet, ApprovalEvent),
    Reject(SnippetId),
    Flag(SnippetId),
}

struct MemReviewBatch {
    store: MemoryStore,
    rows: Vec<PendingContribution>,
    undecided: HashSet<SnippetId>,
    staged: Vec<StagedDecision>,
    committed: bool,
}

impl MemReviewBatch {
    fn take(&mut self, id: SnippetId) -> Result<()> {
        if !self.undecided.remove(&id) {
            return Err(DbError::Gone);
        }
        Ok(())
    }

    fn release_claims(&self) {
        let mut state = self.store.lock();
        for row in &self.rows {
            state.claimed.remove(&row.id);
        }
    }
}

#[async_trait]
impl ReviewBatch for MemReviewBatch {
    fn rows(&self) -> &[PendingContribution] {
        &self.rows
    }

    async fn approve(
        &mut self,
        id: SnippetId,
        embedding: Vec<f32>,
        decision: ApproveDecision,
    ) -> Result<ApprovalEvent> {
        self.take(id)?;
        let row = self
            .rows
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or(DbError::Gone)?;

        // Decision-time duplicate check, the savepoint analogue: a
        // collision fails this decision and keeps the claim usable.
        {
            let state = self.store.lock();
            let staged_hit = self.staged.iter().any(|d| match d {
                StagedDecision::Approve(s, _) => {
                    s.content_hash == row.content_hash
                        && if decision.is_public {
                            s.is_public
                        } else {
                            !s.is_public && s.tenant_id == row.tenant_id
                        }
                }
                _ => false,
            });
            if staged_hit
                || state.duplicate_exists(&row.tenant_id, &row.content_hash, decision.is_public)
            {
                self.undecided.insert(id);
                return Err(DbError::Duplicate);
            }
        }

        let category = decision.category_override.unwrap_or(row.category);
        let snippet = ApprovedSnippet {
            id: row.id,
            tenant_id: row.tenant_id.clone(),
            agent_id: row.agent_id.clone(),
            run_id: row.run_id.clone(),
            content: row.content.clone(),
            category,
            original_category: decision
                .category_override
                .filter(|c| *c != row.category)
                .map(|_| row.category),
            confidence: row.confidence,
            framework: row.framework.clone(),
            language: row.language.clone(),
            tags: row.tags.clone(),
            content_hash: row.content_hash.clone(),
            is_public: decision.is_public,
            embedding,
            approved_at: Utc::now(),
            deleted_at: None,
            retrieval_count: 0,
            helpful_count: 0,
            not_helpful_count: 0,
        };
        let event = ApprovalEvent::for_snippet(&snippet);
        self.staged
            .push(StagedDecision::Approve(snippet, event.clone()));
        Ok(event)
    }

    async fn reject(&mut self, id: SnippetId) -> Result<()> {
        self.take(id)?;
        self.staged.push(StagedDecision::Reject(id));
        Ok(())
    }

    async fn flag_sensitive(&mut self, id: SnippetId) -> Result<()> {
        self.take(id)?;
        self.staged.push(StagedDecision::Flag(id));
        Ok(())
    }

    async fn commit(mut self: Box<Self>) -> Result<()> {
        let events: Vec<ApprovalEvent> = {
            let mut state = self.store.lock();
            let mut events = Vec::new();
            for decision in self.staged.drain(..) {
                match decision {
                    StagedDecision::Approve(snippet, event) => {
                        state.pending.retain(|p| p.id != snippet.id);
                        state.approved.push(snippet);
                        events.push(event);
                    }
                    StagedDecision::Reject(id) => {
                        state.pending.retain(|p| p.id != id);
                    }
                    StagedDecision::Flag(id) => {
                        if let Some(p) = state.pending.iter_mut().find(|p| p.id == id) {
                            p.sensitive_flag = true;
                        }
                    }
                }
            }
            for row in &self.rows {
                state.claimed.remove(&row.id);
            }
            events
        };
        self.committed = true;
        for event in events {
            let _ = self.store.events.send(event);
        }
        Ok(())
    }
}

impl Drop for MemReviewBatch {
    fn drop(&mut self) {
        if !self.committed {
            // Uncommitted claim: everything staged evaporates and the
            // rows return to the queue, like a rolled-back transaction.
            self.release_claims();
        }
    }
}

#[async_trait]
impl KnowledgeStore for MemoryStore {
    async fn insert_pending(&self, row: &PendingContribution) -> Result<()> {
        self.lock().pending.push(row.clone());
        Ok(())
    }

    async fn pending_by_id(&self, id: SnippetId) -> Result<Option<PendingContribution>> {
        Ok(self.lock().pending.iter().find(|p| p.id == id).cloned())
    }

    async fn claim_pending(&self, tenant: &TenantId, limit: u32) -> Result<Box<dyn ReviewBatch>> {
        let rows: Vec<PendingContribution> = {
            let mut state = self.lock();
            let mut eligible: Vec<PendingContribution> = state
                .pending
                .iter()
                .filter(|p| p.tenant_id == *tenant && !state.claimed.contains(&p.id))
                .cloned()
                .collect();
            eligible.sort_by(|a, b| {
                a.submitted_at
                    .cmp(&b.submitted_at)
                    .then(a.id.0.cmp(&b.id.0))
            });
            eligible.truncate(limit as usize);
            for row in &eligible {
                state.claimed.insert(row.id);
            }
            eligible
        };

        let undecided = rows.iter().map(|r| r.id).collect();
        Ok(Box::new(MemReviewBatch {
            store: self.clone(),
            rows,
            undecided,
            staged: Vec::new(),
            committed: false,
        }))
    }

    async fn approve_pending(
        &self,
        id: SnippetId,
        embedding: Vec<f32>,
        decision: ApproveDecision,
    ) -> Result<ApprovalEvent> {
        let event = {
            let mut state = self.lock();
            if state.claimed.contains(&id) {
                return Err(DbError::Gone);
            }
            let (_, event) = state.promote(id, embedding, &decision)?;
            event
        };
        let _ = self.events.send(event.clone());
        Ok(event)
    }

    async fn reject_pending(&self, id: SnippetId) -> Result<()> {
        let mut state = self.lock();
        if state.claimed.contains(&id) {
            return Err(DbError::Gone);
        }
        let before = state.pending.len();
        state.pending.retain(|p| p.id != id);
        if state.pending.len() == before {
            return Err(DbError::Gone);
        }
        Ok(())
    }

    async fn flag_sensitive(&self, id: SnippetId) -> Result<()> {
        let mut state = self.lock();
        match state.pending.iter_mut().find(|p| p.id == id) {
            Some(p) => {
                p.sensitive_flag = true;
                Ok(())
            }
            None => Err(DbError::Gone),
        }
    }

    async fn nearest_approved(
        &self,
        query: &SimilarityQuery,
    ) -> Result<Vec<(ApprovedSnippet, f64)>> {
        let state = self.lock();
        let mut hits: Vec<(ApprovedSnippet, f64)> = state
            .approved
            .iter()
            .filter(|s| s.deleted_at.is_none())
            .filter(|s| s.tenant_id == query.tenant_id || s.is_public)
            .filter(|s| query.category.map(|c| s.category == c).unwrap_or(true))
            .filter(|s| !query.exclude_ids.contains(&s.id))
            .map(|s| {
                let d = cosine_distance(&query.vector, &s.embedding);
                (s.clone(), d)
            })
            .filter(|(_, d)| query.distance_ceiling.map(|c| *d <= c).unwrap_or(true))
            .collect();
        hits.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        Ok(hits
            .into_iter()
            .skip(query.offset as usize)
            .take(query.limit as usize)
            .collect())
    }

    async fn fetch_approved(
        &self,
        id: SnippetId,
        tenant: &TenantId,
    ) -> Result<Option<ApprovedSnippet>> {
        Ok(self
            .lock()
            .approved
            .iter()
            .find(|s| {
                s.id == id
                    && s.deleted_at.is_none()
                    && (s.tenant_id == *tenant || s.is_public)
            })
            .cloned())
    }

    async fn bump_retrieval(&self, id: SnippetId) -> Result<()> {
        if let Some(s) = self.lock().approved.iter_mut().find(|s| s.id == id) {
            s.retrieval_count += 1;
        }
        Ok(())
    }

    async fn mark_deleted(
        &self,
        id: SnippetId,
        tenant: &TenantId,
        agent: &AgentId,
    ) -> Result<bool> {
        let mut state = self.lock();
        match state.approved.iter_mut().find(|s| {
            s.id == id && s.tenant_id == *tenant && s.agent_id == *agent && s.deleted_at.is_none()
        }) {
            Some(s) => {
                s.deleted_at = Some(Utc::now());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_by_agent(
        &self,
        tenant: &TenantId,
        agent: &AgentId,
        offset: u64,
        limit: u32,
    ) -> Result<Vec<KnowledgeListing>> {
        let state = self.lock();
        let mut items: Vec<KnowledgeListing> = state
            .pending
            .iter()
            .filter(|p| p.tenant_id == *tenant && p.agent_id == *agent)
            .map(|p| KnowledgeListing {
                id: p.id,
                status: ListingStatus::Pending,
                category: p.category,
                title: p.title(),
                timestamp: p.submitted_at,
            })
            .chain(
                state
                    .approved
                    .iter()
                    .filter(|s| {
                        s.tenant_id == *tenant && s.agent_id == *agent && s.deleted_at.is_none()
                    })
                    .map(|s| KnowledgeListing {
                        id: s.id,
                        status: ListingStatus::Approved,
                        category: s.category,
                        title: s.title(),
                        timestamp: s.approved_at,
                    }),
            )
            .collect();
        items.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.0.cmp(&a.id.0)));
        Ok(items
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn tenant_stats(&self, tenant: &TenantId) -> Result<TenantStats> {
        let state = self.lock();
        let live = || {
            state
                .approved
                .iter()
                .filter(move |s| s.tenant_id == *tenant)
        };
        let mut by_agent: Vec<AgentContribution> = Vec::new();
        for s in live().filter(|s| s.deleted_at.is_none()) {
            match by_agent.iter_mut().find(|a| a.agent_id == s.agent_id) {
                Some(a) => a.approved += 1,
                None => by_agent.push(AgentContribution {
                    agent_id: s.agent_id.clone(),
                    approved: 1,
                }),
            }
        }
        by_agent.sort_by(|a, b| b.approved.cmp(&a.approved).then(a.agent_id.0.cmp(&b.agent_id.0)));
        Ok(TenantStats {
            pending: state
                .pending
                .iter()
                .filter(|p| p.tenant_id == *tenant)
                .count() as i64,
            approved: live().filter(|s| s.deleted_at.is_none()).count() as i64,
            public: live()
                .filter(|s| s.is_public && s.deleted_at.is_none())
                .count() as i64,
            total_retrievals: live().map(|s| s.retrieval_count).sum(),
            helpful: live().map(|s| s.helpful_count).sum(),
            not_helpful: live().map(|s| s.not_helpful_count).sum(),
            by_agent,
        })
    }

    async fn subscribe_approvals(&self) -> Result<ApprovalStream> {
        let mut source = self.events.subscribe();
        let (tx, rx) = mpsc::channel(256);
        tokio::spawn(async move {
            loop {
                match source.recv().await {
                    Ok(event) => {
                        if tx.send(event).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
        Ok(ApprovalStream::new(rx))
    }

    async fn load_identity(&self) -> Result<Option<DeploymentIdentity>> {
        Ok(self.lock().identity.clone())
    }

    async fn pin_identity(&self, identity: &DeploymentIdentity) -> Result<()> {
        let mut state = self.lock();
        if state.identity.is_none() {
            state.identity = Some(identity.clone());
        }
        Ok(())
    }
}
