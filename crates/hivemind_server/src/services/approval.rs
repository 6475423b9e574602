//! Approval: promote quarantined contributions into the commons.

use std::sync::Arc;

use tracing::info;

use hivemind_db::{ApproveDecision, KnowledgeStore};
use hivemind_embed::Embedder;
use hivemind_types::{ApprovalEvent, Category, CoreError, SnippetId};

use crate::services::{map_db_error, map_embed_error};

/// Reviewer decision for a single pending contribution.
#[derive(Debug, Clone, Default)]
pub struct ApprovalRequest {
    pub is_public: bool,
    pub category_override: Option<Category>,
}

#[derive(Clone)]
pub struct ApprovalService {
    store: Arc<dyn KnowledgeStore>,
    embedder: Arc<dyn Embedder>,
}

impl ApprovalService {
    pub fn new(store: Arc<dyn KnowledgeStore>, embedder: Arc<dyn Embedder>) -> Self {
        Self { store, embedder }
    }

    /// Promote one pending row: embed its content and run the approval
    /// transaction: insert, quarantine delete, and notify, all or nothing.
    ///
    /// A vanished row is *gone*; a content-hash collision is *duplicate*
    /// and leaves the pending row in quarantine for the reviewer.
    pub async fn approve(
        &self,
        id: SnippetId,
        request: ApprovalRequest,
    ) -> Result<ApprovalEvent, CoreError> {
        let pending = self
            .store
            .pending_by_id(id)
            .await
            .map_err(map_db_error)?
            .ok_or(CoreError::Gone)?;

        let embedding = self
            .embedder
            .embed(&pending.content)
            .await
            .map_err(map_embed_error)?;

        let event = self
            .store
            .approve_pending(
                id,
                embedding,
                ApproveDecision {
                    is_public: request.is_public,
                    category_override: request.category_override,
                },
            )
            .await
            .map_err(map_db_error)?;

        info!(
            id = %event.id,
            tenant = %event.tenant_id,
            public = event.is_public,
            "contribution approved"
        );
        Ok(event)
    }

    /// Discard a pending row. No soft delete: rejection destroys.
    pub async fn reject(&self, id: SnippetId) -> Result<(), CoreError> {
        self.store.reject_pending(id).await.map_err(map_db_error)?;
        info!(id = %id, "contribution rejected");
        Ok(())
    }

    /// Raise the sensitive flag; the row stays queued for review.
    pub async fn flag_sensitive(&self, id: SnippetId) -> Result<(), CoreError> {
        self.store.flag_sensitive(id).await.map_err(map_db_error)?;
        info!(id = %id, "contribution flagged sensitive");
        Ok(())
    }
}
