//! Reviewer-facing operations: claim batches and tenant stats.

use std::sync::Arc;

use hivemind_db::{KnowledgeStore, ReviewBatch, TenantStats};
use hivemind_types::{CoreError, TenantId};

use crate::services::map_db_error;

#[derive(Clone)]
pub struct ReviewerService {
    store: Arc<dyn KnowledgeStore>,
}

impl ReviewerService {
    pub fn new(store: Arc<dyn KnowledgeStore>) -> Self {
        Self { store }
    }

    /// Claim the next batch of pending contributions for this tenant.
    /// Rows stay invisible to other reviewer sessions until the batch is
    /// committed or dropped.
    pub async fn fetch_next_pending(
        &self,
        tenant: &TenantId,
        batch_size: u32,
    ) -> Result<Box<dyn ReviewBatch>, CoreError> {
        self.store
            .claim_pending(tenant, batch_size)
            .await
            .map_err(map_db_error)
    }

    /// Aggregate counters for the tenant dashboard.
    pub async fn stats(&self, tenant: &TenantId) -> Result<TenantStats, CoreError> {
        self.store.tenant_stats(tenant).await.map_err(map_db_error)
    }
}
