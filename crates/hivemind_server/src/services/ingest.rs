//! Contribution ingest: validate, sanitise, gate, hash, quarantine.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::info;

use hivemind_db::KnowledgeStore;
use hivemind_sanitize::Sanitizer;
use hivemind_types::{
    content_hash, Category, CoreError, NewContribution, PendingContribution, SnippetId,
};

use crate::auth::Principal;
use crate::services::map_db_error;

const MAX_TAGS: usize = 16;
const MAX_TAG_LEN: usize = 64;
const MAX_LABEL_LEN: usize = 64;

#[derive(Debug, Clone, Serialize)]
pub struct IngestReceipt {
    pub contribution_id: SnippetId,
    pub status: &'static str,
    pub category: Category,
}

#[derive(Clone)]
pub struct IngestService {
    store: Arc<dyn KnowledgeStore>,
    sanitizer: Arc<Sanitizer>,
    max_content_len: usize,
}

impl IngestService {
    pub fn new(
        store: Arc<dyn KnowledgeStore>,
        sanitizer: Arc<Sanitizer>,
        max_content_len: usize,
    ) -> Self {
        Self {
            store,
            sanitizer,
            max_content_len,
        }
    }

    /// Validate and quarantine one contribution. Fully concurrent; no
    /// deduplication here: duplicates surface at approval through hash
    /// uniqueness.
    pub async fn submit(
        &self,
        principal: &Principal,
        input: NewContribution,
    ) -> Result<IngestReceipt, CoreError> {
        self.validate(&input)?;

        let sanitized = self.sanitizer.sanitize(&input.content);
        if sanitized.exceeds_reject_ratio() {
            return Err(CoreError::RedactionRejected {
                ratio: sanitized.ratio,
            });
        }

        let row = PendingContribution {
            id: SnippetId::generate(),
            tenant_id: principal.tenant_id.clone(),
            agent_id: principal.agent_id.clone(),
            run_id: input.run_id,
            content_hash: content_hash(&sanitized.text),
            content: sanitized.text,
            category: input.category,
            confidence: input.confidence,
            framework: input.framework,
            language: input.language,
            tags: input.tags,
            sensitive_flag: false,
            submitted_at: Utc::now(),
        };

        self.store
            .insert_pending(&row)
            .await
            .map_err(map_db_error)?;

        info!(
            id = %row.id,
            tenant = %row.tenant_id,
            category = %row.category,
            ratio = sanitized.ratio,
            "contribution queued"
        );

        Ok(IngestReceipt {
            contribution_id: row.id,
            status: "queued",
            category: row.category,
        })
    }

    fn validate(&self, input: &NewContribution) -> Result<(), CoreError> {
        if input.content.is_empty() {
            return Err(CoreError::invalid_input("content must not be empty"));
        }
        if input.content.len() > self.max_content_len {
            return Err(CoreError::invalid_input(format!(
                "content exceeds {} bytes",
                self.max_content_len
            )));
        }
        if !(0.0..=1.0).contains(&input.confidence) {
            return Err(CoreError::invalid_input(
                "confidence must be between 0 and 1",
            ));
        }
        if input.tags.len() > MAX_TAGS {
            return Err(CoreError::invalid_input(format!(
                "at most {MAX_TAGS} tags allowed"
            )));
        }
        if input.tags.iter().any(|t| t.is_empty() || t.len() > MAX_TAG_LEN) {
            return Err(CoreError::invalid_input(format!(
                "tags must be 1..={MAX_TAG_LEN} bytes"
            )));
        }
        for label in [&input.framework, &input.language].into_iter().flatten() {
            if label.len() > MAX_LABEL_LEN {
                return Err(CoreError::invalid_input(format!(
                    "framework/language must be at most {MAX_LABEL_LEN} bytes"
                )));
            }
        }
        Ok(())
    }
}
