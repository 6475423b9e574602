//! Retrieval: semantic search over the commons and full-content fetch.

use std::sync::Arc;

use serde::Serialize;
use tracing::warn;

use hivemind_db::{KnowledgeStore, SimilarityQuery};
use hivemind_embed::Embedder;
use hivemind_types::{
    decode_cursor, encode_cursor, ApprovedSnippet, Category, CoreError, SnippetId, SnippetSummary,
};

use crate::auth::Principal;
use crate::services::{map_db_error, map_embed_error};

#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub query: String,
    pub limit: Option<u32>,
    pub category: Option<Category>,
    pub cursor: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    pub results: Vec<SnippetSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
    pub total_found: usize,
}

#[derive(Clone)]
pub struct RetrievalService {
    store: Arc<dyn KnowledgeStore>,
    embedder: Arc<dyn Embedder>,
    limit_default: u32,
    limit_max: u32,
}

impl RetrievalService {
    pub fn new(
        store: Arc<dyn KnowledgeStore>,
        embedder: Arc<dyn Embedder>,
        limit_default: u32,
        limit_max: u32,
    ) -> Self {
        Self {
            store,
            embedder,
            limit_default,
            limit_max,
        }
    }

    /// Ranked summary search, tenant-scoped and paginated with an opaque
    /// forward-only cursor.
    pub async fn search(
        &self,
        principal: &Principal,
        request: SearchRequest,
    ) -> Result<SearchResponse, CoreError> {
        if request.query.trim().is_empty() {
            return Err(CoreError::invalid_input("query must not be empty"));
        }
        let limit = match request.limit {
            Some(0) => return Err(CoreError::invalid_input("limit must be positive")),
            Some(n) if n > self.limit_max => {
                return Err(CoreError::invalid_input(format!(
                    "limit must be at most {}",
                    self.limit_max
                )))
            }
            Some(n) => n,
            None => self.limit_default,
        };
        let offset = match &request.cursor {
            Some(cursor) => decode_cursor(cursor)?,
            None => 0,
        };

        let vector = self
            .embedder
            .embed(&request.query)
            .await
            .map_err(map_embed_error)?;

        let mut query = SimilarityQuery::new(vector, principal.tenant_id.clone(), limit);
        query.offset = offset;
        query.category = request.category;

        let hits = self
            .store
            .nearest_approved(&query)
            .await
            .map_err(map_db_error)?;

        let results: Vec<SnippetSummary> = hits
            .iter()
            .map(|(snippet, distance)| SnippetSummary {
                id: snippet.id,
                title: snippet.title(),
                category: snippet.category,
                confidence: snippet.confidence,
                contributor_tenant_id: snippet.tenant_id.clone(),
                relevance_score: 1.0 - distance,
            })
            .collect();

        let next_cursor = if results.len() as u32 == limit {
            Some(encode_cursor(offset + results.len() as u64))
        } else {
            None
        };

        Ok(SearchResponse {
            total_found: results.len(),
            results,
            next_cursor,
        })
    }

    /// Full-content fetch. Missing and cross-tenant are the same
    /// *not-found*; a successful read bumps the retrieval counter.
    pub async fn fetch(
        &self,
        principal: &Principal,
        id: SnippetId,
    ) -> Result<ApprovedSnippet, CoreError> {
        let snippet = self
            .store
            .fetch_approved(id, &principal.tenant_id)
            .await
            .map_err(map_db_error)?
            .ok_or(CoreError::NotFound)?;

        // Retrieval signal is best-effort; a miss must not fail the read.
        if let Err(e) = self.store.bump_retrieval(id).await {
            warn!(id = %id, error = %e, "retrieval counter bump failed");
        }

        Ok(snippet)
    }
}
