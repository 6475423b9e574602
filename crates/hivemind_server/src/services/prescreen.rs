//! Reviewer pre-screen: quality badge and near-duplicate lookup.
//!
//! Both outputs are advisory. The quality index is a deterministic
//! synthesis of the pending metadata; the similarity lookup embeds the
//! pending content and asks the commons for close neighbours in the
//! contribution's own tenant scope.

use std::sync::Arc;

use serde::Serialize;

use hivemind_db::{KnowledgeStore, SimilarityQuery};
use hivemind_embed::Embedder;
use hivemind_types::{Category, CoreError, PendingContribution, SnippetId, TenantId};

use crate::services::{map_db_error, map_embed_error};

/// Neighbours are reported within this cosine distance (≥ 65%
/// similarity).
pub const SIMILARITY_CEILING: f64 = 0.35;

/// At or above this similarity a neighbour is a likely duplicate.
pub const DUPLICATE_THRESHOLD_PERCENT: f64 = 80.0;

const NEIGHBOUR_LIMIT: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum QualityBadge {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct QualityIndex {
    pub score: u8,
    pub badge: QualityBadge,
}

#[derive(Debug, Clone, Serialize)]
pub struct SimilarEntry {
    pub id: SnippetId,
    pub title: String,
    pub category: Category,
    pub similarity_percent: f64,
    pub tenant_id: TenantId,
    pub likely_duplicate: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PrescreenReport {
    pub quality: QualityIndex,
    pub similar: Vec<SimilarEntry>,
}

/// Deterministic quality synthesis from pending metadata.
pub fn quality_index(pending: &PendingContribution) -> QualityIndex {
    let mut score = (pending.confidence * 100.0).round() as i32;
    if pending.sensitive_flag {
        score -= 30;
    }
    let len = pending.content.chars().count();
    if len < 50 {
        score -= 20;
    } else if len > 200 {
        score += 10;
    }
    let score = score.clamp(0, 100) as u8;
    let badge = if score >= 80 {
        QualityBadge::High
    } else if score >= 50 {
        QualityBadge::Medium
    } else {
        QualityBadge::Low
    };
    QualityIndex { score, badge }
}

#[derive(Clone)]
pub struct PrescreenService {
    store: Arc<dyn KnowledgeStore>,
    embedder: Arc<dyn Embedder>,
}

impl PrescreenService {
    pub fn new(store: Arc<dyn KnowledgeStore>, embedder: Arc<dyn Embedder>) -> Self {
        Self { store, embedder }
    }

    pub async fn prescreen(&self, id: SnippetId) -> Result<PrescreenReport, CoreError> {
        let pending = self
            .store
            .pending_by_id(id)
            .await
            .map_err(map_db_error)?
            .ok_or(CoreError::Gone)?;

        let vector = self
            .embedder
            .embed(&pending.content)
            .await
            .map_err(map_embed_error)?;

        let mut query = SimilarityQuery::new(vector, pending.tenant_id.clone(), NEIGHBOUR_LIMIT);
        query.distance_ceiling = Some(SIMILARITY_CEILING);

        let neighbours = self
            .store
            .nearest_approved(&query)
            .await
            .map_err(map_db_error)?;

        let similar = neighbours
            .into_iter()
            .map(|(snippet, distance)| {
                let similarity_percent = (1.0 - distance) * 100.0;
                SimilarEntry {
                    id: snippet.id,
                    title: snippet.title(),
                    category: snippet.category,
                    similarity_percent,
                    tenant_id: snippet.tenant_id,
                    likely_duplicate: similarity_percent >= DUPLICATE_THRESHOLD_PERCENT,
                }
            })
            .collect();

        Ok(PrescreenReport {
            quality: quality_index(&pending),
            similar,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use hivemind_types::{content_hash, AgentId};

    fn pending(confidence: f64, content: &str, sensitive: bool) -> PendingContribution {
        PendingContribution {
            id: SnippetId::generate(),
            tenant_id: TenantId::new("t1"),
            agent_id: AgentId::new("a1"),
            run_id: None,
            content: content.to_string(),
            category: Category::BugFix,
            confidence,
            framework: None,
            language: None,
            tags: vec![],
            content_hash: content_hash(content),
            sensitive_flag: sensitive,
            submitted_at: Utc::now(),
        }
    }

    #[test]
    fn confident_medium_length_content_is_high() {
        let q = quality_index(&pending(0.9, &"x".repeat(100), false));
        assert_eq!(q.score, 90);
        assert_eq!(q.badge, QualityBadge::High);
    }

    #[test]
    fn short_content_is_penalised() {
        let q = quality_index(&pending(0.9, "tiny", false));
        assert_eq!(q.score, 70);
        assert_eq!(q.badge, QualityBadge::Medium);
    }

    #[test]
    fn long_content_gets_a_bonus_capped_at_100() {
        let q = quality_index(&pending(0.95, &"x".repeat(300), false));
        assert_eq!(q.score, 100);
        assert_eq!(q.badge, QualityBadge::High);
    }

    #[test]
    fn sensitive_flag_penalty_applies() {
        let q = quality_index(&pending(0.9, &"x".repeat(100), true));
        assert_eq!(q.score, 60);
        assert_eq!(q.badge, QualityBadge::Medium);
    }

    #[test]
    fn floor_is_zero() {
        let q = quality_index(&pending(0.0, "tiny", true));
        assert_eq!(q.score, 0);
        assert_eq!(q.badge, QualityBadge::Low);
    }
}
