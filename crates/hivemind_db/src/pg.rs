//! PostgreSQL store.
//!
//! Quarantine claims use `FOR UPDATE SKIP LOCKED` held by the claiming
//! transaction, so a claim lives exactly as long as the reviewer session
//! and disappears on connection teardown. Approvals run in one
//! transaction: insert into the commons, delete from quarantine, and
//! `pg_notify`, which Postgres delivers only on commit, giving
//! commit-ordered fan-out for free. The approval listener runs on its
//! own connection, never on the transactional pool.

use async_trait::async_trait;
use pgvector::Vector;
use sqlx::postgres::{PgListener, PgPoolOptions, PgRow};
use sqlx::{PgConnection, PgPool, Row, Transaction};
use std::collections::HashSet;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use hivemind_types::{
    AgentId, ApprovalEvent, ApprovedSnippet, Category, DeploymentIdentity, PendingContribution,
    RunId, SnippetId, TenantId,
};

use crate::error::{map_unique_violation, DbError, Result};
use crate::schema::ensure_schema;
use crate::store::{
    AgentContribution, ApprovalStream, ApproveDecision, KnowledgeListing, KnowledgeStore,
    ListingStatus, ReviewBatch, SimilarityQuery, TenantStats,
};

/// Notify channel carrying approval events.
pub const APPROVAL_CHANNEL: &str = "hivemind_approvals";

/// Store configuration.
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

impl DbConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: 10,
            acquire_timeout: Duration::from_secs(30),
        }
    }

    pub fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }
}

pub struct PgStore {
    pool: PgPool,
    url: String,
}

impl PgStore {
    /// Connect and verify the schema. `dimensions` is the embedder's
    /// vector width; it shapes the embedding column on first run.
    pub async fn connect(config: &DbConfig, dimensions: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect(&config.url)
            .await?;

        ensure_schema(&pool, dimensions).await?;
        info!("connected to postgres");

        Ok(Self {
            pool,
            url: config.url.clone(),
        })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

// ---------------------------------------------------------------------------
// Row decoding
// ---------------------------------------------------------------------------

fn decode_category(raw: &str) -> Result<Category> {
    Category::parse(raw).ok_or_else(|| DbError::decode(format!("unknown category `{raw}`")))
}

fn pending_from_row(row: &PgRow) -> Result<PendingContribution> {
    Ok(PendingContribution {
        id: SnippetId(row.try_get::<Uuid, _>("id")?),
        tenant_id: TenantId(row.try_get("tenant_id")?),
        agent_id: AgentId(row.try_get("agent_id")?),
        run_id: row.try_get::<Option<String>, _>("run_id")?.map(RunId),
        content: row.try_get("content")?,
        category: decode_category(&row.try_get::<String, _>("category")?)?,
        confidence: row.try_get("confidence")?,
        framework: row.try_get("framework")?,
        language: row.try_get("language")?,
        tags: row.try_get("tags")?,
        content_hash: row.try_get("content_hash")?,
        sensitive_flag: row.try_get("sensitive_flag")?,
        submitted_at: row.try_get("submitted_at")?,
    })
}

fn approved_from_row(row: &PgRow) -> Result<ApprovedSnippet> {
    let original_category = row
        .try_get::<Option<String>, _>("original_category")?
        .map(|raw| decode_category(&raw))
        .transpose()?;
    Ok(ApprovedSnippet {
        id: SnippetId(row.try_get::<Uuid, _>("id")?),
        tenant_id: TenantId(row.try_get("tenant_id")?),
        agent_id: AgentId(row.try_get("agent_id")?),
        run_id: row.try_get::<Option<String>, _>("run_id")?.map(RunId),
        content: row.try_get("content")?,
        category: decode_category(&row.try_get::<String, _>("category")?)?,
        original_category,
        confidence: row.try_get("confidence")?,
        framework: row.try_get("framework")?,
        language: row.try_get("language")?,
        tags: row.try_get("tags")?,
        content_hash: row.try_get("content_hash")?,
        is_public: row.try_get("is_public")?,
        embedding: row.try_get::<Vector, _>("embedding")?.to_vec(),
        approved_at: row.try_get("approved_at")?,
        deleted_at: row.try_get("deleted_at")?,
        retrieval_count: row.try_get("retrieval_count")?,
        helpful_count: row.try_get("helpful_count")?,
        not_helpful_count: row.try_get("not_helpful_count")?,
    })
}

// ---------------------------------------------------------------------------
// The approval transaction body, shared by the batch and by-id paths.
// ---------------------------------------------------------------------------

async fn approve_on(
    conn: &mut PgConnection,
    id: SnippetId,
    embedding: Vec<f32>,
    decision: &ApproveDecision,
) -> Result<ApprovalEvent> {
    let row = sqlx::query("SELECT * FROM pending_contributions WHERE id = $1 FOR UPDATE")
        .bind(id.0)
        .fetch_optional(&mut *conn)
        .await?;
    let pending = match row {
        Some(row) => pending_from_row(&row)?,
        None => return Err(DbError::Gone),
    };

    let category = decision.category_override.unwrap_or(pending.category);
    let original_category = decision
        .category_override
        .filter(|c| *c != pending.category)
        .map(|_| pending.category);

    sqlx::query(
        r#"INSERT INTO approved_snippets
            (id, tenant_id, agent_id, run_id, content, category, original_category,
             confidence, framework, language, tags, content_hash, is_public, embedding)
           VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)"#,
    )
    .bind(pending.id.0)
    .bind(pending.tenant_id.as_str())
    .bind(pending.agent_id.as_str())
    .bind(pending.run_id.as_ref().map(|r| r.0.clone()))
    .bind(&pending.content)
    .bind(category.as_str())
    .bind(original_category.map(|c| c.as_str()))
    .bind(pending.confidence)
    .bind(&pending.framework)
    .bind(&pending.language)
    .bind(&pending.tags)
    .bind(&pending.content_hash)
    .bind(decision.is_public)
    .bind(Vector::from(embedding))
    .execute(&mut *conn)
    .await
    .map_err(map_unique_violation)?;

    sqlx::query("DELETE FROM pending_contributions WHERE id = $1")
        .bind(id.0)
        .execute(&mut *conn)
        .await?;

    let event = ApprovalEvent {
        id: pending.id,
        tenant_id: pending.tenant_id.clone(),
        category,
        is_public: decision.is_public,
        title: pending.title(),
    };

    sqlx::query("SELECT pg_notify($1, $2)")
        .bind(APPROVAL_CHANNEL)
        .bind(serde_json::to_string(&event)?)
        .execute(&mut *conn)
        .await?;

    Ok(event)
}

// ---------------------------------------------------------------------------
// Claimed batch
// ---------------------------------------------------------------------------

struct PgReviewBatch {
    tx: Transaction<'static, sqlx::Postgres>,
    rows: Vec<PendingContribution>,
    decided: HashSet<SnippetId>,
}

impl PgReviewBatch {
    fn take_claimed(&mut self, id: SnippetId) -> Result<()> {
        if !self.rows.iter().any(|r| r.id == id) || self.decided.contains(&id) {
            return Err(DbError::Gone);
        }
        self.decided.insert(id);
        Ok(())
    }
}

#[async_trait]
impl ReviewBatch for PgReviewBatch {
    fn rows(&self) -> &[PendingContribution] {
        &self.rows
    }

    async fn approve(
        &mut self,
        id: SnippetId,
        embedding: Vec<f32>,
        decision: ApproveDecision,
    ) -> Result<ApprovalEvent> {
        self.take_claimed(id)?;

        // Savepoint so a duplicate aborts this decision, not the claim.
        sqlx::query("SAVEPOINT decision")
            .execute(&mut *self.tx)
            .await?;
        match approve_on(&mut self.tx, id, embedding, &decision).await {
            Ok(event) => {
                sqlx::query("RELEASE SAVEPOINT decision")
                    .execute(&mut *self.tx)
                    .await?;
                Ok(event)
            }
            Err(e) => {
                sqlx::query("ROLLBACK TO SAVEPOINT decision")
                    .execute(&mut *self.tx)
                    .await?;
                self.decided.remove(&id);
                Err(e)
            }
        }
    }

    async fn reject(&mut self, id: SnippetId) -> Result<()> {
        self.take_claimed(id)?;
        sqlx::query("DELETE FROM pending_contributions WHERE id = $1")
            .bind(id.0)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn flag_sensitive(&mut self, id: SnippetId) -> Result<()> {
        self.take_claimed(id)?;
        sqlx::query("UPDATE pending_contributions SET sensitive_flag = TRUE WHERE id = $1")
            .bind(id.0)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// KnowledgeStore
// ---------------------------------------------------------------------------

#[async_trait]
impl KnowledgeStore for PgStore {
    async fn insert_pending(&self, row: &PendingContribution) -> Result<()> {
        sqlx::query(
            r#"INSERT INTO pending_contributions
                (id, tenant_id, agent_id, run_id, content, category, confidence,
                 framework, language, tags, content_hash, sensitive_flag, submitted_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)"#,
        )
        .bind(row.id.0)
        .bind(row.tenant_id.as_str())
        .bind(row.agent_id.as_str())
        .bind(row.run_id.as_ref().map(|r| r.0.clone()))
        .bind(&row.content)
        .bind(row.category.as_str())
        .bind(row.confidence)
        .bind(&row.framework)
        .bind(&row.language)
        .bind(&row.tags)
        .bind(&row.content_hash)
        .bind(row.sensitive_flag)
        .bind(row.submitted_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn pending_by_id(&self, id: SnippetId) -> Result<Option<PendingContribution>> {
        let row = sqlx::query("SELECT * FROM pending_contributions WHERE id = $1")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(pending_from_row).transpose()
    }

    async fn claim_pending(&self, tenant: &TenantId, limit: u32) -> Result<Box<dyn ReviewBatch>> {
        let mut tx = self.pool.begin().await?;
        let rows = sqlx::query(
            r#"SELECT * FROM pending_contributions
               WHERE tenant_id = $1
               ORDER BY submitted_at ASC, id ASC
               LIMIT $2
               FOR UPDATE SKIP LOCKED"#,
        )
        .bind(tenant.as_str())
        .bind(limit as i64)
        .fetch_all(&mut *tx)
        .await?;

        let rows = rows
            .iter()
            .map(pending_from_row)
            .collect::<Result<Vec<_>>>()?;

        Ok(Box::new(PgReviewBatch {
            tx,
            rows,
            decided: HashSet::new(),
        }))
    }

    async fn approve_pending(
        &self,
        id: SnippetId,
        embedding: Vec<f32>,
        decision: ApproveDecision,
    ) -> Result<ApprovalEvent> {
        let mut tx = self.pool.begin().await?;
        let event = approve_on(&mut tx, id, embedding, &decision).await?;
        tx.commit().await?;
        Ok(event)
    }

    async fn reject_pending(&self, id: SnippetId) -> Result<()> {
        let result = sqlx::query("DELETE FROM pending_contributions WHERE id = $1")
            .bind(id.0)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::Gone);
        }
        Ok(())
    }

    async fn flag_sensitive(&self, id: SnippetId) -> Result<()> {
        let result =
            sqlx::query("UPDATE pending_contributions SET sensitive_flag = TRUE WHERE id = $1")
                .bind(id.0)
                .execute(&self.pool)
                .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::Gone);
        }
        Ok(())
    }

    async fn nearest_approved(
        &self,
        query: &SimilarityQuery,
    ) -> Result<Vec<(ApprovedSnippet, f64)>> {
        let exclude: Vec<Uuid> = query.exclude_ids.iter().map(|id| id.0).collect();
        let rows = sqlx::query(
            r#"SELECT *, (embedding <=> $1) AS distance
               FROM approved_snippets
               WHERE (tenant_id = $2 OR is_public)
                 AND deleted_at IS NULL
                 AND ($3::text IS NULL OR category = $3)
                 AND NOT (id = ANY($4))
                 AND ($5::float8 IS NULL OR (embedding <=> $1) <= $5)
               ORDER BY embedding <=> $1 ASC, id ASC
               LIMIT $6 OFFSET $7"#,
        )
        .bind(Vector::from(query.vector.clone()))
        .bind(query.tenant_id.as_str())
        .bind(query.category.map(|c| c.as_str()))
        .bind(&exclude)
        .bind(query.distance_ceiling)
        .bind(query.limit as i64)
        .bind(query.offset as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let distance: f64 = row.try_get("distance")?;
                Ok((approved_from_row(row)?, distance))
            })
            .collect()
    }

    async fn fetch_approved(
        &self,
        id: SnippetId,
        tenant: &TenantId,
    ) -> Result<Option<ApprovedSnippet>> {
        let row = sqlx::query(
            r#"SELECT * FROM approved_snippets
               WHERE id = $1
                 AND (tenant_id = $2 OR is_public)
                 AND deleted_at IS NULL"#,
        )
        .bind(id.0)
        .bind(tenant.as_str())
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(approved_from_row).transpose()
    }

    async fn bump_retrieval(&self, id: SnippetId) -> Result<()> {
        sqlx::query(
            "UPDATE approved_snippets SET retrieval_count = retrieval_count + 1 WHERE id = $1",
        )
        .bind(id.0)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn mark_deleted(
        &self,
        id: SnippetId,
        tenant: &TenantId,
        agent: &AgentId,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"UPDATE approved_snippets SET deleted_at = now()
               WHERE id = $1 AND tenant_id = $2 AND agent_id = $3 AND deleted_at IS NULL"#,
        )
        .bind(id.0)
        .bind(tenant.as_str())
        .bind(agent.as_str())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_by_agent(
        &self,
        tenant: &TenantId,
        agent: &AgentId,
        offset: u64,
        limit: u32,
    ) -> Result<Vec<KnowledgeListing>> {
        let rows = sqlx::query(
            r#"SELECT id, category, content, submitted_at AS ts, 'pending' AS status
                 FROM pending_contributions
                 WHERE tenant_id = $1 AND agent_id = $2
               UNION ALL
               SELECT id, category, content, approved_at AS ts, 'approved' AS status
                 FROM approved_snippets
                 WHERE tenant_id = $1 AND agent_id = $2 AND deleted_at IS NULL
               ORDER BY ts DESC, id DESC
               LIMIT $3 OFFSET $4"#,
        )
        .bind(tenant.as_str())
        .bind(agent.as_str())
        .bind(limit as i64)
        .bind(offset as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let status = match row.try_get::<String, _>("status")?.as_str() {
                    "pending" => ListingStatus::Pending,
                    _ => ListingStatus::Approved,
                };
                let content: String = row.try_get("content")?;
                Ok(KnowledgeListing {
                    id: SnippetId(row.try_get::<Uuid, _>("id")?),
                    status,
                    category: decode_category(&row.try_get::<String, _>("category")?)?,
                    title: hivemind_types::title_of(&content),
                    timestamp: row.try_get("ts")?,
                })
            })
            .collect()
    }

    async fn tenant_stats(&self, tenant: &TenantId) -> Result<TenantStats> {
        let pending: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM pending_contributions WHERE tenant_id = $1")
                .bind(tenant.as_str())
                .fetch_one(&self.pool)
                .await?;

        let row = sqlx::query(
            r#"SELECT
                 COUNT(*) FILTER (WHERE deleted_at IS NULL) AS approved,
                 COUNT(*) FILTER (WHERE is_public AND deleted_at IS NULL) AS public,
                 COALESCE(SUM(retrieval_count), 0)::bigint AS retrievals,
                 COALESCE(SUM(helpful_count), 0)::bigint AS helpful,
                 COALESCE(SUM(not_helpful_count), 0)::bigint AS not_helpful
               FROM approved_snippets WHERE tenant_id = $1"#,
        )
        .bind(tenant.as_str())
        .fetch_one(&self.pool)
        .await?;

        let by_agent = sqlx::query(
            r#"SELECT agent_id, COUNT(*) AS approved
               FROM approved_snippets
               WHERE tenant_id = $1 AND deleted_at IS NULL
               GROUP BY agent_id
               ORDER BY approved DESC, agent_id ASC"#,
        )
        .bind(tenant.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(TenantStats {
            pending,
            approved: row.try_get("approved")?,
            public: row.try_get("public")?,
            total_retrievals: row.try_get("retrievals")?,
            helpful: row.try_get("helpful")?,
            not_helpful: row.try_get("not_helpful")?,
            by_agent: by_agent
                .iter()
                .map(|r| {
                    Ok(AgentContribution {
                        agent_id: AgentId(r.try_get("agent_id")?),
                        approved: r.try_get("approved")?,
                    })
                })
                .collect::<Result<Vec<_>>>()?,
        })
    }

    async fn subscribe_approvals(&self) -> Result<ApprovalStream> {
        // Dedicated connection: LISTEN is incompatible with transactional
        // pool reuse.
        let mut listener = PgListener::connect(&self.url).await?;
        listener.listen(APPROVAL_CHANNEL).await?;

        let (tx, rx) = mpsc::channel(256);
        tokio::spawn(async move {
            loop {
                match listener.recv().await {
                    Ok(notification) => {
                        match serde_json::from_str::<ApprovalEvent>(notification.payload()) {
                            Ok(event) => {
                                if tx.send(event).await.is_err() {
                                    break;
                                }
                            }
                            Err(e) => {
                                warn!(error = %e, "undecodable approval payload; skipping");
                            }
                        }
                    }
                    Err(e) => {
                        // PgListener reconnects on the next recv; back off
                        // so a dead server does not spin this task.
                        warn!(error = %e, "approval listener error");
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                }
            }
        });

        Ok(ApprovalStream::new(rx))
    }

    async fn load_identity(&self) -> Result<Option<DeploymentIdentity>> {
        let row = sqlx::query(
            "SELECT model_id, model_revision, dimensions, pinned_at FROM deployment_identity",
        )
        .fetch_optional(&self.pool)
        .await?;
        row.map(|row| {
            Ok(DeploymentIdentity {
                model_id: row.try_get("model_id")?,
                model_revision: row.try_get("model_revision")?,
                dimensions: row.try_get::<i32, _>("dimensions")? as u32,
                pinned_at: row.try_get("pinned_at")?,
            })
        })
        .transpose()
    }

    async fn pin_identity(&self, identity: &DeploymentIdentity) -> Result<()> {
        sqlx::query(
            r#"INSERT INTO deployment_identity (singleton, model_id, model_revision, dimensions, pinned_at)
               VALUES (TRUE, $1, $2, $3, $4)
               ON CONFLICT (singleton) DO NOTHING"#,
        )
        .bind(&identity.model_id)
        .bind(&identity.model_revision)
        .bind(identity.dimensions as i32)
        .bind(identity.pinned_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
