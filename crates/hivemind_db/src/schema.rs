//! Database schema creation. All CREATE statements live here, single
//! source of truth, idempotent, run at every startup.

use sqlx::PgPool;
use sqlx::AssertSqlSafe;
use tracing::info;

use crate::error::Result;

/// Ensure extensions, tables, and indexes exist.
///
/// `dimensions` fixes the width of the embedding column and comes from
/// the embedder; changing it on an existing database is a deployment
/// identity change and is caught by the identity check, not here.
pub async fn ensure_schema(pool: &PgPool, dimensions: u32) -> Result<()> {
    sqlx::query("CREATE EXTENSION IF NOT EXISTS vector")
        .execute(pool)
        .await?;

    // Quarantine: sanitised submissions awaiting review.
    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS pending_contributions (
            id UUID PRIMARY KEY,
            tenant_id TEXT NOT NULL,
            agent_id TEXT NOT NULL,
            run_id TEXT,
            content TEXT NOT NULL,
            category TEXT NOT NULL,
            confidence DOUBLE PRECISION NOT NULL,
            framework TEXT,
            language TEXT,
            tags TEXT[] NOT NULL DEFAULT '{}',
            content_hash TEXT NOT NULL,
            sensitive_flag BOOLEAN NOT NULL DEFAULT FALSE,
            submitted_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )"#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_pending_tenant_submitted
         ON pending_contributions(tenant_id, submitted_at)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_pending_agent
         ON pending_contributions(tenant_id, agent_id, submitted_at)",
    )
    .execute(pool)
    .await?;

    // The commons: promoted snippets. Content, hash, embedding, and
    // provenance are frozen at promotion.
    sqlx::query(AssertSqlSafe(format!(
        r#"CREATE TABLE IF NOT EXISTS approved_snippets (
            id UUID PRIMARY KEY,
            tenant_id TEXT NOT NULL,
            agent_id TEXT NOT NULL,
            run_id TEXT,
            content TEXT NOT NULL,
            category TEXT NOT NULL,
            original_category TEXT,
            confidence DOUBLE PRECISION NOT NULL,
            framework TEXT,
            language TEXT,
            tags TEXT[] NOT NULL DEFAULT '{{}}',
            content_hash TEXT NOT NULL,
            is_public BOOLEAN NOT NULL DEFAULT FALSE,
            embedding vector({dimensions}) NOT NULL,
            approved_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            deleted_at TIMESTAMPTZ,
            retrieval_count BIGINT NOT NULL DEFAULT 0,
            helpful_count BIGINT NOT NULL DEFAULT 0,
            not_helpful_count BIGINT NOT NULL DEFAULT 0
        )"#
    )))
    .execute(pool)
    .await?;

    // Hash-scoped uniqueness: per tenant for private rows, global for
    // the public commons (first committed approval wins).
    sqlx::query(
        "CREATE UNIQUE INDEX IF NOT EXISTS uniq_approved_private_hash
         ON approved_snippets(tenant_id, content_hash) WHERE NOT is_public",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE UNIQUE INDEX IF NOT EXISTS uniq_approved_public_hash
         ON approved_snippets(content_hash) WHERE is_public",
    )
    .execute(pool)
    .await?;

    // ANN over cosine distance.
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_approved_embedding
         ON approved_snippets USING hnsw (embedding vector_cosine_ops)",
    )
    .execute(pool)
    .await?;

    // Partial covering index for the isolation filter.
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_approved_tenant_live
         ON approved_snippets(tenant_id) WHERE deleted_at IS NULL",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_approved_agent
         ON approved_snippets(tenant_id, agent_id, approved_at)",
    )
    .execute(pool)
    .await?;

    // Single-row deployment identity.
    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS deployment_identity (
            singleton BOOLEAN PRIMARY KEY DEFAULT TRUE CHECK (singleton),
            model_id TEXT NOT NULL,
            model_revision TEXT,
            dimensions INTEGER NOT NULL,
            pinned_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )"#,
    )
    .execute(pool)
    .await?;

    info!(dimensions, "database schema verified");
    Ok(())
}
