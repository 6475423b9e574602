//! Startup checks.

use thiserror::Error;
use tracing::info;

use hivemind_db::{DbError, KnowledgeStore};
use hivemind_embed::{identity_of, Embedder};
use hivemind_types::DeploymentIdentity;

#[derive(Debug, Error)]
pub enum BootError {
    #[error("database error during startup: {0}")]
    Db(#[from] DbError),

    /// The configured embedder does not match the model this database
    /// was built with. Refusing to start is the point: mixing embedding
    /// spaces silently corrupts retrieval.
    #[error(
        "embedding model drift: store is pinned to {stored_model} ({stored_dims}d), \
         process runs {current_model} ({current_dims}d); re-key the store or restore the model"
    )]
    IdentityMismatch {
        stored_model: String,
        stored_dims: u32,
        current_model: String,
        current_dims: u32,
    },
}

/// Pin the embedding identity on first start; fail loud on drift after.
pub async fn verify_deployment_identity(
    store: &dyn KnowledgeStore,
    embedder: &dyn Embedder,
) -> Result<DeploymentIdentity, BootError> {
    let current = identity_of(embedder);
    match store.load_identity().await? {
        None => {
            store.pin_identity(&current).await?;
            // Re-read: a racing first start may have pinned before us.
            let pinned = store.load_identity().await?.unwrap_or_else(|| current.clone());
            if !pinned.matches(&current) {
                return Err(mismatch(&pinned, &current));
            }
            info!(model = %pinned.model_id, dimensions = pinned.dimensions, "deployment identity pinned");
            Ok(pinned)
        }
        Some(stored) => {
            if !stored.matches(&current) {
                return Err(mismatch(&stored, &current));
            }
            info!(model = %stored.model_id, dimensions = stored.dimensions, "deployment identity verified");
            Ok(stored)
        }
    }
}

fn mismatch(stored: &DeploymentIdentity, current: &DeploymentIdentity) -> BootError {
    BootError::IdentityMismatch {
        stored_model: stored.model_id.clone(),
        stored_dims: stored.dimensions,
        current_model: current.model_id.clone(),
        current_dims: current.dimensions,
    }
}
