//! CLI command modules.

pub mod config;
pub mod review;
pub mod serve;

use std::sync::Arc;

use anyhow::Result;

use hivemind_embed::Embedder;

/// Build the process-wide embedder. Model load is expensive and happens
/// exactly once, here, never in a hot path.
#[cfg(feature = "local-embeddings")]
pub fn build_embedder(queue_depth: usize) -> Result<Arc<dyn Embedder>> {
    Ok(Arc::new(hivemind_embed::FastembedEmbedder::new(
        queue_depth,
    )?))
}

#[cfg(not(feature = "local-embeddings"))]
pub fn build_embedder(_queue_depth: usize) -> Result<Arc<dyn Embedder>> {
    anyhow::bail!(
        "this build has no embedding backend; rebuild with the `local-embeddings` feature"
    )
}
