//! Embedding contract.
//!
//! An [`Embedder`] turns text into a unit vector in a fixed-dimension
//! space. The model identity (`model_id`, optional revision, dimensions)
//! is immutable for the process lifetime and pinned into the store as
//! the deployment identity; a mismatch on a later start aborts startup,
//! because vectors from different models are not comparable.
//!
//! Every vector handed out by an embedder is L2-normalised to
//! `‖v‖ = 1 ± 1e-5`. Consumers must not renormalise.

#[cfg(feature = "local-embeddings")]
mod local;

#[cfg(feature = "local-embeddings")]
pub use local::FastembedEmbedder;

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;

use hivemind_types::DeploymentIdentity;

/// Tolerance on the unit-norm invariant.
pub const UNIT_NORM_EPSILON: f64 = 1e-5;

/// Default bound on queued inference requests.
pub const DEFAULT_QUEUE_DEPTH: usize = 64;

#[derive(Debug, Error)]
pub enum EmbedError {
    /// The bounded inference queue is full; the caller may retry.
    #[error("embedding queue saturated")]
    Busy,

    /// Model failure. Fatal when raised at construction time.
    #[error("embedding failed: {0}")]
    Inference(String),
}

#[async_trait]
pub trait Embedder: Send + Sync {
    fn model_id(&self) -> &str;

    fn model_revision(&self) -> Option<&str> {
        None
    }

    fn dimensions(&self) -> usize;

    /// Embed one string. The result has length [`Self::dimensions`] and
    /// unit norm.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError>;

    /// Embed a batch, element-wise guarantees as [`Self::embed`].
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError>;
}

/// The identity this embedder pins into the store on first start.
pub fn identity_of(embedder: &dyn Embedder) -> DeploymentIdentity {
    DeploymentIdentity {
        model_id: embedder.model_id().to_string(),
        model_revision: embedder.model_revision().map(String::from),
        dimensions: embedder.dimensions() as u32,
        pinned_at: Utc::now(),
    }
}

/// Scale `v` to unit norm in place. Zero vectors are left untouched.
pub fn l2_normalize(v: &mut [f32]) {
    let norm = v.iter().map(|x| (*x as f64) * (*x as f64)).sum::<f64>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x = (*x as f64 / norm) as f32;
        }
    }
}

/// Check the stored-embedding invariant: `|‖v‖ − 1| ≤ 1e-5`.
pub fn is_unit_norm(v: &[f32]) -> bool {
    let norm = v.iter().map(|x| (*x as f64) * (*x as f64)).sum::<f64>().sqrt();
    (norm - 1.0).abs() <= UNIT_NORM_EPSILON
}

/// Cosine distance between two unit vectors: `1 − a·b`, clamped to
/// `[0, 2]` against floating-point drift.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f64 {
    let dot: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| (*x as f64) * (*y as f64))
        .sum();
    (1.0 - dot).clamp(0.0, 2.0)
}
