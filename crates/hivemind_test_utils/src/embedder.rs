//! Deterministic embedder for tests.
//!
//! Token-hash bag-of-words: each non-stopword token contributes weight
//! to one bucket of a fixed-width vector, then the vector is normalised.
//! Texts sharing vocabulary land close in cosine space, which is what
//! the retrieval and pre-screen tests rely on, and identical text always
//! produces the identical vector.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use async_trait::async_trait;

use hivemind_embed::{l2_normalize, EmbedError, Embedder};

const DIMENSIONS: usize = 256;

const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "in", "is", "it", "of", "on",
    "or", "the", "to", "with",
];

#[derive(Debug, Clone, Default)]
pub struct DeterministicEmbedder;

impl DeterministicEmbedder {
    pub fn new() -> Self {
        Self
    }

    fn vectorize(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; DIMENSIONS];
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let mut token = token.to_lowercase();
            if STOPWORDS.contains(&token.as_str()) {
                continue;
            }
            // Crude plural folding so "timeout" and "timeouts" agree.
            if token.len() > 3 && token.ends_with('s') && !token.ends_with("ss") {
                token.pop();
            }
            let mut hasher = DefaultHasher::new();
            token.hash(&mut hasher);
            let bucket = (hasher.finish() % DIMENSIONS as u64) as usize;
            v[bucket] += 1.0;
        }
        l2_normalize(&mut v);
        v
    }
}

#[async_trait]
impl Embedder for DeterministicEmbedder {
    fn model_id(&self) -> &str {
        "hivemind-test/deterministic-bow"
    }

    fn dimensions(&self) -> usize {
        DIMENSIONS
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        Ok(self.vectorize(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        Ok(texts.iter().map(|t| self.vectorize(t)).collect())
    }
}
