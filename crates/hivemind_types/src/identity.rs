//! Deployment identity: the pinned embedding model for this database.
//!
//! Written once on first start; every later start compares and refuses to
//! run on mismatch. Vectors embedded by different models are not
//! comparable, so silent model changes would corrupt retrieval.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentIdentity {
    pub model_id: String,
    /// Content-addressed revision, when the provider exposes one.
    pub model_revision: Option<String>,
    pub dimensions: u32,
    pub pinned_at: DateTime<Utc>,
}

impl DeploymentIdentity {
    /// True when `other` describes the same embedding space.
    ///
    /// A missing revision on either side is treated as compatible; a
    /// present-but-different revision is not.
    pub fn matches(&self, other: &DeploymentIdentity) -> bool {
        if self.model_id != other.model_id || self.dimensions != other.dimensions {
            return false;
        }
        match (&self.model_revision, &other.model_revision) {
            (Some(a), Some(b)) => a == b,
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(model: &str, rev: Option<&str>, dims: u32) -> DeploymentIdentity {
        DeploymentIdentity {
            model_id: model.to_string(),
            model_revision: rev.map(String::from),
            dimensions: dims,
            pinned_at: Utc::now(),
        }
    }

    #[test]
    fn same_model_matches() {
        let a = identity("minilm", Some("abc"), 384);
        let b = identity("minilm", Some("abc"), 384);
        assert!(a.matches(&b));
    }

    #[test]
    fn dimension_drift_fails() {
        let a = identity("minilm", None, 384);
        let b = identity("minilm", None, 768);
        assert!(!a.matches(&b));
    }

    #[test]
    fn revision_only_checked_when_both_present() {
        let pinned = identity("minilm", Some("abc"), 384);
        let unknown_rev = identity("minilm", None, 384);
        let other_rev = identity("minilm", Some("def"), 384);
        assert!(pinned.matches(&unknown_rev));
        assert!(!pinned.matches(&other_rev));
    }
}
