//! Error taxonomy shared across services.
//!
//! Every service returns [`CoreError`]; the tool surface maps it to a
//! single human-readable message. The public message never distinguishes
//! cross-tenant rows from missing rows and never carries internals.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum CoreError {
    /// Argument out of range, enum mismatch, or payload too large.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Missing, malformed, or unverifiable credential.
    #[error("authentication failed")]
    Auth,

    /// The sanitiser redacted more than half of the content.
    #[error("content rejected: {:.0}% of the text required redaction", .ratio * 100.0)]
    RedactionRejected { ratio: f64 },

    /// Item missing or not visible to the caller. Both cases produce the
    /// same error on purpose.
    #[error("not found")]
    NotFound,

    /// Hash-scoped uniqueness violation at approval time.
    #[error("duplicate content already approved")]
    Duplicate,

    /// The target of a reviewer decision was already resolved.
    #[error("already resolved by another reviewer")]
    Gone,

    /// Inference queue saturated or the request deadline passed.
    #[error("busy: {0}")]
    Busy(String),

    /// Last resort. Logged server-side with the correlation id.
    #[error("internal error (ref {correlation_id})")]
    Internal { correlation_id: Uuid },
}

impl CoreError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        CoreError::InvalidInput(msg.into())
    }

    pub fn busy(msg: impl Into<String>) -> Self {
        CoreError::Busy(msg.into())
    }

    /// Mint an internal error with a fresh correlation id. Callers log the
    /// underlying cause together with the id before surfacing this.
    pub fn internal() -> Self {
        CoreError::Internal {
            correlation_id: Uuid::new_v4(),
        }
    }

    /// Message suitable for the wire. Identical to `Display`, spelled out
    /// as its own method so call sites signal intent.
    pub fn public_message(&self) -> String {
        self.to_string()
    }

    /// Transient errors may be retried by the caller; permanent ones are
    /// reported once.
    pub fn is_transient(&self) -> bool {
        matches!(self, CoreError::Busy(_) | CoreError::Internal { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redaction_message_carries_ratio() {
        let e = CoreError::RedactionRejected { ratio: 0.72 };
        assert!(e.public_message().contains("72%"));
    }

    #[test]
    fn internal_message_hides_cause() {
        let e = CoreError::internal();
        let msg = e.public_message();
        assert!(msg.starts_with("internal error (ref "));
    }

    #[test]
    fn transient_classification() {
        assert!(CoreError::busy("queue full").is_transient());
        assert!(!CoreError::NotFound.is_transient());
        assert!(!CoreError::Duplicate.is_transient());
    }
}
