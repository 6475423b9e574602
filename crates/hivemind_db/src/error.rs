//! Error types for the store layer.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, DbError>;

#[derive(Debug, Error)]
pub enum DbError {
    /// SQLx error (connection, query, pool).
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Hash-scoped uniqueness violation on approval.
    #[error("duplicate content hash")]
    Duplicate,

    /// The targeted pending row no longer exists (or is not part of the
    /// caller's claim): another reviewer resolved it first.
    #[error("pending contribution already resolved")]
    Gone,

    /// A stored value failed to decode into its domain type.
    #[error("corrupt row: {0}")]
    Decode(String),

    /// Notify payload (de)serialisation.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DbError {
    pub fn decode(msg: impl Into<String>) -> Self {
        DbError::Decode(msg.into())
    }
}

/// Collapse a sqlx error into [`DbError::Duplicate`] when it is a unique
/// constraint violation, the generic variant otherwise.
pub fn map_unique_violation(err: sqlx::Error) -> DbError {
    if let sqlx::Error::Database(ref db) = err {
        if db.code().as_deref() == Some("23505") {
            return DbError::Duplicate;
        }
    }
    DbError::Sqlx(err)
}
