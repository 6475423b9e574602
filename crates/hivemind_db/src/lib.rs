//! Durable store for HiveMind.
//!
//! PostgreSQL with pgvector: transactional quarantine and commons
//! tables, approximate-nearest-neighbour retrieval, at-most-once claims
//! for competing reviewers, and a LISTEN/NOTIFY approval feed.

pub mod error;
pub mod pg;
pub mod schema;
pub mod store;

pub use error::{DbError, Result};
pub use pg::{DbConfig, PgStore, APPROVAL_CHANNEL};
pub use schema::ensure_schema;
pub use store::{
    AgentContribution, ApprovalStream, ApproveDecision, KnowledgeListing, KnowledgeStore,
    ListingStatus, ReviewBatch, SimilarityQuery, TenantStats,
};
