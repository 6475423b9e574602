//! Core domain types for HiveMind.
//!
//! Everything shared between the sanitiser, store, services, and tool
//! surface lives here: identifiers, the knowledge category enum, pending
//! and approved rows, the deployment identity record, content hashing,
//! opaque pagination cursors, and the error taxonomy.

pub mod category;
pub mod contribution;
pub mod cursor;
pub mod error;
pub mod hash;
pub mod identity;
pub mod ids;

pub use category::Category;
pub use contribution::{
    ApprovalEvent, ApprovedSnippet, NewContribution, PendingContribution, SnippetSummary,
};
pub use cursor::{decode_cursor, encode_cursor};
pub use error::CoreError;
pub use hash::{content_hash, title_of, TITLE_MAX_CHARS};
pub use identity::DeploymentIdentity;
pub use ids::{AgentId, RunId, SnippetId, TenantId};
