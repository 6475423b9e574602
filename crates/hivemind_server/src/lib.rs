//! HiveMind core: services, MCP tool surface, and HTTP/SSE transport.
//!
//! # Architecture
//!
//! ```text
//! Agent ──POST /mcp──▶ Auth ─▶ ToolRegistry ─▶ Services ─▶ Store
//!                                                 │
//! Reviewer CLI ──────────────▶ Services ──────────┤
//!                                                 ▼
//! Dashboard ──GET /events──▶ Notifier ◀── approval channel (commit order)
//! ```
//!
//! Contributions pass through the sanitiser and land in quarantine; a
//! human approves them into the commons, which embeds the content and
//! fans the approval out to live subscribers. Retrieval is tenant-scoped
//! semantic search over approved, non-deleted snippets.

pub mod auth;
pub mod boot;
pub mod config;
pub mod http;
pub mod notifier;
pub mod protocol;
pub mod services;
pub mod state;
pub mod tools;

pub use auth::{ApiKeyAuthenticator, Authenticator, Principal};
pub use boot::{verify_deployment_identity, BootError};
pub use config::ServerSettings;
pub use http::router;
pub use notifier::{Notifier, NotifierConfig, OutboundEvent, Subscription};
pub use state::AppState;
pub use tools::{McpTool, ToolRegistry};
