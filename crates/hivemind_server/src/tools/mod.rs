//! MCP tool implementations.
//!
//! Four tools make up the agent surface: `add_knowledge`,
//! `search_knowledge`, `list_knowledge`, `delete_knowledge`. Each tool
//! resolves its caller from the already-authenticated principal; tenant
//! and agent identity never come from tool arguments.

mod add;
mod delete;
mod list;
mod registry;
mod search;

pub use registry::ToolRegistry;

use async_trait::async_trait;
use serde_json::Value;

use hivemind_types::CoreError;

use crate::auth::Principal;
use crate::protocol::ToolDefinition;
use crate::state::AppState;

#[async_trait]
pub trait McpTool: Send + Sync {
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// JSON Schema for the tool arguments, surfaced via `tools/list`.
    fn input_schema(&self) -> Value;

    async fn execute(
        &self,
        principal: &Principal,
        args: Value,
        state: &AppState,
    ) -> Result<Value, CoreError>;

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: self.input_schema(),
        }
    }
}

/// Decode tool arguments, folding serde errors into *invalid-input*.
pub(crate) fn parse_args<T: serde::de::DeserializeOwned>(args: Value) -> Result<T, CoreError> {
    serde_json::from_value(args).map_err(|e| CoreError::invalid_input(e.to_string()))
}
