//! Tool discovery and dispatch.

use std::collections::HashMap;

use serde_json::Value;
use tracing::debug;

use hivemind_types::CoreError;

use crate::auth::Principal;
use crate::protocol::ToolDefinition;
use crate::state::AppState;
use crate::tools::{add, delete, list, search, McpTool};

pub struct ToolRegistry {
    tools: HashMap<&'static str, Box<dyn McpTool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            tools: HashMap::new(),
        };
        registry.register(Box::new(add::AddKnowledgeTool));
        registry.register(Box::new(search::SearchKnowledgeTool));
        registry.register(Box::new(list::ListKnowledgeTool));
        registry.register(Box::new(delete::DeleteKnowledgeTool));
        debug!("registered {} tools", registry.tools.len());
        registry
    }

    fn register(&mut self, tool: Box<dyn McpTool>) {
        self.tools.insert(tool.name(), tool);
    }

    pub fn list_tools(&self) -> Vec<ToolDefinition> {
        let mut tools: Vec<ToolDefinition> = self.tools.values().map(|t| t.definition()).collect();
        tools.sort_by(|a, b| a.name.cmp(&b.name));
        tools
    }

    pub fn has_tool(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub async fn call_tool(
        &self,
        name: &str,
        principal: &Principal,
        args: Value,
        state: &AppState,
    ) -> Result<Value, CoreError> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| CoreError::invalid_input(format!("unknown tool: {name}")))?;
        tool.execute(principal, args, state).await
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_has_the_four_agent_tools() {
        let registry = ToolRegistry::new();
        assert!(registry.has_tool("add_knowledge"));
        assert!(registry.has_tool("search_knowledge"));
        assert!(registry.has_tool("list_knowledge"));
        assert!(registry.has_tool("delete_knowledge"));
    }

    #[test]
    fn definitions_carry_schemas() {
        let registry = ToolRegistry::new();
        for def in registry.list_tools() {
            assert!(def.input_schema.is_object(), "{} lacks a schema", def.name);
            assert!(!def.description.is_empty());
        }
    }
}
