//! `delete_knowledge`: soft-delete one of the caller's own snippets.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use hivemind_types::{CoreError, SnippetId};

use crate::auth::Principal;
use crate::state::AppState;
use crate::tools::{parse_args, McpTool};

pub struct DeleteKnowledgeTool;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DeleteArgs {
    id: String,
}

#[async_trait]
impl McpTool for DeleteKnowledgeTool {
    fn name(&self) -> &'static str {
        "delete_knowledge"
    }

    fn description(&self) -> &'static str {
        "Remove one of your own approved snippets from retrieval. The row is shadowed, not destroyed."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "id": { "type": "string" }
            },
            "required": ["id"]
        })
    }

    async fn execute(
        &self,
        principal: &Principal,
        args: Value,
        state: &AppState,
    ) -> Result<Value, CoreError> {
        let args: DeleteArgs = parse_args(args)?;
        let id = SnippetId::parse(&args.id)
            .ok_or_else(|| CoreError::invalid_input("id must be a UUID"))?;

        // Ownership-checked: not-owned and not-found are one answer.
        let deleted = state
            .store
            .mark_deleted(id, &principal.tenant_id, &principal.agent_id)
            .await
            .map_err(crate::services::map_db_error)?;

        if !deleted {
            return Err(CoreError::NotFound);
        }
        Ok(json!({ "deleted": true }))
    }
}
