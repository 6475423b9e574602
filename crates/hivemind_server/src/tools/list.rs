//! `list_knowledge`: the caller's own contributions, pending and
//! approved, newest state change first.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use hivemind_db::ListingStatus;
use hivemind_types::{decode_cursor, encode_cursor, CoreError};

use crate::auth::Principal;
use crate::state::AppState;
use crate::tools::{parse_args, McpTool};

pub struct ListKnowledgeTool;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ListArgs {
    cursor: Option<String>,
    limit: Option<u32>,
}

#[async_trait]
impl McpTool for ListKnowledgeTool {
    fn name(&self) -> &'static str {
        "list_knowledge"
    }

    fn description(&self) -> &'static str {
        "List your own contributions: quarantined ones still awaiting review and approved ones."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "cursor": { "type": "string" },
                "limit": { "type": "integer", "minimum": 1, "maximum": 100 }
            }
        })
    }

    async fn execute(
        &self,
        principal: &Principal,
        args: Value,
        state: &AppState,
    ) -> Result<Value, CoreError> {
        let args: ListArgs = parse_args(args)?;
        let limit = match args.limit {
            Some(0) => return Err(CoreError::invalid_input("limit must be positive")),
            Some(n) if n > state.settings.list_limit_max => {
                return Err(CoreError::invalid_input(format!(
                    "limit must be at most {}",
                    state.settings.list_limit_max
                )))
            }
            Some(n) => n,
            None => state.settings.list_limit_default,
        };
        let offset = match &args.cursor {
            Some(cursor) => decode_cursor(cursor)?,
            None => 0,
        };

        let listings = state
            .store
            .list_by_agent(&principal.tenant_id, &principal.agent_id, offset, limit)
            .await
            .map_err(crate::services::map_db_error)?;

        let items: Vec<Value> = listings
            .iter()
            .map(|entry| {
                let mut item = json!({
                    "id": entry.id,
                    "status": entry.status,
                    "category": entry.category,
                    "title": entry.title,
                });
                let key = match entry.status {
                    ListingStatus::Pending => "submitted_at",
                    ListingStatus::Approved => "approved_at",
                };
                item[key] = json!(entry.timestamp);
                item
            })
            .collect();

        let next_cursor = if items.len() as u32 == limit {
            Some(encode_cursor(offset + items.len() as u64))
        } else {
            None
        };

        let mut out = json!({ "items": items });
        if let Some(cursor) = next_cursor {
            out["next_cursor"] = json!(cursor);
        }
        Ok(out)
    }
}
