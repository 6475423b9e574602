//! `search_knowledge`: semantic search (summary tier) or full fetch.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use hivemind_types::{Category, CoreError, SnippetId};

use crate::auth::Principal;
use crate::services::SearchRequest;
use crate::state::AppState;
use crate::tools::{parse_args, McpTool};

pub struct SearchKnowledgeTool;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SearchArgs {
    query: Option<String>,
    limit: Option<u32>,
    category: Option<Category>,
    cursor: Option<String>,
    id: Option<String>,
    #[serde(default)]
    full_content: bool,
}

#[async_trait]
impl McpTool for SearchKnowledgeTool {
    fn name(&self) -> &'static str {
        "search_knowledge"
    }

    fn description(&self) -> &'static str {
        "Search approved knowledge by semantic similarity, or fetch one snippet's full content with {id, full_content: true}."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": { "type": "string", "description": "Search text (search mode)" },
                "limit": { "type": "integer", "minimum": 1, "maximum": 50 },
                "category": {
                    "type": "string",
                    "enum": Category::ALL.iter().map(|c| c.as_str()).collect::<Vec<_>>()
                },
                "cursor": { "type": "string" },
                "id": { "type": "string", "description": "Snippet id (fetch mode)" },
                "full_content": { "type": "boolean" }
            }
        })
    }

    async fn execute(
        &self,
        principal: &Principal,
        args: Value,
        state: &AppState,
    ) -> Result<Value, CoreError> {
        let args: SearchArgs = parse_args(args)?;

        match (&args.query, &args.id) {
            (Some(_), Some(_)) => Err(CoreError::invalid_input(
                "pass either `query` or `id`, not both",
            )),
            (None, None) => Err(CoreError::invalid_input(
                "pass `query` for search or `id` with full_content for fetch",
            )),
            (Some(query), None) => {
                let response = state
                    .retrieval
                    .search(
                        principal,
                        SearchRequest {
                            query: query.clone(),
                            limit: args.limit,
                            category: args.category,
                            cursor: args.cursor,
                        },
                    )
                    .await?;
                Ok(serde_json::to_value(response)
                    .map_err(|_| CoreError::internal())?)
            }
            (None, Some(id)) => {
                if !args.full_content {
                    return Err(CoreError::invalid_input(
                        "fetch mode requires full_content: true",
                    ));
                }
                let id = SnippetId::parse(id)
                    .ok_or_else(|| CoreError::invalid_input("id must be a UUID"))?;
                let snippet = state.retrieval.fetch(principal, id).await?;
                Ok(json!({
                    "id": snippet.id,
                    "content": snippet.content,
                    "metadata": {
                        "category": snippet.category,
                        "confidence": snippet.confidence,
                        "framework": snippet.framework,
                        "language": snippet.language,
                        "tags": snippet.tags,
                        "contributor_tenant_id": snippet.tenant_id,
                        "is_public": snippet.is_public,
                        "approved_at": snippet.approved_at,
                    }
                }))
            }
        }
    }
}
