//! `add_knowledge`: contribute a snippet to the commons.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use hivemind_types::{Category, CoreError, NewContribution, RunId};

use crate::auth::Principal;
use crate::state::AppState;
use crate::tools::{parse_args, McpTool};

pub struct AddKnowledgeTool;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct AddArgs {
    content: String,
    category: Category,
    confidence: f64,
    framework: Option<String>,
    language: Option<String>,
    tags: Option<Vec<String>>,
    run_id: Option<String>,
}

#[async_trait]
impl McpTool for AddKnowledgeTool {
    fn name(&self) -> &'static str {
        "add_knowledge"
    }

    fn description(&self) -> &'static str {
        "Contribute a knowledge snippet. Content is sanitised and queued for human review before it becomes searchable."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "content": { "type": "string", "description": "The knowledge to share" },
                "category": {
                    "type": "string",
                    "enum": Category::ALL.iter().map(|c| c.as_str()).collect::<Vec<_>>()
                },
                "confidence": { "type": "number", "minimum": 0, "maximum": 1 },
                "framework": { "type": "string" },
                "language": { "type": "string" },
                "tags": { "type": "array", "items": { "type": "string" } },
                "run_id": { "type": "string" }
            },
            "required": ["content", "category", "confidence"]
        })
    }

    async fn execute(
        &self,
        principal: &Principal,
        args: Value,
        state: &AppState,
    ) -> Result<Value, CoreError> {
        let args: AddArgs = parse_args(args)?;
        let receipt = state
            .ingest
            .submit(
                principal,
                NewContribution {
                    content: args.content,
                    category: args.category,
                    confidence: args.confidence,
                    framework: args.framework,
                    language: args.language,
                    tags: args.tags.unwrap_or_default(),
                    run_id: args.run_id.map(RunId),
                },
            )
            .await?;

        Ok(json!({
            "contribution_id": receipt.contribution_id,
            "status": receipt.status,
            "category": receipt.category,
            "message": "Contribution queued for review. It becomes searchable once approved."
        }))
    }
}
