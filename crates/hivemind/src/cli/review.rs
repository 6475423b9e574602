//! `hivemind review`: operator surface over the quarantine queue.
//!
//! Runs against the database directly with operator credentials; the
//! HTTP surface never exposes these operations.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Subcommand;
use comfy_table::Table;

use hivemind_db::{DbConfig, KnowledgeStore, PgStore};
use hivemind_server::services::prescreen::quality_index;
use hivemind_server::services::{
    ApprovalRequest, ApprovalService, PrescreenService, ReviewerService,
};
use hivemind_types::{Category, SnippetId, TenantId};

use crate::cli::{build_embedder, config};

#[derive(Subcommand, Debug)]
pub enum ReviewCommand {
    /// Claim and display the next pending batch for a tenant
    Queue {
        #[arg(long)]
        tenant: String,
        #[arg(long, default_value_t = 10)]
        limit: u32,
        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Promote a pending contribution into the commons
    Approve {
        id: String,
        /// Publish into the cross-tenant public commons
        #[arg(long)]
        public: bool,
        /// Override the agent-suggested category
        #[arg(long)]
        category: Option<String>,
    },
    /// Discard a pending contribution
    Reject { id: String },
    /// Mark a pending contribution sensitive; it stays queued
    Flag { id: String },
    /// Quality badge and near-duplicates for one pending contribution
    Prescreen {
        id: String,
        #[arg(long)]
        json: bool,
    },
    /// Aggregate counters for a tenant
    Stats {
        #[arg(long)]
        tenant: String,
        #[arg(long)]
        json: bool,
    },
}

struct Core {
    approval: ApprovalService,
    prescreen: PrescreenService,
    reviewer: ReviewerService,
}

async fn open_core() -> Result<Core> {
    let config = config::load()?;
    let embedder = build_embedder(config.embed_queue_depth)?;
    let store = PgStore::connect(
        &DbConfig::new(config.database_url.clone()),
        embedder.dimensions() as u32,
    )
    .await
    .context("database connection failed")?;
    let store: Arc<dyn KnowledgeStore> = Arc::new(store);

    hivemind_server::verify_deployment_identity(store.as_ref(), embedder.as_ref())
        .await
        .context("deployment identity check failed")?;

    Ok(Core {
        approval: ApprovalService::new(store.clone(), embedder.clone()),
        prescreen: PrescreenService::new(store.clone(), embedder),
        reviewer: ReviewerService::new(store),
    })
}

fn parse_id(raw: &str) -> Result<SnippetId> {
    SnippetId::parse(raw).with_context(|| format!("`{raw}` is not a valid contribution id"))
}

pub async fn run(cmd: ReviewCommand) -> Result<()> {
    match cmd {
        ReviewCommand::Queue {
            tenant,
            limit,
            json,
        } => {
            let core = open_core().await?;
            let tenant = TenantId::new(tenant);
            let batch = core.reviewer.fetch_next_pending(&tenant, limit).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(batch.rows())?);
                return Ok(());
            }

            if batch.rows().is_empty() {
                println!("queue is empty for tenant {tenant}");
                return Ok(());
            }

            let mut table = Table::new();
            table.set_header(["id", "submitted", "category", "quality", "flags", "title"]);
            for row in batch.rows() {
                let quality = quality_index(row);
                table.add_row([
                    row.id.to_string(),
                    row.submitted_at.format("%Y-%m-%d %H:%M").to_string(),
                    row.category.to_string(),
                    format!("{} ({:?})", quality.score, quality.badge),
                    if row.sensitive_flag {
                        "sensitive".to_string()
                    } else {
                        String::new()
                    },
                    row.title(),
                ]);
            }
            println!("{table}");
            println!(
                "{} pending. Decide with `hivemind review approve|reject|flag <id>`.",
                batch.rows().len()
            );
            // The claim is released when this process exits; decisions
            // run through the by-id path.
            Ok(())
        }
        ReviewCommand::Approve {
            id,
            public,
            category,
        } => {
            let core = open_core().await?;
            let id = parse_id(&id)?;
            let category_override = match category {
                Some(raw) => Some(
                    Category::parse(&raw)
                        .with_context(|| format!("unknown category `{raw}`"))?,
                ),
                None => None,
            };
            let event = core
                .approval
                .approve(
                    id,
                    ApprovalRequest {
                        is_public: public,
                        category_override,
                    },
                )
                .await?;
            println!(
                "approved {} ({}): {}",
                event.id,
                if event.is_public { "public" } else { "private" },
                event.title
            );
            Ok(())
        }
        ReviewCommand::Reject { id } => {
            let core = open_core().await?;
            let id = parse_id(&id)?;
            core.approval.reject(id).await?;
            println!("rejected {id}");
            Ok(())
        }
        ReviewCommand::Flag { id } => {
            let core = open_core().await?;
            let id = parse_id(&id)?;
            core.approval.flag_sensitive(id).await?;
            println!("flagged {id} as sensitive; it remains in quarantine");
            Ok(())
        }
        ReviewCommand::Prescreen { id, json } => {
            let core = open_core().await?;
            let id = parse_id(&id)?;
            let report = core.prescreen.prescreen(id).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
                return Ok(());
            }

            println!(
                "quality: {} ({:?})",
                report.quality.score, report.quality.badge
            );
            if report.similar.is_empty() {
                println!("no similar approved snippets within 65% similarity");
            } else {
                let mut table = Table::new();
                table.set_header(["similarity", "id", "tenant", "category", "title", ""]);
                for entry in &report.similar {
                    table.add_row([
                        format!("{:.0}%", entry.similarity_percent),
                        entry.id.to_string(),
                        entry.tenant_id.to_string(),
                        entry.category.to_string(),
                        entry.title.clone(),
                        if entry.likely_duplicate {
                            "likely duplicate".to_string()
                        } else {
                            String::new()
                        },
                    ]);
                }
                println!("{table}");
            }
            Ok(())
        }
        ReviewCommand::Stats { tenant, json } => {
            let core = open_core().await?;
            let tenant = TenantId::new(tenant);
            let stats = core.reviewer.stats(&tenant).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
                return Ok(());
            }

            println!("tenant {tenant}");
            println!("  pending:        {}", stats.pending);
            println!("  approved:       {}", stats.approved);
            println!("  public:         {}", stats.public);
            println!("  retrievals:     {}", stats.total_retrievals);
            println!(
                "  helpful ratio:  {} / {}",
                stats.helpful,
                stats.helpful + stats.not_helpful
            );
            if !stats.by_agent.is_empty() {
                println!("  top contributors:");
                for entry in stats.by_agent.iter().take(10) {
                    println!("    {:<24} {}", entry.agent_id, entry.approved);
                }
            }
            Ok(())
        }
    }
}
