//! HiveMind launcher.
//!
//! `hivemind serve` runs the MCP server and event stream; `hivemind
//! review …` is the operator surface over the same database.

use anyhow::Result;
use clap::{Parser, Subcommand};

use hivemind_logging::{init_logging, LogConfig};

mod cli;

#[derive(Parser, Debug)]
#[command(name = "hivemind", about = "A reviewed knowledge commons for AI agents")]
struct Cli {
    /// Verbose logging to stderr
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the MCP server and real-time event stream
    Serve(cli::serve::ServeArgs),

    /// Reviewer operations on the quarantine queue
    #[command(subcommand)]
    Review(cli::review::ReviewCommand),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let _log_guard = init_logging(LogConfig {
        app_name: "hivemind",
        verbose: cli.verbose,
    })?;

    match cli.command {
        Commands::Serve(args) => cli::serve::run(args).await,
        Commands::Review(cmd) => cli::review::run(cmd).await,
    }
}
