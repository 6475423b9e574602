//! Shared logging utilities for HiveMind binaries.

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const DEFAULT_LOG_FILTER: &str =
    "hivemind=info,hivemind_server=info,hivemind_db=info,hivemind_embed=info";

/// Logging configuration shared by HiveMind binaries.
pub struct LogConfig<'a> {
    pub app_name: &'a str,
    pub verbose: bool,
}

/// Initialize tracing with a daily-rolling file writer and stderr output.
///
/// The returned guard must be kept alive for the process lifetime; log
/// lines buffered by the non-blocking writer are flushed when it drops.
pub fn init_logging(config: LogConfig<'_>) -> Result<WorkerGuard> {
    let log_dir = ensure_logs_dir().context("Failed to ensure log directory")?;
    let file_appender = tracing_appender::rolling::daily(log_dir, format!("{}.log", config.app_name));
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let file_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let console_filter = if config.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false)
                .with_filter(file_filter),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(console_filter),
        )
        .init();

    Ok(guard)
}

/// Get the HiveMind home directory: ~/.hivemind (override: HIVEMIND_HOME)
pub fn hivemind_home() -> PathBuf {
    if let Ok(override_path) = std::env::var("HIVEMIND_HOME") {
        return PathBuf::from(override_path);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".hivemind")
}

/// Get the logs directory: ~/.hivemind/logs
pub fn logs_dir() -> PathBuf {
    hivemind_home().join("logs")
}

/// Ensure the logs directory exists.
pub fn ensure_logs_dir() -> Result<PathBuf> {
    let logs = logs_dir();
    fs::create_dir_all(&logs)
        .with_context(|| format!("Failed to create logs directory: {}", logs.display()))?;
    Ok(logs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn home_override_is_honoured() {
        // Serialise against other env-touching tests by scoping the var.
        std::env::set_var("HIVEMIND_HOME", "/tmp/hivemind-test-home");
        assert_eq!(hivemind_home(), PathBuf::from("/tmp/hivemind-test-home"));
        std::env::remove_var("HIVEMIND_HOME");
    }
}
