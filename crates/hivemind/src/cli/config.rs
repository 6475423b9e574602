//! Configuration paths and file loading.
//!
//! Everything lives under the HiveMind home (`~/.hivemind`, override
//! `HIVEMIND_HOME`): `config.toml`, `credentials.toml`, and logs. The
//! database URL and bind address can also come from the environment,
//! which wins over the file.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use hivemind_logging::hivemind_home;
use hivemind_server::ServerSettings;

const DEFAULT_BIND: &str = "127.0.0.1:8787";
const DEFAULT_EMBED_QUEUE_DEPTH: usize = 64;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    bind: Option<String>,
    database_url: Option<String>,
    credentials_path: Option<PathBuf>,
    max_content_len: Option<usize>,
    deadline_secs: Option<u64>,
    event_buffer: Option<usize>,
    heartbeat_secs: Option<u64>,
    embed_queue_depth: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind: String,
    pub database_url: String,
    pub credentials_path: PathBuf,
    pub embed_queue_depth: usize,
    pub settings: ServerSettings,
}

pub fn config_file_path() -> PathBuf {
    hivemind_home().join("config.toml")
}

pub fn default_credentials_path() -> PathBuf {
    hivemind_home().join("credentials.toml")
}

/// Load `config.toml` (if present) and apply environment overrides.
pub fn load() -> Result<Config> {
    let path = config_file_path();
    let file: FileConfig = if path.exists() {
        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("invalid config at {}", path.display()))?
    } else {
        FileConfig::default()
    };

    let database_url = std::env::var("HIVEMIND_DATABASE_URL")
        .ok()
        .or(file.database_url)
        .context("no database configured: set HIVEMIND_DATABASE_URL or `database_url` in config.toml")?;

    let bind = std::env::var("HIVEMIND_BIND")
        .ok()
        .or(file.bind)
        .unwrap_or_else(|| DEFAULT_BIND.to_string());

    let mut settings = ServerSettings::default();
    if let Some(len) = file.max_content_len {
        settings.max_content_len = len;
    }
    if let Some(secs) = file.deadline_secs {
        settings.deadline = Duration::from_secs(secs);
    }
    if let Some(buffer) = file.event_buffer {
        settings.event_buffer = buffer;
    }
    if let Some(secs) = file.heartbeat_secs {
        settings.heartbeat = Duration::from_secs(secs);
    }

    Ok(Config {
        bind,
        database_url,
        credentials_path: file
            .credentials_path
            .unwrap_or_else(default_credentials_path),
        embed_queue_depth: file.embed_queue_depth.unwrap_or(DEFAULT_EMBED_QUEUE_DEPTH),
        settings,
    })
}
