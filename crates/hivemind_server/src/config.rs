//! Server settings.

use std::time::Duration;

/// Runtime knobs for the HTTP surface and the services behind it.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    /// Reported in the MCP initialize handshake.
    pub server_name: String,
    pub server_version: String,

    /// Per-request deadline; store and inference calls past it fail with
    /// a busy error.
    pub deadline: Duration,

    /// Maximum accepted contribution length, in bytes of UTF-8.
    pub max_content_len: usize,

    /// Hard cap on `search_knowledge` page size.
    pub search_limit_max: u32,
    pub search_limit_default: u32,

    /// Hard cap on `list_knowledge` page size.
    pub list_limit_max: u32,
    pub list_limit_default: u32,

    /// Per-subscriber event buffer; a full buffer drops the subscriber.
    pub event_buffer: usize,

    /// Keepalive period on the event stream. Must stay under the 30 s
    /// intermediary idle-timeout contract.
    pub heartbeat: Duration,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            server_name: "hivemind".to_string(),
            server_version: env!("CARGO_PKG_VERSION").to_string(),
            deadline: Duration::from_secs(30),
            max_content_len: 16 * 1024,
            search_limit_max: 50,
            search_limit_default: 10,
            list_limit_max: 100,
            list_limit_default: 20,
            event_buffer: 128,
            heartbeat: Duration::from_secs(20),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_respect_contracts() {
        let s = ServerSettings::default();
        assert!(s.heartbeat < Duration::from_secs(30));
        assert_eq!(s.event_buffer, 128);
        assert_eq!(s.deadline, Duration::from_secs(30));
    }
}
