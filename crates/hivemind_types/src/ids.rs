//! Identifier newtypes.
//!
//! Tenant and agent identifiers are opaque strings asserted by the
//! authentication layer; they are never taken from tool arguments.
//! Snippet identifiers are generated server-side.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A unit of isolation, analogous to an organisation account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(pub String);

impl TenantId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TenantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// An agent within a tenant. Two agents are equal iff both the tenant
/// and the agent identifier match; this type only carries the latter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(pub String);

impl AgentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Optional provenance marker linking a contribution to an agent run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub String);

/// Identifier of a contribution, pending or approved. The promotion from
/// quarantine to the commons keeps the id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SnippetId(pub Uuid);

impl SnippetId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn parse(s: &str) -> Option<Self> {
        Uuid::parse_str(s).ok().map(Self)
    }
}

impl std::fmt::Display for SnippetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snippet_id_round_trips_through_display() {
        let id = SnippetId::generate();
        assert_eq!(SnippetId::parse(&id.to_string()), Some(id));
    }

    #[test]
    fn snippet_id_parse_rejects_garbage() {
        assert!(SnippetId::parse("not-a-uuid").is_none());
    }

    #[test]
    fn tenant_id_serializes_transparently() {
        let t = TenantId::new("acme");
        assert_eq!(serde_json::to_string(&t).unwrap(), "\"acme\"");
    }
}
