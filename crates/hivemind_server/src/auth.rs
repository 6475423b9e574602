//! Credential verification.
//!
//! Tenant and agent identity come exclusively from the verified
//! credential, never from tool arguments. The shipped authenticator is
//! a static API-key table loaded from `credentials.toml`; tokens are
//! looked up by SHA-256 digest so the plaintext table never sits in
//! memory alongside request handling.

use std::collections::HashMap;

use axum::http::HeaderMap;
use serde::Deserialize;
use sha2::{Digest, Sha256};

use hivemind_types::{AgentId, CoreError, TenantId};

/// The caller identity resolved from a credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub tenant_id: TenantId,
    pub agent_id: AgentId,
    /// Operator credentials unlock the reviewer surface.
    pub operator: bool,
}

pub trait Authenticator: Send + Sync {
    fn authenticate(&self, headers: &HeaderMap) -> Result<Principal, CoreError>;
}

/// Pull the opaque token out of `Authorization: Bearer …` or
/// `X-API-Key: …`.
pub fn extract_token(headers: &HeaderMap) -> Option<&str> {
    if let Some(value) = headers.get("authorization").and_then(|v| v.to_str().ok()) {
        let mut parts = value.splitn(2, ' ');
        if let (Some(scheme), Some(token)) = (parts.next(), parts.next()) {
            if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() {
                return Some(token.trim());
            }
        }
    }
    headers
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

#[derive(Debug, Deserialize)]
struct CredentialsFile {
    #[serde(default)]
    keys: Vec<CredentialEntry>,
}

#[derive(Debug, Deserialize)]
struct CredentialEntry {
    token: String,
    tenant_id: String,
    agent_id: String,
    #[serde(default)]
    operator: bool,
}

/// Static API-key table.
pub struct ApiKeyAuthenticator {
    by_digest: HashMap<String, Principal>,
}

impl ApiKeyAuthenticator {
    pub fn new(entries: impl IntoIterator<Item = (String, Principal)>) -> Self {
        let by_digest = entries
            .into_iter()
            .map(|(token, principal)| (digest(&token), principal))
            .collect();
        Self { by_digest }
    }

    /// Parse a `credentials.toml`:
    ///
    /// ```toml
    /// [[keys]]
    /// token = "…"
    /// tenant_id = "t1"
    /// agent_id = "a1"
    /// operator = false
    /// ```
    pub fn from_toml(raw: &str) -> Result<Self, toml::de::Error> {
        let file: CredentialsFile = toml::from_str(raw)?;
        Ok(Self::new(file.keys.into_iter().map(|entry| {
            (
                entry.token,
                Principal {
                    tenant_id: TenantId::new(entry.tenant_id),
                    agent_id: AgentId::new(entry.agent_id),
                    operator: entry.operator,
                },
            )
        })))
    }

    pub fn len(&self) -> usize {
        self.by_digest.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_digest.is_empty()
    }
}

impl Authenticator for ApiKeyAuthenticator {
    fn authenticate(&self, headers: &HeaderMap) -> Result<Principal, CoreError> {
        let token = extract_token(headers).ok_or(CoreError::Auth)?;
        self.by_digest
            .get(&digest(token))
            .cloned()
            .ok_or(CoreError::Auth)
    }
}

fn digest(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}
