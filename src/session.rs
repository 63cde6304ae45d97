//! In-memory store of OAuth tokens keyed by the session's state value.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// OAuth credential set for one session, as returned by the token endpoint.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct TokenRecord {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default)]
    pub expires_in: u64,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: String,
}

fn default_token_type() -> String {
    "Bearer".into()
}

/// Session-scoped token cache. Nothing expires on its own: stale tokens are
/// only noticed when a call made with them fails.
#[derive(Default)]
pub struct TokenCache {
    tokens: RwLock<HashMap<String, TokenRecord>>,
}

impl TokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the record stored under `key`.
    pub async fn put(&self, key: &str, record: TokenRecord) {
        self.tokens.write().await.insert(key.to_string(), record);
    }

    pub async fn get(&self, key: &str) -> Option<TokenRecord> {
        self.tokens.read().await.get(key).cloned()
    }

    /// Deletes the record under `key`; absent keys are ignored.
    pub async fn remove(&self, key: &str) -> bool {
        self.tokens.write().await.remove(key).is_some()
    }

    /// Number of live sessions.
    pub async fn len(&self) -> usize {
        self.tokens.read().await.len()
    }
}

#[cfg(test)]
pub(crate) fn record(access: &str, refresh: Option<&str>) -> TokenRecord {
    TokenRecord {
        access_token: access.into(),
        token_type: "Bearer".into(),
        expires_in: 3600,
        refresh_token: refresh.map(Into::into),
        scope: "playlist-modify-public".into(),
    }
}
