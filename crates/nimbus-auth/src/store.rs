//! In-memory API key store.
//!
//! Keeps both directions (client → key and key → client) under one lock so
//! issue, verify and revoke are atomic with respect to each other. Nothing is
//! persisted; keys are lost on restart.

use std::collections::HashMap;

use parking_lot::RwLock;

#[derive(Default)]
struct KeyMaps {
    by_client: HashMap<String, String>,
    by_key: HashMap<String, String>,
}

/// Store of issued API keys, one active key per client.
#[derive(Default)]
pub struct ApiKeyStore {
    inner: RwLock<KeyMaps>,
}

impl std::fmt::Debug for ApiKeyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKeyStore")
            .field("clients", &self.len())
            .finish_non_exhaustive()
    }
}

impl ApiKeyStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `key` to `client_id`, replacing the client's previous key.
    ///
    /// Returns the replaced key, which no longer verifies.
    pub fn insert(&self, client_id: &str, key: String) -> Option<String> {
        let mut maps = self.inner.write();
        let previous = maps.by_client.insert(client_id.to_owned(), key.clone());
        if let Some(old) = &previous {
            let _ = maps.by_key.remove(old);
        }
        let _ = maps.by_key.insert(key, client_id.to_owned());
        previous
    }

    /// Client owning `key`, if any.
    pub fn client_for(&self, key: &str) -> Option<String> {
        self.inner.read().by_key.get(key).cloned()
    }

    /// Remove the client's key. Returns the removed key.
    pub fn remove(&self, client_id: &str) -> Option<String> {
        let mut maps = self.inner.write();
        let key = maps.by_client.remove(client_id)?;
        let _ = maps.by_key.remove(&key);
        Some(key)
    }

    /// Number of clients holding a key.
    pub fn len(&self) -> usize {
        self.inner.read().by_client.len()
    }

    /// Whether no keys are issued.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
