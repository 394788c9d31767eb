//! Script persistence with upload deduplication.
//!
//! The session runtime never touches this; it exists so re-uploading the same
//! sides does not create a new entry per attempt. Uniqueness is on
//! `(user_uid, script_hash)`, with the hash computed over the cleaned script
//! text. The trait is the interface boundary; a SQL backend can slot in later
//! without the handlers changing.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use thiserror::Error;
use xxhash_rust::xxh3::xxh3_128;

/// Errors that can occur during store operations.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// A stored, deduplicated script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredScript {
    pub user_uid: String,
    pub script_hash: String,
    pub text: String,
    pub characters: Vec<String>,
}

/// Hash key for dedup: xxh3-128 of the cleaned script text, hex-encoded.
pub fn script_hash(text: &str) -> String {
    format!("{:032x}", xxh3_128(text.as_bytes()))
}

/// Trait defining the script persistence boundary.
#[async_trait]
pub trait ScriptStore: Send + Sync {
    /// Stores a script for a user unless an identical one already exists.
    /// Returns the stored entry and whether it was deduplicated.
    async fn upsert(
        &self,
        user_uid: &str,
        text: &str,
        characters: Vec<String>,
    ) -> StoreResult<(StoredScript, bool)>;

    /// Looks up a script by its dedup key.
    async fn get(&self, user_uid: &str, script_hash: &str) -> StoreResult<Option<StoredScript>>;
}

/// In-memory store backend.
#[derive(Default)]
pub struct MemoryScriptStore {
    entries: RwLock<HashMap<(String, String), StoredScript>>,
}

impl MemoryScriptStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ScriptStore for MemoryScriptStore {
    async fn upsert(
        &self,
        user_uid: &str,
        text: &str,
        characters: Vec<String>,
    ) -> StoreResult<(StoredScript, bool)> {
        let hash = script_hash(text);
        let key = (user_uid.to_string(), hash.clone());

        let mut entries = self.entries.write();
        if let Some(existing) = entries.get(&key) {
            return Ok((existing.clone(), true));
        }

        let stored = StoredScript {
            user_uid: user_uid.to_string(),
            script_hash: hash,
            text: text.to_string(),
            characters,
        };
        entries.insert(key, stored.clone());
        Ok((stored, false))
    }

    async fn get(&self, user_uid: &str, script_hash: &str) -> StoreResult<Option<StoredScript>> {
        let key = (user_uid.to_string(), script_hash.to_string());
        Ok(self.entries.read().get(&key).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upsert_then_get() {
        let store = MemoryScriptStore::new();
        let (stored, deduplicated) = store
            .upsert("user-1", "JACK: Hello", vec!["JACK".to_string()])
            .await
            .unwrap();
        assert!(!deduplicated);
        assert_eq!(stored.characters, vec!["JACK"]);

        let fetched = store.get("user-1", &stored.script_hash).await.unwrap();
        assert_eq!(fetched, Some(stored));
    }

    #[tokio::test]
    async fn test_identical_upload_is_deduplicated() {
        let store = MemoryScriptStore::new();
        let (first, _) = store
            .upsert("user-1", "JACK: Hello", vec!["JACK".to_string()])
            .await
            .unwrap();
        let (second, deduplicated) = store
            .upsert("user-1", "JACK: Hello", vec!["JACK".to_string()])
            .await
            .unwrap();
        assert!(deduplicated);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_dedup_is_scoped_per_user() {
        let store = MemoryScriptStore::new();
        let (_, _) = store
            .upsert("user-1", "JACK: Hello", vec![])
            .await
            .unwrap();
        let (_, deduplicated) = store
            .upsert("user-2", "JACK: Hello", vec![])
            .await
            .unwrap();
        assert!(!deduplicated);
    }

    #[test]
    fn test_script_hash_is_stable_and_content_sensitive() {
        assert_eq!(script_hash("JACK: Hello"), script_hash("JACK: Hello"));
        assert_ne!(script_hash("JACK: Hello"), script_hash("JACK: Hello!"));
    }
}
