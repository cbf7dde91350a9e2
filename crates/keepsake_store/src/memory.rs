// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Process-local storage backend.

use std::{collections::HashMap, sync::Arc};

use parking_lot::Mutex;
use serde_json::Value;

use crate::{Error, Store};

/// A store that keeps values in a process-local map.
///
/// Nothing survives the process, which makes this store a good fit for tests and for caches
/// that only need to live as long as the program. Clones share the same map.
///
/// # Examples
///
/// ```
/// use keepsake_store::{MemoryStore, Store};
/// use serde_json::json;
/// # futures::executor::block_on(async {
///
/// let store = MemoryStore::new();
/// store.set("cache:greeting", json!("hello")).await?;
/// assert_eq!(store.get("cache:greeting").await?, Some(json!("hello")));
/// # Ok::<(), keepsake_store::Error>(())
/// # });
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, Value>>>,
}

impl MemoryStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns `true` if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Returns the stored keys in sorted order.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.lock().keys().cloned().collect();
        keys.sort_unstable();
        keys
    }
}

impl Store for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, Error> {
        Ok(self.entries.lock().get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), Error> {
        self.entries.lock().insert(key.to_owned(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), Error> {
        self.entries.lock().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use futures::executor::block_on;
    use serde_json::json;

    use super::*;

    #[test]
    fn get_missing_returns_none() {
        let store = MemoryStore::new();
        assert_eq!(block_on(store.get("cache:missing")).unwrap(), None);
    }

    #[test]
    fn set_overwrites_previous_value() {
        block_on(async {
            let store = MemoryStore::new();
            store.set("cache:k", json!(1)).await.unwrap();
            store.set("cache:k", json!(2)).await.unwrap();

            assert_eq!(store.get("cache:k").await.unwrap(), Some(json!(2)));
            assert_eq!(store.len(), 1);
        });
    }

    #[test]
    fn remove_is_idempotent() {
        block_on(async {
            let store = MemoryStore::new();
            store.set("cache:k", json!("v")).await.unwrap();

            store.remove("cache:k").await.unwrap();
            store.remove("cache:k").await.unwrap();

            assert!(store.is_empty());
        });
    }

    #[test]
    fn clones_share_entries() {
        block_on(async {
            let store = MemoryStore::new();
            let clone = store.clone();
            clone.set("cache:b", json!(true)).await.unwrap();
            clone.set("cache:a", json!(false)).await.unwrap();

            assert_eq!(store.keys(), vec!["cache:a".to_string(), "cache:b".to_string()]);
        });
    }
}
