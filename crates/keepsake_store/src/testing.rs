// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Mock store implementation for testing.
//!
//! This module provides `MockStore`, an in-memory store that records all operations and
//! supports failure injection for testing error paths.

use std::{collections::HashMap, sync::Arc};

use parking_lot::Mutex;
use serde_json::Value;

use crate::{Error, Store};

/// Recorded store operation with full context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOp {
    /// A get operation was performed with the given key.
    Get(String),
    /// A set operation was performed with the given key and value.
    Set {
        /// The key that was written.
        key: String,
        /// The value that was written.
        value: Value,
    },
    /// A remove operation was performed with the given key.
    Remove(String),
}

impl StoreOp {
    /// Returns the key this operation addressed.
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Self::Get(key) | Self::Remove(key) | Self::Set { key, .. } => key,
        }
    }

    /// Returns `true` for operations that change stored state.
    #[must_use]
    pub fn is_write(&self) -> bool {
        matches!(self, Self::Set { .. } | Self::Remove(_))
    }
}

type FailPredicate = Box<dyn Fn(&StoreOp) -> bool + Send + Sync>;

/// A configurable mock store for testing.
///
/// Values are kept in memory; every operation is recorded for later verification and can
/// be made to fail on demand. Clones share data, history and failure configuration.
///
/// # Examples
///
/// ```
/// use keepsake_store::{testing::{MockStore, StoreOp}, Store};
/// use serde_json::json;
/// # futures::executor::block_on(async {
///
/// let store = MockStore::new();
/// store.set("cache:k", json!(42)).await?;
/// assert_eq!(store.get("cache:k").await?, Some(json!(42)));
///
/// assert_eq!(store.operations(), vec![
///     StoreOp::Set { key: "cache:k".to_string(), value: json!(42) },
///     StoreOp::Get("cache:k".to_string()),
/// ]);
/// # Ok::<(), keepsake_store::Error>(())
/// # });
/// ```
///
/// # Failure Injection
///
/// ```
/// use keepsake_store::{testing::{MockStore, StoreOp}, Store};
/// # futures::executor::block_on(async {
///
/// let store = MockStore::new();
/// store.fail_when(|op| matches!(op, StoreOp::Get(k) if k == "cache:forbidden"));
///
/// assert!(store.get("cache:forbidden").await.is_err());
/// assert!(store.get("cache:allowed").await.is_ok());
/// # });
/// ```
#[derive(Clone, Default)]
pub struct MockStore {
    data: Arc<Mutex<HashMap<String, Value>>>,
    operations: Arc<Mutex<Vec<StoreOp>>>,
    fail_when: Arc<Mutex<Option<FailPredicate>>>,
}

impl std::fmt::Debug for MockStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockStore")
            .field("data", &self.data)
            .field("operations", &self.operations)
            .field("fail_when", &self.fail_when.lock().is_some())
            .finish()
    }
}

impl MockStore {
    /// Creates a new empty mock store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a mock store with pre-populated data.
    #[must_use]
    pub fn with_data(data: HashMap<String, Value>) -> Self {
        Self {
            data: Arc::new(Mutex::new(data)),
            ..Self::default()
        }
    }

    /// Returns the raw value stored under `key`, bypassing operation recording.
    #[must_use]
    pub fn peek(&self, key: &str) -> Option<Value> {
        self.data.lock().get(key).cloned()
    }

    /// Writes a raw value, bypassing operation recording and failure injection.
    pub fn seed(&self, key: impl Into<String>, value: Value) {
        self.data.lock().insert(key.into(), value);
    }

    /// Returns the number of stored keys.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.data.lock().len()
    }

    /// Sets a predicate that determines when operations should fail.
    ///
    /// The predicate receives the operation and returns `true` if it should fail. Failed
    /// operations are still recorded but leave the stored data untouched.
    pub fn fail_when<F>(&self, predicate: F)
    where
        F: Fn(&StoreOp) -> bool + Send + Sync + 'static,
    {
        *self.fail_when.lock() = Some(Box::new(predicate));
    }

    /// Clears the failure predicate, allowing all operations to succeed.
    pub fn clear_failures(&self) {
        *self.fail_when.lock() = None;
    }

    /// Returns a clone of all recorded operations.
    #[must_use]
    pub fn operations(&self) -> Vec<StoreOp> {
        self.operations.lock().clone()
    }

    /// Returns the recorded operations that changed stored state.
    #[must_use]
    pub fn writes(&self) -> Vec<StoreOp> {
        self.operations.lock().iter().filter(|op| op.is_write()).cloned().collect()
    }

    /// Clears all recorded operations.
    pub fn clear_operations(&self) {
        self.operations.lock().clear();
    }

    fn record(&self, op: StoreOp) -> Result<(), Error> {
        let failed = self.fail_when.lock().as_ref().is_some_and(|predicate| predicate(&op));
        let key = op.key().to_owned();
        self.operations.lock().push(op);
        if failed {
            return Err(Error::caused_by(key, "mock: operation failed"));
        }
        Ok(())
    }
}

impl Store for MockStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, Error> {
        self.record(StoreOp::Get(key.to_owned()))?;
        Ok(self.data.lock().get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), Error> {
        self.record(StoreOp::Set {
            key: key.to_owned(),
            value: value.clone(),
        })?;
        self.data.lock().insert(key.to_owned(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), Error> {
        self.record(StoreOp::Remove(key.to_owned()))?;
        self.data.lock().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use futures::executor::block_on;
    use serde_json::json;

    use super::*;

    #[test]
    fn failed_set_leaves_data_untouched() {
        block_on(async {
            let store = MockStore::new();
            store.seed("cache:k", json!("old"));
            store.fail_when(StoreOp::is_write);

            let error = store.set("cache:k", json!("new")).await.unwrap_err();
            assert_eq!(error.key(), "cache:k");
            assert_eq!(store.peek("cache:k"), Some(json!("old")));
            assert_eq!(store.writes().len(), 1);
        });
    }

    #[test]
    fn clear_failures_restores_operations() {
        block_on(async {
            let store = MockStore::new();
            store.fail_when(|_| true);
            assert!(store.remove("cache:k").await.is_err());

            store.clear_failures();
            assert!(store.remove("cache:k").await.is_ok());
        });
    }

    #[test]
    fn seed_and_peek_are_not_recorded() {
        let store = MockStore::new();
        store.seed("cache:k", json!(1));
        assert_eq!(store.peek("cache:k"), Some(json!(1)));
        assert!(store.operations().is_empty());
    }

    #[test]
    fn with_data_prepopulates() {
        let store = MockStore::with_data(HashMap::from([("cache:a".to_string(), json!(1))]));
        assert_eq!(store.entry_count(), 1);
    }

    #[test]
    fn clear_operations_resets_history() {
        block_on(async {
            let store = MockStore::new();
            store.get("cache:k").await.unwrap();
            store.clear_operations();
            assert!(store.operations().is_empty());
        });
    }

    #[test]
    fn debug_reports_predicate_presence() {
        let store = MockStore::new();
        store.fail_when(|_| false);
        assert!(format!("{store:?}").contains("fail_when: true"));
    }
}
