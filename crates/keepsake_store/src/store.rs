// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The core trait for storage backends.

use std::sync::Arc;

use serde_json::Value;

use crate::Error;

/// Trait for asynchronous key-value storage backends.
///
/// The cache stores one JSON document per key and never inspects keys itself. All three
/// operations are required:
///
/// - `get` returns `Ok(None)` for a key that was never written or has been removed.
/// - `set` overwrites unconditionally.
/// - `remove` is idempotent and succeeds for missing keys.
pub trait Store: Send + Sync {
    /// Reads the value stored under `key`.
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<Value>, Error>> + Send;

    /// Writes `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: Value) -> impl Future<Output = Result<(), Error>> + Send;

    /// Removes the value stored under `key`, if any.
    fn remove(&self, key: &str) -> impl Future<Output = Result<(), Error>> + Send;
}

impl<S: Store> Store for Arc<S> {
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<Value>, Error>> + Send {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: Value) -> impl Future<Output = Result<(), Error>> + Send {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> impl Future<Output = Result<(), Error>> + Send {
        (**self).remove(key)
    }
}
