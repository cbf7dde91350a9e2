// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Storage backends for the `keepsake` cache.
//!
//! This crate defines the [`Store`] trait, the asynchronous key-value boundary that the cache
//! reads and writes through, along with a few ready-made implementations:
//!
//! - [`MemoryStore`]: a process-local map, useful for tests and ephemeral caches.
//! - `FileStore`: a persistent store that keeps every key in one JSON document on disk.
//!   Available with the `fs` feature.
//! - `MockStore`: records every operation and supports failure injection. Available with
//!   the `test-util` feature.
//!
//! Keys are opaque strings and values are [`serde_json::Value`] documents. A store gives no
//! ordering guarantees beyond per-key read-after-write consistency within one process.
//!
//! # Implementing a Store
//!
//! ```
//! use std::collections::HashMap;
//! use std::sync::Mutex;
//!
//! use keepsake_store::{Error, Store};
//! use serde_json::Value;
//!
//! struct SimpleStore(Mutex<HashMap<String, Value>>);
//!
//! impl Store for SimpleStore {
//!     async fn get(&self, key: &str) -> Result<Option<Value>, Error> {
//!         Ok(self.0.lock().unwrap().get(key).cloned())
//!     }
//!
//!     async fn set(&self, key: &str, value: Value) -> Result<(), Error> {
//!         self.0.lock().unwrap().insert(key.to_owned(), value);
//!         Ok(())
//!     }
//!
//!     async fn remove(&self, key: &str) -> Result<(), Error> {
//!         self.0.lock().unwrap().remove(key);
//!         Ok(())
//!     }
//! }
//! ```

pub mod error;
#[cfg(feature = "fs")]
mod file;
mod memory;
pub(crate) mod store;
#[cfg(any(feature = "test-util", test))]
pub mod testing;

#[doc(inline)]
pub use error::{Error, Result};
#[cfg(feature = "fs")]
#[doc(inline)]
pub use file::FileStore;
#[doc(inline)]
pub use memory::MemoryStore;
#[doc(inline)]
pub use store::Store;
