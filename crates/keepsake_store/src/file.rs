// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Persistent storage backend kept in a single JSON document.

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tokio::sync::Mutex;

use crate::{Error, Store};

type Document = Map<String, Value>;

/// A store that persists every key into one JSON document on disk.
///
/// The document is loaded lazily on first access and kept in memory afterwards. Every write
/// serializes the whole document into a sibling temporary file which is then renamed over the
/// original, so a crash never leaves a half-written document behind. Missing parent
/// directories are created on first write.
///
/// A document that exists but cannot be parsed is reported as an error rather than silently
/// replaced.
///
/// # Examples
///
/// ```no_run
/// use keepsake_store::{FileStore, Store};
/// use serde_json::json;
///
/// # async fn example() -> Result<(), keepsake_store::Error> {
/// let store = FileStore::new("/var/lib/my-extension/cache.json");
/// store.set("cache:greeting", json!("hello")).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    document: Mutex<Option<Document>>,
}

impl FileStore {
    /// Creates a store backed by the document at `path`.
    ///
    /// Nothing is read until the first operation.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            document: Mutex::new(None),
        }
    }

    /// Returns the location of the backing document.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self, key: &str) -> Result<Document, Error> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => match serde_json::from_slice::<Value>(&bytes) {
                Ok(Value::Object(document)) => Ok(document),
                Ok(_) => Err(Error::caused_by(key, format!("{} is not a JSON object", self.path.display()))),
                Err(e) => Err(Error::caused_by(key, e)),
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Document::new()),
            Err(e) => Err(Error::caused_by(key, e)),
        }
    }

    async fn persist(&self, key: &str, document: &Document) -> Result<(), Error> {
        let bytes = serde_json::to_vec(document).map_err(|e| Error::caused_by(key, e))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| Error::caused_by(key, e))?;
        }

        let temp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&temp_path, bytes).await.map_err(|e| Error::caused_by(key, e))?;
        tokio::fs::rename(&temp_path, &self.path).await.map_err(|e| {
            tracing::error!(path = %self.path.display(), error = %e, "failed to persist cache document");
            Error::caused_by(key, e)
        })
    }
}

impl Store for FileStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, Error> {
        let mut guard = self.document.lock().await;
        if guard.is_none() {
            *guard = Some(self.load(key).await?);
        }
        Ok(guard.as_ref().and_then(|document| document.get(key).cloned()))
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), Error> {
        let mut guard = self.document.lock().await;
        let mut document = match guard.take() {
            Some(document) => document,
            None => self.load(key).await?,
        };

        let previous = document.insert(key.to_owned(), value);
        let outcome = self.persist(key, &document).await;
        if outcome.is_err() {
            // Keep memory in line with what is on disk.
            match previous {
                Some(previous) => document.insert(key.to_owned(), previous),
                None => document.remove(key),
            };
        }
        *guard = Some(document);
        outcome
    }

    async fn remove(&self, key: &str) -> Result<(), Error> {
        let mut guard = self.document.lock().await;
        let mut document = match guard.take() {
            Some(document) => document,
            None => self.load(key).await?,
        };

        let outcome = match document.remove(key) {
            Some(previous) => {
                let outcome = self.persist(key, &document).await;
                if outcome.is_err() {
                    document.insert(key.to_owned(), previous);
                }
                outcome
            }
            None => Ok(()),
        };
        *guard = Some(document);
        outcome
    }
}
