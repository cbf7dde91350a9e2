// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Typed access to a single storage key.

use std::{fmt, marker::PhantomData, sync::Arc, time::Duration};

use keepsake_store::Store;
use serde::{Serialize, de::DeserializeOwned, de::IgnoredAny};

use crate::{
    CacheRecord, Error, Expiry,
    cache::CacheCore,
    record::unix_millis,
    telemetry::{CacheActivity, CacheOperation},
};

/// A handle to one cache entry.
///
/// Obtained from [`Cache::item`](crate::Cache::item). The handle owns the resolved storage key
/// (`cache:<key>`) and touches nothing else in the store.
///
/// Reads never return a record whose hard expiry has passed, and they do not distinguish a key
/// that was never written from one that expired or holds something that is not a record.
///
/// # Examples
///
/// ```
/// use keepsake::{Cache, Expiry, Period};
/// use tick::Clock;
/// # futures::executor::block_on(async {
///
/// let cache = Cache::builder(Clock::new_frozen()).memory().build();
/// let item = cache.item::<u32>("answer");
///
/// item.set(Some(42), &Expiry::new(Period::days(10))).await?;
/// assert_eq!(item.get().await?, Some(42));
///
/// item.set(None, &Expiry::default()).await?;
/// assert!(!item.has().await?);
/// # Ok::<(), keepsake::Error>(())
/// # });
/// ```
pub struct CacheItem<V, S> {
    key: String,
    core: Arc<CacheCore<S>>,
    _value: PhantomData<fn() -> V>,
}

impl<V, S> CacheItem<V, S>
where
    S: Store,
{
    pub(crate) const fn new(key: String, core: Arc<CacheCore<S>>) -> Self {
        Self {
            key,
            core,
            _value: PhantomData,
        }
    }

    /// Returns the storage key of this entry.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns the stored record as is, including an expired one.
    ///
    /// A stored value that is not shaped like a record reads as `None`.
    ///
    /// # Errors
    ///
    /// Returns a [`Storage`](crate::ErrorKind::Storage) error if the store fails.
    pub async fn record(&self) -> Result<Option<CacheRecord<V>>, Error>
    where
        V: DeserializeOwned,
    {
        self.load(CacheOperation::Get).await
    }

    /// Returns the value if a live record exists.
    ///
    /// # Errors
    ///
    /// Returns a [`Storage`](crate::ErrorKind::Storage) error if the store fails. A missing key
    /// is not an error.
    pub async fn get(&self) -> Result<Option<V>, Error>
    where
        V: DeserializeOwned,
    {
        let record = self.load::<V>(CacheOperation::Get).await?;
        Ok(self.live(record, CacheOperation::Get).map(|record| record.data))
    }

    /// Returns `true` if a live record exists.
    ///
    /// The stored value is not decoded, only the record's shape and expiry are checked.
    ///
    /// # Errors
    ///
    /// Returns a [`Storage`](crate::ErrorKind::Storage) error if the store fails.
    pub async fn has(&self) -> Result<bool, Error> {
        let record = self.load::<IgnoredAny>(CacheOperation::Has).await?;
        Ok(self.live(record, CacheOperation::Has).is_some())
    }

    /// Writes `value` with a hard expiry computed from `expiry`, or deletes the entry when
    /// `value` is `None`.
    ///
    /// The previous record is overwritten without being read.
    ///
    /// # Errors
    ///
    /// Returns an [`Argument`](crate::ErrorKind::Argument) error without touching the store if
    /// the value cannot be represented as JSON, or a [`Storage`](crate::ErrorKind::Storage)
    /// error if the store fails.
    pub async fn set(&self, value: Option<V>, expiry: &Expiry) -> Result<(), Error>
    where
        V: Serialize,
    {
        match value {
            Some(value) => self.put(&value, expiry, CacheOperation::Set, None).await,
            None => self.delete().await,
        }
    }

    /// Removes the entry. Removing a missing entry succeeds.
    ///
    /// # Errors
    ///
    /// Returns a [`Storage`](crate::ErrorKind::Storage) error if the store fails.
    pub async fn delete(&self) -> Result<(), Error> {
        self.core
            .store
            .remove(&self.key)
            .await
            .map_err(|e| self.storage_failure(CacheOperation::Delete, e))?;
        self.core
            .telemetry
            .record(&self.key, CacheOperation::Delete, CacheActivity::Deleted, None);
        Ok(())
    }

    pub(crate) async fn load<T>(&self, operation: CacheOperation) -> Result<Option<CacheRecord<T>>, Error>
    where
        T: DeserializeOwned,
    {
        let stored = self
            .core
            .store
            .get(&self.key)
            .await
            .map_err(|e| self.storage_failure(operation, e))?;

        let Some(stored) = stored else {
            return Ok(None);
        };

        let record = CacheRecord::decode(stored);
        if record.is_none() {
            self.core
                .telemetry
                .record(&self.key, operation, CacheActivity::Malformed, None);
        }
        Ok(record)
    }

    pub(crate) async fn put(&self, value: &V, expiry: &Expiry, operation: CacheOperation, elapsed: Option<Duration>) -> Result<(), Error>
    where
        V: Serialize,
    {
        let encoded = CacheRecord::expiring(value, expiry, self.now()).encode()?;
        self.core
            .store
            .set(&self.key, encoded)
            .await
            .map_err(|e| self.storage_failure(operation, e))?;
        self.core
            .telemetry
            .record(&self.key, operation, CacheActivity::Written, elapsed);
        Ok(())
    }

    pub(crate) fn now(&self) -> i64 {
        unix_millis(&self.core.clock)
    }

    pub(crate) fn core(&self) -> &CacheCore<S> {
        &self.core
    }

    fn live<T>(&self, record: Option<CacheRecord<T>>, operation: CacheOperation) -> Option<CacheRecord<T>> {
        let Some(record) = record else {
            self.core.telemetry.record(&self.key, operation, CacheActivity::Miss, None);
            return None;
        };

        if record.is_expired(self.now()) {
            self.core.telemetry.record(&self.key, operation, CacheActivity::Expired, None);
            return None;
        }

        self.core.telemetry.record(&self.key, operation, CacheActivity::Hit, None);
        Some(record)
    }

    fn storage_failure(&self, operation: CacheOperation, error: keepsake_store::Error) -> Error {
        let error = Error::from(error);
        self.core
            .telemetry
            .record_failure(&self.key, operation, CacheActivity::Error, &error);
        error
    }
}

impl<V, S> Clone for CacheItem<V, S> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            core: Arc::clone(&self.core),
            _value: PhantomData,
        }
    }
}

impl<V, S> fmt::Debug for CacheItem<V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheItem").field("key", &self.key).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use futures::executor::block_on;
    use keepsake_store::testing::{MockStore, StoreOp};
    use serde_json::json;
    use tick::ClockControl;

    use super::*;
    use crate::{Cache, ErrorKind, Period};

    const START: Duration = Duration::from_secs(1_700_000_000);
    const START_MILLIS: i64 = 1_700_000_000_000;

    fn cache(store: &MockStore) -> (Cache<MockStore>, ClockControl) {
        let control = ClockControl::new_at(std::time::UNIX_EPOCH + START);
        let cache = Cache::builder(control.to_clock()).store(store.clone()).build();
        (cache, control)
    }

    #[test]
    fn set_writes_the_record_shape() {
        block_on(async {
            let store = MockStore::new();
            let (cache, _control) = cache(&store);
            let item = cache.item::<String>("greeting");

            item.set(Some("hi".to_string()), &Expiry::new(Period::seconds(10))).await.unwrap();

            assert_eq!(
                store.peek("cache:greeting"),
                Some(json!({"data": "hi", "expiresAt": START_MILLIS + 10_000}))
            );
        });
    }

    #[test]
    fn set_does_not_read_first() {
        block_on(async {
            let store = MockStore::new();
            let (cache, _control) = cache(&store);

            cache.item::<u8>("k").set(Some(1), &Expiry::default()).await.unwrap();

            assert!(store.operations().iter().all(StoreOp::is_write));
        });
    }

    #[test]
    fn get_hides_expired_records() {
        block_on(async {
            let store = MockStore::new();
            let (cache, control) = cache(&store);
            let item = cache.item::<u8>("k");

            item.set(Some(7), &Expiry::new(Period::seconds(1))).await.unwrap();
            assert_eq!(item.get().await.unwrap(), Some(7));

            control.advance(Duration::from_secs(1));
            assert_eq!(item.get().await.unwrap(), None);
            assert!(!item.has().await.unwrap());

            let raw = item.record().await.unwrap().unwrap();
            assert_eq!(raw.data, 7);
        });
    }

    #[test]
    fn malformed_records_read_as_absent() {
        block_on(async {
            let store = MockStore::new();
            store.seed("cache:k", json!({"unexpected": true}));
            let (cache, _control) = cache(&store);
            let item = cache.item::<u8>("k");

            assert_eq!(item.get().await.unwrap(), None);
            assert!(!item.has().await.unwrap());
            assert!(item.record().await.unwrap().is_none());
        });
    }

    #[test]
    fn has_does_not_decode_the_value() {
        block_on(async {
            let store = MockStore::new();
            store.seed("cache:k", json!({"data": "not a number", "expiresAt": START_MILLIS + 1}));
            let (cache, _control) = cache(&store);
            let item = cache.item::<u8>("k");

            assert!(item.has().await.unwrap());
            assert_eq!(item.get().await.unwrap(), None);
        });
    }

    #[test]
    fn set_none_deletes() {
        block_on(async {
            let store = MockStore::new();
            let (cache, _control) = cache(&store);
            let item = cache.item::<u8>("k");

            item.set(Some(1), &Expiry::default()).await.unwrap();
            item.set(None, &Expiry::default()).await.unwrap();

            assert_eq!(store.peek("cache:k"), None);
            assert_eq!(store.writes().last(), Some(&StoreOp::Remove("cache:k".to_string())));
        });
    }

    #[test]
    fn unrepresentable_values_are_not_written() {
        block_on(async {
            let store = MockStore::new();
            let (cache, _control) = cache(&store);
            let item = cache.item::<std::collections::HashMap<(u8, u8), u8>>("k");

            let value = std::collections::HashMap::from([((1, 2), 3)]);
            let error = item.set(Some(value), &Expiry::default()).await.unwrap_err();

            assert_eq!(error.kind(), ErrorKind::Argument);
            assert!(store.operations().is_empty());
        });
    }

    #[test]
    fn storage_failures_propagate() {
        block_on(async {
            let store = MockStore::new();
            store.fail_when(|_| true);
            let (cache, _control) = cache(&store);
            let item = cache.item::<u8>("k");

            assert_eq!(item.get().await.unwrap_err().kind(), ErrorKind::Storage);
            assert_eq!(item.set(Some(1), &Expiry::default()).await.unwrap_err().kind(), ErrorKind::Storage);
            assert_eq!(item.delete().await.unwrap_err().kind(), ErrorKind::Storage);
        });
    }

    #[test]
    fn debug_shows_key() {
        let store = MockStore::new();
        let (cache, _control) = cache(&store);
        assert_eq!(format!("{:?}", cache.item::<u8>("k")), r#"CacheItem { key: "cache:k", .. }"#);
    }
}
