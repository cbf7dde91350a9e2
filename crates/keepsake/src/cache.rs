// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The main cache type.

use std::{fmt, sync::Arc};

use keepsake_store::{MemoryStore, Store};
use serde::{Serialize, de::DeserializeOwned};
use tick::Clock;

use crate::{
    CacheBuilder, CacheItem, Error, Expiry, KeyStrategy, MemoizeBuilder,
    key::item_key,
    runtime::Runtime,
    telemetry::CacheTelemetry,
};

/// State shared by a cache, its items and its memoized functions.
pub(crate) struct CacheCore<S> {
    pub(crate) store: Arc<S>,
    pub(crate) clock: Clock,
    pub(crate) expiry: Expiry,
    pub(crate) telemetry: CacheTelemetry,
    pub(crate) runtime: Runtime,
}

/// A time-based cache over an asynchronous key-value [`Store`].
///
/// The cache offers two surfaces:
///
/// - Direct access to keyed values through [`get`](Self::get), [`has`](Self::has),
///   [`set`](Self::set) and [`delete`](Self::delete). Every key `k` is stored as `cache:k`.
/// - Memoization of asynchronous functions through [`function`](Self::function), with
///   stale-while-revalidate refreshes and deduplication of concurrent recomputations.
///
/// Values are stored as JSON together with an absolute expiry. Cloning a cache is cheap and
/// clones share the store and configuration.
///
/// # Examples
///
/// ```
/// use keepsake::{Cache, Expiry, Period};
/// use tick::Clock;
/// # futures::executor::block_on(async {
///
/// let cache = Cache::builder(Clock::new_frozen()).memory().build();
///
/// cache.set_with("user", Some("ada"), Expiry::new(Period::days(10))).await?;
/// assert_eq!(cache.get::<String>("user").await?, Some("ada".to_string()));
///
/// cache.delete("user").await?;
/// assert!(!cache.has("user").await?);
/// # Ok::<(), keepsake::Error>(())
/// # });
/// ```
pub struct Cache<S = MemoryStore> {
    core: Arc<CacheCore<S>>,
}

impl Cache {
    /// Starts building a cache that reads time from `clock`.
    ///
    /// # Examples
    ///
    /// ```
    /// use keepsake::{Cache, Expiry, Period};
    /// use keepsake_store::MemoryStore;
    /// use tick::Clock;
    ///
    /// let cache = Cache::builder(Clock::new_frozen())
    ///     .store(MemoryStore::new())
    ///     .expiry(Expiry::new(Period::hours(6)))
    ///     .build();
    /// ```
    #[must_use]
    pub fn builder(clock: Clock) -> CacheBuilder {
        CacheBuilder::new(clock)
    }
}

impl<S> Cache<S>
where
    S: Store,
{
    pub(crate) const fn from_core(core: Arc<CacheCore<S>>) -> Self {
        Self { core }
    }

    /// Returns the underlying store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.core.store
    }

    /// Returns the expiry applied by [`set`](Self::set) and inherited by memoized functions.
    #[must_use]
    pub fn default_expiry(&self) -> &Expiry {
        &self.core.expiry
    }

    /// Returns a handle to the entry stored under `cache:<key>`.
    #[must_use]
    pub fn item<V>(&self, key: &str) -> CacheItem<V, S> {
        CacheItem::new(item_key(key), Arc::clone(&self.core))
    }

    /// Returns the value under `key` if a live record exists.
    ///
    /// # Errors
    ///
    /// Returns a [`Storage`](crate::ErrorKind::Storage) error if the store fails.
    pub async fn get<V>(&self, key: &str) -> Result<Option<V>, Error>
    where
        V: DeserializeOwned,
    {
        self.item(key).get().await
    }

    /// Returns `true` if a live record exists under `key`.
    ///
    /// # Errors
    ///
    /// Returns a [`Storage`](crate::ErrorKind::Storage) error if the store fails.
    pub async fn has(&self, key: &str) -> Result<bool, Error> {
        self.item::<()>(key).has().await
    }

    /// Writes `value` under `key` with the default expiry, or deletes it when `value` is `None`.
    ///
    /// # Errors
    ///
    /// Returns an [`Argument`](crate::ErrorKind::Argument) error if the value cannot be
    /// represented as JSON, or a [`Storage`](crate::ErrorKind::Storage) error if the store fails.
    pub async fn set<V>(&self, key: &str, value: Option<V>) -> Result<(), Error>
    where
        V: Serialize,
    {
        self.item(key).set(value, &self.core.expiry).await
    }

    /// Writes `value` under `key` with the given expiry, or deletes it when `value` is `None`.
    ///
    /// # Errors
    ///
    /// Returns an [`Argument`](crate::ErrorKind::Argument) error if the value cannot be
    /// represented as JSON, or a [`Storage`](crate::ErrorKind::Storage) error if the store fails.
    pub async fn set_with<V>(&self, key: &str, value: Option<V>, expiry: Expiry) -> Result<(), Error>
    where
        V: Serialize,
    {
        self.item(key).set(value, &expiry).await
    }

    /// Removes the entry under `key`. Removing a missing entry succeeds.
    ///
    /// # Errors
    ///
    /// Returns a [`Storage`](crate::ErrorKind::Storage) error if the store fails.
    pub async fn delete(&self, key: &str) -> Result<(), Error> {
        self.item::<()>(key).delete().await
    }

    /// Starts memoizing `func` under the namespace `name`.
    ///
    /// Each call's result is stored as `cache:<name>:<suffix>`, where the suffix is derived from
    /// the arguments (see [`derive_args_key`](crate::derive_args_key)). The function receives
    /// its arguments as one value, typically a tuple.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::convert::Infallible;
    ///
    /// use keepsake::{Cache, Period};
    /// use tick::Clock;
    /// # futures::executor::block_on(async {
    ///
    /// let cache = Cache::builder(Clock::new_frozen()).memory().build();
    /// let greet = cache
    ///     .function("greet", |(greeting, name): (String, String)| async move {
    ///         Ok::<_, Infallible>(format!("{greeting}, {name}!"))
    ///     })
    ///     .max_age(Period::hours(1))
    ///     .build();
    ///
    /// let message = greet.call(("Hello".to_string(), "Ada".to_string())).await?;
    /// assert_eq!(message, "Hello, Ada!");
    /// assert_eq!(greet.key(&("Hello".to_string(), "Ada".to_string()))?, "cache:greet:Hello,Ada");
    /// # Ok::<(), keepsake::Error>(())
    /// # });
    /// ```
    pub fn function<A, V, F, Fut, E>(&self, name: impl Into<String>, func: F) -> MemoizeBuilder<A, V, S>
    where
        A: Serialize,
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
        E: std::error::Error + Send + Sync + 'static,
    {
        MemoizeBuilder::new(Arc::clone(&self.core), name.into(), KeyStrategy::derived(), func)
    }

    /// Starts memoizing `func` under the namespace `name`, deriving key suffixes with `key`.
    ///
    /// Unlike [`function`](Self::function) the arguments do not have to be serializable.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::convert::Infallible;
    ///
    /// use keepsake::Cache;
    /// use tick::Clock;
    /// # futures::executor::block_on(async {
    ///
    /// struct Account {
    ///     id: u64,
    /// }
    ///
    /// let cache = Cache::builder(Clock::new_frozen()).memory().build();
    /// let balance = cache
    ///     .function_keyed("balance", |account: &Account| account.id.to_string(), |account: Account| async move {
    ///         Ok::<_, Infallible>(account.id * 100)
    ///     })
    ///     .build();
    ///
    /// assert_eq!(balance.call(Account { id: 3 }).await?, 300);
    /// assert!(cache.has("balance:3").await?);
    /// # Ok::<(), keepsake::Error>(())
    /// # });
    /// ```
    pub fn function_keyed<A, V, K, F, Fut, E>(&self, name: impl Into<String>, key: K, func: F) -> MemoizeBuilder<A, V, S>
    where
        K: Fn(&A) -> String + Send + Sync + 'static,
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
        E: std::error::Error + Send + Sync + 'static,
    {
        MemoizeBuilder::new(Arc::clone(&self.core), name.into(), KeyStrategy::custom(key), func)
    }
}

impl<S> Clone for Cache<S> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
        }
    }
}

impl<S> fmt::Debug for Cache<S>
where
    S: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cache")
            .field("store", &self.core.store)
            .field("expiry", &self.core.expiry)
            .finish_non_exhaustive()
    }
}
