// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Memoization of asynchronous functions.

use std::{fmt, sync::Arc};

use futures::{FutureExt, future::BoxFuture};
use keepsake_store::Store;
use serde::{Serialize, de::DeserializeOwned};

use crate::{
    CacheItem, Error, Expiry, Freshness, KeyStrategy, MissReason, Period,
    cache::CacheCore,
    classify,
    flight::{InFlight, Pending},
    key::function_key,
    policy::RevalidatePredicate,
    telemetry::{CacheActivity, CacheOperation},
};

type Func<A, V> = Arc<dyn Fn(A) -> BoxFuture<'static, Result<V, Error>> + Send + Sync>;

/// Builder for [`Memoized`].
///
/// Created by [`Cache::function`](crate::Cache::function). The expiry starts out as the cache's
/// default expiry.
pub struct MemoizeBuilder<A, V, S> {
    core: Arc<CacheCore<S>>,
    name: String,
    func: Func<A, V>,
    expiry: Expiry,
    should_revalidate: Option<Arc<RevalidatePredicate<V>>>,
    key_strategy: KeyStrategy<A>,
}

impl<A, V, S> MemoizeBuilder<A, V, S> {
    pub(crate) fn new<F, Fut, E>(core: Arc<CacheCore<S>>, name: String, key_strategy: KeyStrategy<A>, func: F) -> Self
    where
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
        E: std::error::Error + Send + Sync + 'static,
    {
        let expiry = core.expiry;
        let func: Func<A, V> = Arc::new(move |args| {
            let work = func(args);
            async move { work.await.map_err(Error::computation) }.boxed()
        });

        Self {
            core,
            name,
            func,
            expiry,
            should_revalidate: None,
            key_strategy,
        }
    }

    /// Sets how long results are served without revalidation.
    #[must_use]
    pub const fn max_age(mut self, max_age: Period) -> Self {
        self.expiry.max_age = max_age;
        self
    }

    /// Sets how long past `max_age` results are served while they are refreshed in the
    /// background.
    #[must_use]
    pub const fn stale_while_revalidate(mut self, window: Period) -> Self {
        self.expiry.stale_while_revalidate = Some(window);
        self
    }

    /// Replaces both time budgets at once.
    #[must_use]
    pub const fn expiry(mut self, expiry: Expiry) -> Self {
        self.expiry = expiry;
        self
    }

    /// Forces a synchronous recomputation whenever `predicate` returns `true` for a live stored
    /// value.
    #[must_use]
    pub fn should_revalidate<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&V) -> bool + Send + Sync + 'static,
    {
        self.should_revalidate = Some(Arc::new(predicate));
        self
    }

    /// Derives key suffixes with `key` instead of [`derive_args_key`](crate::derive_args_key).
    #[must_use]
    pub fn cache_key<K>(mut self, key: K) -> Self
    where
        K: Fn(&A) -> String + Send + Sync + 'static,
    {
        self.key_strategy = KeyStrategy::custom(key);
        self
    }

    /// Builds the memoized function.
    #[must_use]
    pub fn build(self) -> Memoized<A, V, S> {
        Memoized {
            inner: Arc::new(MemoizedInner {
                core: self.core,
                name: self.name,
                func: self.func,
                expiry: self.expiry,
                should_revalidate: self.should_revalidate,
                key_strategy: self.key_strategy,
                in_flight: InFlight::new(),
            }),
        }
    }
}

impl<A, V, S> fmt::Debug for MemoizeBuilder<A, V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoizeBuilder")
            .field("name", &self.name)
            .field("expiry", &self.expiry)
            .field("should_revalidate", &self.should_revalidate.is_some())
            .field("key_strategy", &self.key_strategy)
            .finish_non_exhaustive()
    }
}

struct MemoizedInner<A, V, S> {
    core: Arc<CacheCore<S>>,
    name: String,
    func: Func<A, V>,
    expiry: Expiry,
    should_revalidate: Option<Arc<RevalidatePredicate<V>>>,
    key_strategy: KeyStrategy<A>,
    in_flight: InFlight<V>,
}

/// An asynchronous function whose results are cached per argument list.
///
/// Each [`call`](Self::call) reads the stored result for its arguments and then:
///
/// - serves a **fresh** result without calling the function;
/// - serves a **stale** result immediately and refreshes it in the background, unless a refresh
///   for the same key is already running;
/// - on a **miss** (nothing stored, expired, or rejected by `should_revalidate`) calls the
///   function, stores the result and returns it.
///
/// While a computation for a key is running, every other call for that key waits for it
/// instead of reading the store or calling the function again. Failures are never stored.
///
/// Background refreshes need a Tokio runtime, either the one given to
/// [`CacheBuilder::tokio_handle`](crate::CacheBuilder::tokio_handle) or the runtime the stale
/// call runs on. Without one the stale value is still served but nothing refreshes it in the
/// background: the refresh stays registered, a warning is logged, and the next call for the key
/// waits for that refresh and runs it itself.
///
/// Cloning is cheap and clones share the in-flight registry.
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
/// let square = cache
///     .function("square", |n: u64| async move { Ok::<_, Infallible>(n * n) })
///     .max_age(Period::minutes(5))
///     .stale_while_revalidate(Period::hours(1))
///     .build();
///
/// assert_eq!(square.call(12).await?, 144);
/// assert_eq!(cache.store().keys(), vec!["cache:square:[12]".to_string()]);
/// # Ok::<(), keepsake::Error>(())
/// # });
/// ```
pub struct Memoized<A, V, S> {
    inner: Arc<MemoizedInner<A, V, S>>,
}

impl<A, V, S> Memoized<A, V, S>
where
    A: Send + 'static,
    V: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
    S: Store + 'static,
{
    /// Returns the namespace of this function.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Returns the time budgets applied to this function's results.
    #[must_use]
    pub fn expiry(&self) -> &Expiry {
        &self.inner.expiry
    }

    /// Returns the storage key for `args`.
    ///
    /// # Errors
    ///
    /// Returns an [`Argument`](crate::ErrorKind::Argument) error if the derived key strategy is
    /// in use and the arguments cannot be represented as JSON.
    pub fn key(&self, args: &A) -> Result<String, Error> {
        let suffix = self.inner.key_strategy.suffix(args)?;
        Ok(function_key(&self.inner.name, &suffix))
    }

    /// Returns the result for `args`, from the cache when possible.
    ///
    /// # Errors
    ///
    /// - [`Argument`](crate::ErrorKind::Argument) if the arguments or the result cannot be
    ///   represented as JSON.
    /// - [`Computation`](crate::ErrorKind::Computation) if the function had to run and failed.
    /// - [`Storage`](crate::ErrorKind::Storage) if the store failed.
    ///
    /// A failed background refresh is logged and never reported here.
    pub async fn call(&self, args: A) -> Result<V, Error> {
        let key = self.key(&args)?;
        let telemetry = &self.inner.core.telemetry;

        if let Some(pending) = self.inner.in_flight.get(&key) {
            telemetry.record(&key, CacheOperation::Call, CacheActivity::Joined, None);
            return pending.await;
        }

        let item = self.item(key);
        let record = item.load::<V>(CacheOperation::Call).await?;
        let freshness = classify(
            record,
            &self.inner.expiry,
            item.now(),
            self.inner.should_revalidate.as_deref(),
        );

        match freshness {
            Freshness::Fresh(value) => {
                telemetry.record(item.key(), CacheOperation::Call, CacheActivity::Hit, None);
                Ok(value)
            }
            Freshness::Stale(value) => {
                telemetry.record(item.key(), CacheOperation::Call, CacheActivity::Stale, None);
                self.revalidate(item, args);
                Ok(value)
            }
            Freshness::Miss(reason) => {
                let activity = match reason {
                    MissReason::Expired => CacheActivity::Expired,
                    _ => CacheActivity::Miss,
                };
                telemetry.record(item.key(), CacheOperation::Call, activity, None);
                self.recompute(item, args, CacheOperation::Call).await
            }
        }
    }

    /// Runs the function for `args` regardless of what is stored, stores the result and
    /// returns it.
    ///
    /// A computation already running for the same key is joined instead.
    ///
    /// # Errors
    ///
    /// Same as [`call`](Self::call), except that a stored result is never consulted.
    pub async fn fresh(&self, args: A) -> Result<V, Error> {
        let key = self.key(&args)?;
        self.recompute(self.item(key), args, CacheOperation::Fresh).await
    }

    /// Deletes the stored result for `args`.
    ///
    /// A computation already running for the key is not cancelled and stores its result when
    /// it finishes, but later calls no longer join it.
    ///
    /// # Errors
    ///
    /// Returns an [`Argument`](crate::ErrorKind::Argument) error if the key cannot be derived,
    /// or a [`Storage`](crate::ErrorKind::Storage) error if the store fails.
    pub async fn invalidate(&self, args: &A) -> Result<(), Error> {
        let key = self.key(args)?;
        self.inner.in_flight.remove(&key);
        self.item(key).delete().await
    }

    fn item(&self, key: String) -> CacheItem<V, S> {
        CacheItem::new(key, Arc::clone(&self.inner.core))
    }

    async fn recompute(&self, item: CacheItem<V, S>, args: A, operation: CacheOperation) -> Result<V, Error> {
        let key = item.key().to_owned();
        let (pending, registered) = self.register(item, args, operation);
        if !registered {
            self.inner
                .core
                .telemetry
                .record(&key, operation, CacheActivity::Joined, None);
        }
        pending.await
    }

    fn revalidate(&self, item: CacheItem<V, S>, args: A) {
        let key = item.key().to_owned();
        let (pending, registered) = self.register(item, args, CacheOperation::Revalidate);
        if !registered {
            return;
        }

        let telemetry = self.inner.core.telemetry;
        self.inner.core.runtime.spawn(async move {
            match pending.await {
                Ok(_) => telemetry.record(&key, CacheOperation::Revalidate, CacheActivity::Revalidated, None),
                Err(error) => telemetry.record_failure(&key, CacheOperation::Revalidate, CacheActivity::RevalidationFailed, &error),
            }
        });
    }

    /// Registers the computation for `item`, or returns the one already running.
    fn register(&self, item: CacheItem<V, S>, args: A, operation: CacheOperation) -> (Pending<V>, bool) {
        let key = item.key().to_owned();
        let func = &self.inner.func;
        let expiry = self.inner.expiry;

        self.inner.in_flight.get_or_register(&key, || {
            let work = func(args);
            async move {
                let stopwatch = item.core().clock.stopwatch();
                let value = work.await?;
                item.put(&value, &expiry, operation, Some(stopwatch.elapsed())).await?;
                Ok(value)
            }
            .boxed()
        })
    }
}

impl<A, V, S> Clone for Memoized<A, V, S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A, V, S> fmt::Debug for Memoized<A, V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Memoized")
            .field("name", &self.inner.name)
            .field("expiry", &self.inner.expiry)
            .field("in_flight", &self.inner.in_flight)
            .finish_non_exhaustive()
    }
}
