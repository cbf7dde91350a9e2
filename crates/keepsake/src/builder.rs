// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Cache construction.

use std::sync::Arc;

use keepsake_store::{MemoryStore, Store};
use tick::Clock;
use tokio::runtime::Handle;

use crate::{Cache, Expiry, cache::CacheCore, runtime::Runtime, telemetry::CacheTelemetry};

/// Builder for [`Cache`].
///
/// Created by [`Cache::builder`]. A store must be chosen before the cache can be built; the
/// remaining settings have defaults:
///
/// - expiry: [`Expiry::default`], one day without a stale window;
/// - logging: enabled;
/// - background work: the Tokio runtime current at the time of each call.
///
/// # Examples
///
/// ```
/// use keepsake::{Cache, Expiry, Period};
/// use tick::Clock;
///
/// let cache = Cache::builder(Clock::new_frozen())
///     .memory()
///     .expiry(Expiry::new(Period::minutes(10)).stale_while_revalidate(Period::hours(1)))
///     .logs(false)
///     .build();
/// ```
#[derive(Debug)]
pub struct CacheBuilder<S = ()> {
    store: S,
    clock: Clock,
    expiry: Expiry,
    logs: bool,
    handle: Option<Handle>,
}

impl CacheBuilder<()> {
    pub(crate) fn new(clock: Clock) -> Self {
        Self {
            store: (),
            clock,
            expiry: Expiry::default(),
            logs: true,
            handle: None,
        }
    }

    /// Stores values in `store`.
    ///
    /// Pass an `Arc` to share one store between several caches.
    pub fn store<S>(self, store: S) -> CacheBuilder<S>
    where
        S: Store,
    {
        CacheBuilder {
            store,
            clock: self.clock,
            expiry: self.expiry,
            logs: self.logs,
            handle: self.handle,
        }
    }

    /// Stores values in a fresh [`MemoryStore`].
    #[must_use]
    pub fn memory(self) -> CacheBuilder<MemoryStore> {
        self.store(MemoryStore::new())
    }
}

impl<S> CacheBuilder<S> {
    /// Sets the expiry used by [`Cache::set`] and inherited by memoized functions.
    #[must_use]
    pub const fn expiry(mut self, expiry: Expiry) -> Self {
        self.expiry = expiry;
        self
    }

    /// Enables or disables the `cache.event` log records.
    #[must_use]
    pub const fn logs(mut self, enabled: bool) -> Self {
        self.logs = enabled;
        self
    }

    /// Runs background revalidations on `handle` instead of the ambient Tokio runtime.
    #[must_use]
    pub fn tokio_handle(mut self, handle: Handle) -> Self {
        self.handle = Some(handle);
        self
    }
}

impl<S> CacheBuilder<S>
where
    S: Store,
{
    /// Builds the cache.
    #[must_use]
    pub fn build(self) -> Cache<S> {
        Cache::from_core(Arc::new(CacheCore {
            store: Arc::new(self.store),
            clock: self.clock,
            expiry: self.expiry,
            telemetry: CacheTelemetry::new(self.logs),
            runtime: Runtime::new(self.handle),
        }))
    }
}
