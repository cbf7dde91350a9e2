// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Deduplication of concurrent recomputations.
//!
//! [`InFlight`] maps a storage key to the computation currently producing its value. The first
//! caller registers the computation and every later caller attaches to the same shared outcome
//! until it settles. An entry leaves the map as soon as its computation finishes, whether it
//! succeeded or failed, so the registry never acts as a cache of results.

use std::{
    collections::HashMap,
    fmt,
    sync::{
        Arc, Weak,
        atomic::{AtomicU64, Ordering},
    },
};

use futures::{
    FutureExt,
    future::{BoxFuture, Shared},
};
use parking_lot::Mutex;

use crate::Error;

/// A computation that any number of callers can await.
pub(crate) type Pending<V> = Shared<BoxFuture<'static, Result<V, Error>>>;

type Entries<V> = Mutex<HashMap<String, Entry<V>>>;

struct Entry<V> {
    id: u64,
    pending: Pending<V>,
}

pub(crate) struct InFlight<V> {
    entries: Arc<Entries<V>>,
    next_id: AtomicU64,
}

impl<V> InFlight<V> {
    pub(crate) fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(0),
        }
    }
}

impl<V> InFlight<V>
where
    V: Clone + Send + Sync + 'static,
{

    /// Returns the computation registered for `key`, if any.
    pub(crate) fn get(&self, key: &str) -> Option<Pending<V>> {
        self.entries.lock().get(key).map(|entry| entry.pending.clone())
    }

    /// Returns the computation registered for `key`, registering the one built by `start` if
    /// there is none.
    ///
    /// The flag is `true` when this call registered the computation. `start` runs under the
    /// registry lock and must only build the future, not poll it.
    pub(crate) fn get_or_register<F>(&self, key: &str, start: F) -> (Pending<V>, bool)
    where
        F: FnOnce() -> BoxFuture<'static, Result<V, Error>>,
    {
        let mut entries = self.entries.lock();
        if let Some(entry) = entries.get(key) {
            return (entry.pending.clone(), false);
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let settle = Settle {
            entries: Arc::downgrade(&self.entries),
            key: key.to_owned(),
            id,
        };
        let work = start();
        let pending = async move {
            let _settle = settle;
            work.await
        }
        .boxed()
        .shared();

        entries.insert(
            key.to_owned(),
            Entry {
                id,
                pending: pending.clone(),
            },
        );
        (pending, true)
    }

    /// Forgets the computation registered for `key` without cancelling it.
    ///
    /// Callers already attached keep waiting for it; new callers start afresh.
    pub(crate) fn remove(&self, key: &str) {
        let removed = self.entries.lock().remove(key);
        drop(removed);
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.lock().len()
    }
}

impl<V> fmt::Debug for InFlight<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<String> = self.entries.lock().keys().cloned().collect();
        keys.sort_unstable();
        f.debug_struct("InFlight").field("keys", &keys).finish()
    }
}

/// Removes a registry entry when the computation it guards finishes or is dropped.
struct Settle<V> {
    entries: Weak<Entries<V>>,
    key: String,
    id: u64,
}

impl<V> Drop for Settle<V> {
    fn drop(&mut self) {
        let Some(entries) = self.entries.upgrade() else {
            return;
        };

        let removed = {
            let mut entries = entries.lock();
            match entries.get(&self.key) {
                Some(entry) if entry.id == self.id => entries.remove(&self.key),
                _ => None,
            }
        };

        // Dropped outside the lock: releasing the last handle drops the computation, which may
        // own another `Settle`.
        drop(removed);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use futures::executor::block_on;

    use super::*;
    use crate::ErrorKind;

    fn ready(value: u32) -> BoxFuture<'static, Result<u32, Error>> {
        async move { Ok(value) }.boxed()
    }

    #[test]
    fn first_caller_registers() {
        let flight = InFlight::<u32>::new();
        let (_, registered) = flight.get_or_register("cache:a", || ready(1));
        assert!(registered);
        assert!(flight.get("cache:a").is_some());

        let (_, registered) = flight.get_or_register("cache:a", || ready(2));
        assert!(!registered);
        assert_eq!(flight.len(), 1);
    }

    #[test]
    fn joined_callers_share_one_outcome() {
        let flight = InFlight::<u32>::new();
        let starts = AtomicUsize::new(0);
        let start = || {
            starts.fetch_add(1, Ordering::SeqCst);
            ready(7)
        };

        let (first, _) = flight.get_or_register("cache:a", start);
        let (second, _) = flight.get_or_register("cache:a", || ready(99));

        assert_eq!(block_on(first).unwrap(), 7);
        assert_eq!(block_on(second).unwrap(), 7);
        assert_eq!(starts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn entry_is_removed_on_success() {
        let flight = InFlight::<u32>::new();
        let (pending, _) = flight.get_or_register("cache:a", || ready(1));
        block_on(pending).unwrap();
        assert!(flight.get("cache:a").is_none());
    }

    #[test]
    fn entry_is_removed_on_failure() {
        let flight = InFlight::<u32>::new();
        let (pending, _) = flight.get_or_register("cache:a", || async { Err(Error::computation("boom")) }.boxed());

        let error = block_on(pending).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Computation);
        assert!(flight.get("cache:a").is_none());
    }

    #[test]
    fn keys_are_independent() {
        let flight = InFlight::<u32>::new();
        let (_, a) = flight.get_or_register("cache:a", || ready(1));
        let (_, b) = flight.get_or_register("cache:b", || ready(2));
        assert!(a && b);
        assert_eq!(flight.len(), 2);
    }

    #[test]
    fn stale_settlement_keeps_newer_entry() {
        let flight = InFlight::<u32>::new();
        let (old, _) = flight.get_or_register("cache:a", || ready(1));
        flight.remove("cache:a");

        let (new, registered) = flight.get_or_register("cache:a", || ready(2));
        assert!(registered);

        assert_eq!(block_on(old).unwrap(), 1);
        assert!(flight.get("cache:a").is_some(), "settling the old computation must not evict the new one");

        assert_eq!(block_on(new).unwrap(), 2);
        assert!(flight.get("cache:a").is_none());
    }

    #[test]
    fn debug_lists_keys() {
        let flight = InFlight::<u32>::new();
        let _registered = flight.get_or_register("cache:b", || ready(1));
        let _registered = flight.get_or_register("cache:a", || ready(1));
        assert_eq!(format!("{flight:?}"), r#"InFlight { keys: ["cache:a", "cache:b"] }"#);
    }
}
