// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Freshness classification of stored records.

use crate::{CacheRecord, Expiry};

/// Caller-supplied predicate that forces a record to be recomputed.
pub type RevalidatePredicate<V> = dyn Fn(&V) -> bool + Send + Sync;

/// What a memoized call should do with the record it read.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Freshness<V> {
    /// Serve the value as is.
    Fresh(V),
    /// Serve the value and refresh it in the background.
    Stale(V),
    /// Recompute before answering.
    Miss(MissReason),
}

/// Why a record could not be served.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum MissReason {
    /// Nothing usable was stored.
    Absent,
    /// The record reached its hard expiry.
    Expired,
    /// The revalidation predicate rejected the stored value.
    Revalidate,
}

/// Classifies `record` for a reader configured with `expiry` at time `now`.
///
/// The checks run in order: an absent or hard-expired record is a miss, then a record rejected by
/// `should_revalidate` is a miss, then a record past `expires_at - stale_while_revalidate` is
/// stale, and anything else is fresh.
///
/// # Examples
///
/// ```
/// use keepsake::{CacheRecord, Expiry, Freshness, Period, classify};
///
/// let now = 0;
/// let record = CacheRecord::new("v", Period::days(15).as_millis());
/// let expiry = Expiry::new(Period::days(1)).stale_while_revalidate(Period::days(29));
///
/// assert_eq!(classify(Some(record), &expiry, now, None), Freshness::Stale("v"));
/// ```
pub fn classify<V>(
    record: Option<CacheRecord<V>>,
    expiry: &Expiry,
    now: i64,
    should_revalidate: Option<&RevalidatePredicate<V>>,
) -> Freshness<V> {
    let Some(record) = record else {
        return Freshness::Miss(MissReason::Absent);
    };

    if record.is_expired(now) {
        return Freshness::Miss(MissReason::Expired);
    }

    if should_revalidate.is_some_and(|predicate| predicate(&record.data)) {
        return Freshness::Miss(MissReason::Revalidate);
    }

    if record.fresh_until(expiry.stale_window_millis()) <= now {
        Freshness::Stale(record.data)
    } else {
        Freshness::Fresh(record.data)
    }
}
