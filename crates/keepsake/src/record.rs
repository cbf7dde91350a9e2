// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The persisted shape of a cached value.

use std::time::UNIX_EPOCH;

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use tick::Clock;

use crate::{Error, Expiry};

/// A cached value together with its hard expiry.
///
/// Records are stored as `{"data": <value>, "expiresAt": <unix millis>}`. The expiry is an
/// absolute timestamp, so a record carries no memory of the durations it was written with.
///
/// # Examples
///
/// ```
/// use keepsake::CacheRecord;
/// use serde_json::json;
///
/// let record = CacheRecord::new("hello", 1_000);
/// assert_eq!(record.encode().unwrap(), json!({"data": "hello", "expiresAt": 1000}));
/// assert!(record.is_expired(1_000));
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheRecord<V> {
    /// The cached value.
    pub data: V,
    /// Unix milliseconds at which the record stops being servable.
    pub expires_at: i64,
}

impl<V> CacheRecord<V> {
    /// Creates a record that expires at `expires_at`.
    pub const fn new(data: V, expires_at: i64) -> Self {
        Self { data, expires_at }
    }

    /// Creates a record written at `now` under `expiry`.
    pub fn expiring(data: V, expiry: &Expiry, now: i64) -> Self {
        Self::new(data, expiry.expires_at(now))
    }

    /// Returns `true` once `now` has reached the hard expiry.
    #[must_use]
    pub const fn is_expired(&self, now: i64) -> bool {
        now >= self.expires_at
    }

    /// Returns the point at which the record becomes stale for a reader with the given stale
    /// window, in unix milliseconds.
    #[must_use]
    pub const fn fresh_until(&self, stale_window_millis: i64) -> i64 {
        self.expires_at.saturating_sub(stale_window_millis)
    }

    /// Converts the record into its stored JSON form.
    ///
    /// # Errors
    ///
    /// Returns an [`Argument`](crate::ErrorKind::Argument) error if the value cannot be
    /// represented as JSON.
    pub fn encode(&self) -> Result<Value, Error>
    where
        V: Serialize,
    {
        serde_json::to_value(self).map_err(Error::argument)
    }

    /// Reads a record from its stored JSON form.
    ///
    /// Anything that is not shaped like a record yields `None`.
    #[must_use]
    pub fn decode(value: Value) -> Option<Self>
    where
        V: DeserializeOwned,
    {
        serde_json::from_value(value).ok()
    }
}

/// Reads the clock as unix milliseconds.
pub(crate) fn unix_millis(clock: &Clock) -> i64 {
    match clock.system_time().duration_since(UNIX_EPOCH) {
        Ok(elapsed) => i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX),
        Err(before_epoch) => i64::try_from(before_epoch.duration().as_millis()).map_or(i64::MIN, |millis| -millis),
    }
}
