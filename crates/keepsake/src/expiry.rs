// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Time budgets applied when writing records.

use serde::{Deserialize, Serialize};

use crate::Period;

/// How long a written record stays usable.
///
/// A record is fresh for `max_age`. When `stale_while_revalidate` is set, it stays servable for
/// that much longer while a background refresh replaces it. After both windows have passed the
/// record is expired and is never served again.
///
/// The stale window is also consulted at read time: two callers with different
/// `stale_while_revalidate` settings can disagree on whether the same record is stale.
///
/// # Examples
///
/// ```
/// use keepsake::{Expiry, Period};
///
/// let expiry = Expiry::new(Period::hours(1)).stale_while_revalidate(Period::days(1));
/// assert_eq!(expiry.expires_at(0), Period::hours(25).as_millis());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Expiry {
    /// How long a record is served without revalidation.
    pub max_age: Period,
    /// How long past `max_age` a record may still be served while it is revalidated.
    pub stale_while_revalidate: Option<Period>,
}

impl Default for Expiry {
    /// One day of freshness and no stale window.
    fn default() -> Self {
        Self::new(Period::days(1))
    }
}

impl Expiry {
    /// Creates an expiry with the given freshness budget and no stale window.
    #[must_use]
    pub const fn new(max_age: Period) -> Self {
        Self {
            max_age,
            stale_while_revalidate: None,
        }
    }

    /// Sets the stale-while-revalidate window.
    #[must_use]
    pub const fn stale_while_revalidate(mut self, window: Period) -> Self {
        self.stale_while_revalidate = Some(window);
        self
    }

    /// Returns the stale window in milliseconds, zero when unset.
    #[must_use]
    pub fn stale_window_millis(&self) -> i64 {
        self.stale_while_revalidate.map_or(0, Period::as_millis)
    }

    /// Returns the absolute hard expiry, in unix milliseconds, of a record written at `now`.
    #[must_use]
    pub fn expires_at(&self, now: i64) -> i64 {
        now.saturating_add(self.max_age.as_millis())
            .saturating_add(self.stale_window_millis())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_one_day_without_stale_window() {
        let expiry = Expiry::default();
        assert_eq!(expiry.max_age, Period::days(1));
        assert_eq!(expiry.stale_while_revalidate, None);
        assert_eq!(expiry.stale_window_millis(), 0);
    }

    #[test]
    fn expires_at_adds_both_windows() {
        let expiry = Expiry::new(Period::days(1)).stale_while_revalidate(Period::days(29));
        assert_eq!(expiry.expires_at(1_000), 1_000 + Period::days(30).as_millis());
    }

    #[test]
    fn negative_max_age_lands_in_the_past() {
        let expiry = Expiry::new(Period::seconds(-1));
        assert!(expiry.expires_at(10_000) < 10_000);
    }

    #[test]
    fn expires_at_saturates() {
        let expiry = Expiry::new(Period::days(i64::MAX));
        assert_eq!(expiry.expires_at(5), i64::MAX);
    }

    #[test]
    fn deserializes_from_camel_case() {
        let expiry: Expiry = serde_json::from_str(r#"{"maxAge": {"hours": 2}, "staleWhileRevalidate": {"minutes": 5}}"#).unwrap();
        assert_eq!(expiry, Expiry::new(Period::hours(2)).stale_while_revalidate(Period::minutes(5)));

        let empty: Expiry = serde_json::from_str("{}").unwrap();
        assert_eq!(empty, Expiry::default());
    }
}
