// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Structured durations.

use std::{ops::Add, time::Duration};

use serde::{Deserialize, Serialize};

const MILLIS_PER_SECOND: i64 = 1_000;
const MILLIS_PER_MINUTE: i64 = 60 * MILLIS_PER_SECOND;
const MILLIS_PER_HOUR: i64 = 60 * MILLIS_PER_MINUTE;
const MILLIS_PER_DAY: i64 = 24 * MILLIS_PER_HOUR;

/// A length of time described in calendar-free units.
///
/// Every component is signed so that a period can point into the past, which makes a record
/// written with it expire immediately. Components are summed, so `Period::days(1) +
/// Period::hours(6)` is thirty hours.
///
/// Periods deserialize from objects such as `{"days": 1, "hours": 6}`; missing fields are zero.
///
/// # Examples
///
/// ```
/// use keepsake::Period;
///
/// let period = Period::days(1) + Period::hours(6);
/// assert_eq!(period.as_millis(), 30 * 60 * 60 * 1000);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Period {
    /// Whole days.
    pub days: i64,
    /// Whole hours.
    pub hours: i64,
    /// Whole minutes.
    pub minutes: i64,
    /// Whole seconds.
    pub seconds: i64,
    /// Whole milliseconds.
    pub milliseconds: i64,
}

impl Period {
    /// A period of no length.
    pub const ZERO: Self = Self {
        days: 0,
        hours: 0,
        minutes: 0,
        seconds: 0,
        milliseconds: 0,
    };

    /// A period of `days` days.
    #[must_use]
    pub const fn days(days: i64) -> Self {
        Self { days, ..Self::ZERO }
    }

    /// A period of `hours` hours.
    #[must_use]
    pub const fn hours(hours: i64) -> Self {
        Self { hours, ..Self::ZERO }
    }

    /// A period of `minutes` minutes.
    #[must_use]
    pub const fn minutes(minutes: i64) -> Self {
        Self { minutes, ..Self::ZERO }
    }

    /// A period of `seconds` seconds.
    #[must_use]
    pub const fn seconds(seconds: i64) -> Self {
        Self { seconds, ..Self::ZERO }
    }

    /// A period of `milliseconds` milliseconds.
    #[must_use]
    pub const fn milliseconds(milliseconds: i64) -> Self {
        Self {
            milliseconds,
            ..Self::ZERO
        }
    }

    /// Returns the total length in milliseconds, saturating on overflow.
    #[must_use]
    pub fn as_millis(self) -> i64 {
        self.days
            .saturating_mul(MILLIS_PER_DAY)
            .saturating_add(self.hours.saturating_mul(MILLIS_PER_HOUR))
            .saturating_add(self.minutes.saturating_mul(MILLIS_PER_MINUTE))
            .saturating_add(self.seconds.saturating_mul(MILLIS_PER_SECOND))
            .saturating_add(self.milliseconds)
    }

    /// Returns `true` if the total length is negative.
    #[must_use]
    pub fn is_negative(self) -> bool {
        self.as_millis() < 0
    }
}

impl Add for Period {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            days: self.days.saturating_add(rhs.days),
            hours: self.hours.saturating_add(rhs.hours),
            minutes: self.minutes.saturating_add(rhs.minutes),
            seconds: self.seconds.saturating_add(rhs.seconds),
            milliseconds: self.milliseconds.saturating_add(rhs.milliseconds),
        }
    }
}

impl From<Duration> for Period {
    fn from(duration: Duration) -> Self {
        Self::milliseconds(i64::try_from(duration.as_millis()).unwrap_or(i64::MAX))
    }
}
