// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Structured logging of cache activity.
//!
//! Every decision the cache makes is emitted as a `cache.event` through `tracing`, carrying the
//! storage key, the operation and the activity as fields. The level depends on the activity:
//! routine reads are debug, writes are info, swallowed failures are warnings and storage failures
//! are errors.

use std::time::Duration;

use tracing::Level;

use crate::Error;

#[cfg(test)]
pub(crate) mod attributes;
#[cfg(test)]
pub(crate) mod testing;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CacheOperation {
    Get,
    Has,
    Set,
    Delete,
    Call,
    Fresh,
    Revalidate,
}

impl CacheOperation {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Get => "cache.get",
            Self::Has => "cache.has",
            Self::Set => "cache.set",
            Self::Delete => "cache.delete",
            Self::Call => "cache.call",
            Self::Fresh => "cache.fresh",
            Self::Revalidate => "cache.revalidate",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CacheActivity {
    Hit,
    Stale,
    Miss,
    Expired,
    Joined,
    Malformed,
    Written,
    Deleted,
    Revalidated,
    RevalidationFailed,
    Error,
}

impl CacheActivity {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Hit => "cache.hit",
            Self::Stale => "cache.stale",
            Self::Miss => "cache.miss",
            Self::Expired => "cache.expired",
            Self::Joined => "cache.joined",
            Self::Malformed => "cache.malformed",
            Self::Written => "cache.written",
            Self::Deleted => "cache.deleted",
            Self::Revalidated => "cache.revalidated",
            Self::RevalidationFailed => "cache.revalidation_failed",
            Self::Error => "cache.error",
        }
    }

    pub(crate) fn level(self) -> Level {
        match self {
            Self::Hit | Self::Stale | Self::Miss | Self::Expired | Self::Joined => Level::DEBUG,
            Self::Written | Self::Deleted | Self::Revalidated => Level::INFO,
            Self::Malformed | Self::RevalidationFailed => Level::WARN,
            Self::Error => Level::ERROR,
        }
    }
}

/// Emits cache events, or nothing when logging is disabled.
#[derive(Debug, Clone, Copy)]
pub(crate) struct CacheTelemetry {
    logging_enabled: bool,
}

impl CacheTelemetry {
    pub(crate) const fn new(logging_enabled: bool) -> Self {
        Self { logging_enabled }
    }

    #[inline]
    pub(crate) fn record(&self, key: &str, operation: CacheOperation, activity: CacheActivity, duration: Option<Duration>) {
        if self.logging_enabled {
            Self::emit(key, operation, activity, duration, None);
        }
    }

    #[inline]
    pub(crate) fn record_failure(&self, key: &str, operation: CacheOperation, activity: CacheActivity, error: &Error) {
        if self.logging_enabled {
            Self::emit(key, operation, activity, None, Some(error));
        }
    }

    fn emit(key: &str, operation: CacheOperation, activity: CacheActivity, duration: Option<Duration>, error: Option<&Error>) {
        let op = operation.as_str();
        let ev = activity.as_str();
        let duration_ns = duration.map(|d| d.as_nanos());
        let error = error.map(tracing::field::display);

        // Tracing levels must be constant, hence one expansion per level.
        // Field names must match the constants in attributes.rs.
        macro_rules! emit_event {
            ($level:ident) => {
                tracing::$level!(
                    cache.key = key,
                    cache.operation = op,
                    cache.activity = ev,
                    cache.duration_ns = ?duration_ns,
                    error = error,
                    "cache.event"
                )
            };
        }

        match activity.level() {
            Level::ERROR => emit_event!(error),
            Level::WARN => emit_event!(warn),
            Level::INFO => emit_event!(info),
            _ => emit_event!(debug),
        }
    }
}
