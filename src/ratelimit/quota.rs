//! Admission quota: how many requests fit into one sliding window.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{Result, SluiceError};

/// Time unit a limit is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Nanosecond,
    Microsecond,
    Millisecond,
    Second,
    Minute,
    Hour,
    Day,
}

impl TimeUnit {
    /// Get the duration of a single unit.
    pub fn duration(&self) -> Duration {
        match self {
            TimeUnit::Nanosecond => Duration::from_nanos(1),
            TimeUnit::Microsecond => Duration::from_micros(1),
            TimeUnit::Millisecond => Duration::from_millis(1),
            TimeUnit::Second => Duration::from_secs(1),
            TimeUnit::Minute => Duration::from_secs(60),
            TimeUnit::Hour => Duration::from_secs(3600),
            TimeUnit::Day => Duration::from_secs(86400),
        }
    }

    /// Whether this unit is finer than the limiter's millisecond resolution.
    pub fn is_sub_millisecond(&self) -> bool {
        matches!(self, TimeUnit::Nanosecond | TimeUnit::Microsecond)
    }
}

impl std::fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TimeUnit::Nanosecond => "nanosecond",
            TimeUnit::Microsecond => "microsecond",
            TimeUnit::Millisecond => "millisecond",
            TimeUnit::Second => "second",
            TimeUnit::Minute => "minute",
            TimeUnit::Hour => "hour",
            TimeUnit::Day => "day",
        };
        f.write_str(name)
    }
}

/// Maximum number of admissions allowed within a trailing window.
///
/// A quota is validated once at construction and never changes afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quota {
    limit: u32,
    window: Duration,
}

impl Quota {
    /// Create a quota of `limit` admissions per `window`.
    ///
    /// The window must be at least one millisecond and a whole number of
    /// milliseconds.
    pub fn new(limit: u32, window: Duration) -> Result<Self> {
        if limit == 0 {
            return Err(SluiceError::InvalidConfiguration(
                "limit must be at least 1".to_string(),
            ));
        }
        if window < Duration::from_millis(1) {
            return Err(SluiceError::InvalidConfiguration(format!(
                "window of {:?} is shorter than one millisecond",
                window
            )));
        }
        if window.subsec_nanos() % 1_000_000 != 0 {
            return Err(SluiceError::InvalidConfiguration(format!(
                "window of {:?} is not a whole number of milliseconds",
                window
            )));
        }
        Ok(Self { limit, window })
    }

    /// Create a quota of `limit` admissions per single `unit`.
    pub fn per_unit(unit: TimeUnit, limit: u32) -> Result<Self> {
        if unit.is_sub_millisecond() {
            return Err(SluiceError::InvalidConfiguration(format!(
                "time unit '{}' is not allowed, use 'millisecond' instead",
                unit
            )));
        }
        Self::new(limit, unit.duration())
    }

    /// Get the maximum admissions per window.
    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Get the window duration.
    pub fn window(&self) -> Duration {
        self.window
    }
}
