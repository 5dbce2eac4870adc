//! Simulation Time Types
//!
//! Virtual time is a monotonic count of milliseconds. It never tracks the wall
//! clock; the engine's `Clock` advances it by scaled wall deltas.
//!
//! # Example
//!
//! ```
//! use agent_model::{SimTime, MS_PER_DAY};
//!
//! let t = SimTime::from_millis(MS_PER_DAY + 3_723_004);
//! assert_eq!(t.to_string(), "day_1.01:02:03.004");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Milliseconds in one simulated hour.
pub const MS_PER_HOUR: u64 = 60 * 60 * 1000;

/// Milliseconds in one simulated day.
pub const MS_PER_DAY: u64 = 24 * MS_PER_HOUR;

/// A point in virtual time, in milliseconds since the simulation epoch.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SimTime(pub u64);

impl SimTime {
    pub const ZERO: SimTime = SimTime(0);

    pub fn from_millis(ms: u64) -> Self {
        Self(ms)
    }

    pub fn as_millis(self) -> u64 {
        self.0
    }

    /// Returns this time shifted forward, saturating at `u64::MAX`.
    pub fn saturating_add(self, ms: u64) -> Self {
        Self(self.0.saturating_add(ms))
    }

    /// Milliseconds elapsed since `earlier`; zero if `earlier` is later.
    pub fn millis_since(self, earlier: SimTime) -> u64 {
        self.0.saturating_sub(earlier.0)
    }

    /// Fractional days elapsed since `earlier`.
    pub fn days_since(self, earlier: SimTime) -> f64 {
        self.millis_since(earlier) as f64 / MS_PER_DAY as f64
    }

    /// Whole simulated days since the epoch.
    pub fn day(self) -> u64 {
        self.0 / MS_PER_DAY
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let within_day = self.0 % MS_PER_DAY;
        let hours = within_day / MS_PER_HOUR;
        let minutes = (within_day / 60_000) % 60;
        let seconds = (within_day / 1000) % 60;
        let millis = within_day % 1000;
        write!(
            f,
            "day_{}.{:02}:{:02}:{:02}.{:03}",
            self.day(),
            hours,
            minutes,
            seconds,
            millis
        )
    }
}

/// Error type for parsing SimTime from strings.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseTimeError {
    InvalidFormat(String),
    InvalidDay(String),
    InvalidClock(String),
}

impl fmt::Display for ParseTimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseTimeError::InvalidFormat(s) => {
                write!(f, "invalid time format: '{}', expected 'day_N.HH:MM:SS.mmm'", s)
            }
            ParseTimeError::InvalidDay(s) => write!(f, "invalid day: '{}'", s),
            ParseTimeError::InvalidClock(s) => write!(f, "invalid time of day: '{}'", s),
        }
    }
}

impl std::error::Error for ParseTimeError {}

impl FromStr for SimTime {
    type Err = ParseTimeError;

    /// Parses a SimTime from a string like "day_3.07:15:00.250".
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (day_part, clock_part) = s
            .split_once('.')
            .ok_or_else(|| ParseTimeError::InvalidFormat(s.to_string()))?;

        let day = day_part
            .strip_prefix("day_")
            .ok_or_else(|| ParseTimeError::InvalidFormat(s.to_string()))?
            .parse::<u64>()
            .map_err(|_| ParseTimeError::InvalidDay(day_part.to_string()))?;

        let (hms, millis) = clock_part
            .split_once('.')
            .ok_or_else(|| ParseTimeError::InvalidClock(clock_part.to_string()))?;
        let fields: Vec<&str> = hms.split(':').collect();
        if fields.len() != 3 {
            return Err(ParseTimeError::InvalidClock(clock_part.to_string()));
        }

        let parse_field = |field: &str, max: u64| -> Result<u64, ParseTimeError> {
            field
                .parse::<u64>()
                .ok()
                .filter(|v| *v < max)
                .ok_or_else(|| ParseTimeError::InvalidClock(clock_part.to_string()))
        };
        let hours = parse_field(fields[0], 24)?;
        let minutes = parse_field(fields[1], 60)?;
        let seconds = parse_field(fields[2], 60)?;
        let millis = parse_field(millis, 1000)?;

        let within_day = hours * MS_PER_HOUR + minutes * 60_000 + seconds * 1000 + millis;
        day.checked_mul(MS_PER_DAY)
            .and_then(|ms| ms.checked_add(within_day))
            .map(SimTime)
            .ok_or_else(|| ParseTimeError::InvalidDay(day_part.to_string()))
    }
}
