//! Wall-clock types for timeframe gating.
//!
//! Triggers may be restricted to a daily window of local time. Clock times are
//! kept as zero-padded `HH:MM` strings so that window checks are plain
//! lexicographic comparisons.

use std::fmt;
use std::sync::OnceLock;

use chrono::{DateTime, FixedOffset, Local};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

fn clock_time_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([01][0-9]|2[0-3]):[0-5][0-9]$").expect("static clock time pattern"))
}

/// A local wall-clock time of day in zero-padded `HH:MM` form.
///
/// # Examples
///
/// ```
/// use geoprox::ClockTime;
///
/// let t = ClockTime::parse("08:30").unwrap();
/// assert_eq!(t.as_str(), "08:30");
/// assert!(ClockTime::parse("8:30").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClockTime(String);

impl ClockTime {
    /// Parses a zero-padded 24-hour `HH:MM` string.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidClockTime` for anything else.
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        let trimmed = value.trim();
        if clock_time_regex().is_match(trimmed) {
            Ok(Self(trimmed.to_string()))
        } else {
            Err(ValidationError::InvalidClockTime {
                value: value.to_string(),
            })
        }
    }

    /// The time of day of `instant`, in the instant's own offset.
    #[must_use]
    pub fn of(instant: &DateTime<FixedOffset>) -> Self {
        Self(instant.format("%H:%M").to_string())
    }

    /// Returns the `HH:MM` text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ClockTime {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ClockTime> for String {
    fn from(value: ClockTime) -> Self {
        value.0
    }
}

/// A daily window of local time, inclusive at both ends.
///
/// An inverted window (`start > end`) contains no time at all; windows do not
/// wrap past midnight.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Timeframe {
    /// First minute of the window (inclusive).
    pub start: ClockTime,
    /// Last minute of the window (inclusive).
    pub end: ClockTime,
}

impl Timeframe {
    /// Creates a timeframe from two `HH:MM` strings.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidClockTime` if either bound is malformed.
    pub fn new(start: &str, end: &str) -> Result<Self, ValidationError> {
        Ok(Self {
            start: ClockTime::parse(start)?,
            end: ClockTime::parse(end)?,
        })
    }

    /// Check if a clock time falls within `[start, end]`.
    #[must_use]
    pub fn contains(&self, time: &ClockTime) -> bool {
        time.as_str() >= self.start.as_str() && time.as_str() <= self.end.as_str()
    }

    /// Check if the local time of `instant` falls within the window.
    #[must_use]
    pub fn contains_instant(&self, instant: &DateTime<FixedOffset>) -> bool {
        self.contains(&ClockTime::of(instant))
    }
}

/// Source of the evaluation instant.
///
/// The offset of the returned instant defines "local" for timeframe checks.
pub trait Clock: Send + Sync {
    /// The current instant in local time.
    fn now(&self) -> DateTime<FixedOffset>;
}

/// Host wall clock in the host's local timezone.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Local::now().fixed_offset()
    }
}

/// A clock frozen at one instant, for deterministic evaluation.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<FixedOffset>);

impl FixedClock {
    /// A fixed clock at `HH:MM` on 2024-01-01 in UTC.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidClockTime` if `hhmm` is malformed.
    pub fn at(hhmm: &str) -> Result<Self, ValidationError> {
        let time = ClockTime::parse(hhmm)?;
        let text = format!("2024-01-01T{}:00+00:00", time.as_str());
        DateTime::parse_from_rfc3339(&text)
            .map(Self)
            .map_err(|_| ValidationError::InvalidClockTime {
                value: hhmm.to_string(),
            })
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        self.0
    }
}
