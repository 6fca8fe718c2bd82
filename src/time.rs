//! Timestamps and candle timeframes.

use crate::error::TimeError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Re-export of `chrono::Duration`, used wherever the spec calls for an
/// elapsed-time value (ROI schedule thresholds convert minutes to this).
pub type Duration = chrono::Duration;

/// A UTC instant. Newtype over `chrono::DateTime<Utc>` so candle and signal
/// timestamps can't be accidentally compared against naive/local times.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    pub fn now() -> Self {
        Timestamp(Utc::now())
    }

    pub fn from_millis(ms: i64) -> Self {
        Timestamp(DateTime::from_timestamp_millis(ms).unwrap_or_else(|| DateTime::from_timestamp(0, 0).unwrap()))
    }

    pub fn to_millis(self) -> i64 {
        self.0.timestamp_millis()
    }

    pub fn from_iso8601(s: &str) -> Result<Self, TimeError> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| Timestamp(dt.with_timezone(&Utc)))
            .map_err(|_| TimeError::InvalidFormat(s.to_string()))
    }

    pub fn to_iso8601(self) -> String {
        self.0.to_rfc3339()
    }

    pub fn checked_add(self, duration: Duration) -> Option<Self> {
        self.0.checked_add_signed(duration).map(Timestamp)
    }

    /// Floors this timestamp to the start of its containing `timeframe`
    /// bucket. Idempotent: `align(align(t)) == align(t)`.
    pub fn align(self, timeframe: Timeframe) -> Self {
        let period_ms = timeframe.as_duration().num_milliseconds();
        let ms = self.0.timestamp_millis();
        let floored = ms.div_euclid(period_ms) * period_ms;
        Timestamp::from_millis(floored)
    }

    pub fn inner(self) -> DateTime<Utc> {
        self.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_iso8601())
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Timestamp(dt)
    }
}

/// Candle aggregation interval. A closed set — the engine only ever aligns
/// and compares against one of these, never an arbitrary duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    M1,
    M5,
    M15,
    H1,
    H4,
    D1,
}

impl Timeframe {
    pub fn as_duration(self) -> Duration {
        match self {
            Timeframe::M1 => Duration::minutes(1),
            Timeframe::M5 => Duration::minutes(5),
            Timeframe::M15 => Duration::minutes(15),
            Timeframe::H1 => Duration::hours(1),
            Timeframe::H4 => Duration::hours(4),
            Timeframe::D1 => Duration::days(1),
        }
    }

    pub fn as_minutes(self) -> i64 {
        self.as_duration().num_minutes()
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Timeframe::M1 => "1m",
            Timeframe::M5 => "5m",
            Timeframe::M15 => "15m",
            Timeframe::H1 => "1h",
            Timeframe::H4 => "4h",
            Timeframe::D1 => "1d",
        };
        write!(f, "{s}")
    }
}
