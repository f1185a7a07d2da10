//! Duration, date and time-of-day literal values.
//!
//! Durations are stored canonically as a signed nanosecond interval.
// std::time::Duration cannot represent negative intervals, so the
// `time` crate's Duration backs these literals.
use serde::{Deserialize, Serialize};
use time::{Date, Duration, PrimitiveDateTime, Time};

use crate::core::SourceSpan;

/// A duration literal with nanosecond resolution.
///
/// Construction is by component so that authored literals such as
/// `T#1h30m` carry no floating point rounding.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct DurationLiteral {
    #[serde(skip)]
    pub span: SourceSpan,
    pub interval: Duration,
}

impl DurationLiteral {
    /// Creates a duration from its components. Components are summed,
    /// so `from_parts(0, 1, 90, 0, 0, 0, 0)` is one hour and ninety
    /// minutes.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        days: i64,
        hours: i64,
        minutes: i64,
        seconds: i64,
        milliseconds: i64,
        microseconds: i64,
        nanoseconds: i64,
    ) -> Self {
        let interval = Duration::days(days)
            + Duration::hours(hours)
            + Duration::minutes(minutes)
            + Duration::seconds(seconds)
            + Duration::milliseconds(milliseconds)
            + Duration::microseconds(microseconds)
            + Duration::nanoseconds(nanoseconds);
        Self {
            span: SourceSpan::default(),
            interval,
        }
    }

    pub fn seconds(seconds: i64) -> Self {
        Self::from_parts(0, 0, 0, seconds, 0, 0, 0)
    }

    pub fn milliseconds(milliseconds: i64) -> Self {
        Self::from_parts(0, 0, 0, 0, milliseconds, 0, 0)
    }

    pub fn nanoseconds(nanoseconds: i64) -> Self {
        Self::from_parts(0, 0, 0, 0, 0, 0, nanoseconds)
    }

    pub fn with_span(mut self, span: SourceSpan) -> Self {
        self.span = span;
        self
    }

    /// Negates the interval.
    pub fn negated(self) -> Self {
        Self {
            span: self.span,
            interval: -self.interval,
        }
    }

    /// The canonical value: whole nanoseconds, signed.
    pub fn as_nanoseconds(&self) -> i64 {
        self.interval.whole_nanoseconds() as i64
    }

    pub fn is_positive(&self) -> bool {
        self.interval.is_positive()
    }

    pub fn plus(&self, other: &DurationLiteral) -> Self {
        DurationLiteral {
            span: SourceSpan::join(&self.span, &other.span),
            interval: self.interval + other.interval,
        }
    }
}

/// A time-of-day literal, `TOD#HH:MM:SS`.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct TimeOfDayLiteral {
    pub value: Time,
}

impl TimeOfDayLiteral {
    pub fn new(value: Time) -> Self {
        Self { value }
    }
}

/// A date literal, `D#YYYY-MM-DD`.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct DateLiteral {
    pub value: Date,
}

impl DateLiteral {
    pub fn new(value: Date) -> Self {
        Self { value }
    }
}

/// A date-and-time literal, `DT#YYYY-MM-DD-HH:MM:SS`.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct DateAndTimeLiteral {
    pub value: PrimitiveDateTime,
}

impl DateAndTimeLiteral {
    pub fn new(value: PrimitiveDateTime) -> Self {
        Self { value }
    }
}
