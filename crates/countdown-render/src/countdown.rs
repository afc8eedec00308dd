//! Remaining-time arithmetic against a fixed deadline

use chrono::{DateTime, FixedOffset, ParseError, Utc};

const SECS_PER_DAY: u64 = 86_400;
const SECS_PER_HOUR: u64 = 3_600;
const SECS_PER_MINUTE: u64 = 60;

/// Time left until the deadline, split into display fields
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemainingTime {
    pub days: u64,
    pub hours: u32,
    pub minutes: u32,
    pub seconds: u32,
    pub is_elapsed: bool,
}

impl RemainingTime {
    /// The terminal state once the deadline has passed
    pub const ELAPSED: Self = Self {
        days: 0,
        hours: 0,
        minutes: 0,
        seconds: 0,
        is_elapsed: true,
    };

    /// Decompose a whole number of seconds. Each field is the remainder of the
    /// coarser division, so the fields always add back up to `total`.
    pub fn from_total_seconds(total: u64) -> Self {
        let days = total / SECS_PER_DAY;
        let rest = total % SECS_PER_DAY;
        let hours = rest / SECS_PER_HOUR;
        let rest = rest % SECS_PER_HOUR;
        let minutes = rest / SECS_PER_MINUTE;
        let seconds = rest % SECS_PER_MINUTE;

        Self {
            days,
            hours: hours as u32,
            minutes: minutes as u32,
            seconds: seconds as u32,
            is_elapsed: false,
        }
    }

    pub fn total_seconds(&self) -> u64 {
        self.days * SECS_PER_DAY
            + u64::from(self.hours) * SECS_PER_HOUR
            + u64::from(self.minutes) * SECS_PER_MINUTE
            + u64::from(self.seconds)
    }

    /// Zero-padded display values in days, hours, minutes, seconds order
    pub fn digits(&self) -> [String; 4] {
        [
            format!("{:02}", self.days),
            format!("{:02}", self.hours),
            format!("{:02}", self.minutes),
            format!("{:02}", self.seconds),
        ]
    }
}

/// A fixed deadline, set once at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Countdown {
    target: DateTime<FixedOffset>,
}

impl Countdown {
    pub fn new(target: DateTime<FixedOffset>) -> Self {
        Self { target }
    }

    /// Parse an RFC 3339 timestamp such as `2026-12-31T00:00:00+02:00`
    pub fn parse(target: &str) -> Result<Self, ParseError> {
        DateTime::parse_from_rfc3339(target.trim()).map(Self::new)
    }

    pub fn target(&self) -> DateTime<FixedOffset> {
        self.target
    }

    /// Time left at `now`, floored to whole seconds
    pub fn remaining(&self, now: DateTime<Utc>) -> RemainingTime {
        let diff_ms = (self.target.with_timezone(&Utc) - now).num_milliseconds();
        if diff_ms <= 0 {
            return RemainingTime::ELAPSED;
        }
        RemainingTime::from_total_seconds(diff_ms as u64 / 1000)
    }
}
