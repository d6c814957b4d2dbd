use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};
use tracing::warn;

use crate::error::{GlueError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurationUnit {
    Minutes,
    Hours,
    Days,
    Weeks,
}

impl DurationUnit {
    pub fn seconds(self) -> i64 {
        match self {
            DurationUnit::Minutes => 60,
            DurationUnit::Hours => 3_600,
            DurationUnit::Days => 86_400,
            DurationUnit::Weeks => 604_800,
        }
    }

    /// Unknown unit names fall back to minutes rather than failing.
    pub fn parse_or_minutes(units: &str) -> Self {
        match units {
            "minutes" => DurationUnit::Minutes,
            "hours" => DurationUnit::Hours,
            "days" => DurationUnit::Days,
            "weeks" => DurationUnit::Weeks,
            other => {
                warn!(units = %other, "Unknown silence duration unit, using minutes.");
                DurationUnit::Minutes
            }
        }
    }
}

/// `start + duration * unit`, failing only when the result leaves chrono's range.
pub fn end_timestamp(start: DateTime<Utc>, duration: i64, units: &str) -> Result<DateTime<Utc>> {
    let unit = DurationUnit::parse_or_minutes(units);
    duration
        .checked_mul(unit.seconds())
        .and_then(TimeDelta::try_seconds)
        .and_then(|offset| start.checked_add_signed(offset))
        .ok_or_else(|| {
            GlueError::Configuration(format!("Silence duration {duration} {units} is out of range"))
        })
}

/// End of a window of `duration` `units` starting now.
pub fn get_end_timestamp(duration: i64, units: &str) -> Result<DateTime<Utc>> {
    end_timestamp(Utc::now(), duration, units)
}

/// ISO-8601 in UTC with a `Z` suffix, as the silence API expects.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}
