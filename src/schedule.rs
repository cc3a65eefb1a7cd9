use std::fmt;

use chrono::Timelike;
use serde::{Deserialize, Serialize};

/// Seconds in one day; the dashboard encodes times of day as seconds since midnight.
pub const SECONDS_PER_DAY: i64 = 86_400;

/// A daily recurring trigger time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeOfDay {
    pub hour: u32,
    pub minute: u32,
}

impl TimeOfDay {
    pub fn new(hour: u32, minute: u32) -> Self {
        Self { hour, minute }
    }

    /// Decompose a seconds-since-midnight value as sent by the dashboard
    /// time widgets. Values outside `0..86400` are rejected.
    pub fn from_day_seconds(seconds: i64) -> Option<Self> {
        if !(0..SECONDS_PER_DAY).contains(&seconds) {
            return None;
        }
        Some(Self {
            hour: (seconds / 3600) as u32,
            minute: ((seconds % 3600) / 60) as u32,
        })
    }

    /// Current local wall-clock time, truncated to hour/minute.
    pub fn now_local() -> Self {
        let now = chrono::Local::now();
        Self {
            hour: now.hour(),
            minute: now.minute(),
        }
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{:02}", self.hour, self.minute)
    }
}

/// The configured daily open and close times.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Schedule {
    pub open: TimeOfDay,
    pub close: TimeOfDay,
}

impl Default for Schedule {
    fn default() -> Self {
        Self {
            open: TimeOfDay::new(7, 0),
            close: TimeOfDay::new(19, 30),
        }
    }
}

impl Schedule {
    /// Whether the morning open trigger is due. This is an exact match on
    /// (hour, minute), not a "time has passed" check: the trigger is only due
    /// during the single matching minute. A minute skipped over by a clock
    /// jump or loop stall misses that day's trigger.
    pub fn open_due(&self, now: TimeOfDay) -> bool {
        now == self.open
    }

    /// Whether the night close trigger is due; same exact-minute semantics.
    pub fn close_due(&self, now: TimeOfDay) -> bool {
        now == self.close
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.open, self.close)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decomposes_day_seconds() {
        assert_eq!(TimeOfDay::from_day_seconds(0), Some(TimeOfDay::new(0, 0)));
        assert_eq!(
            TimeOfDay::from_day_seconds(25_200),
            Some(TimeOfDay::new(7, 0))
        );
        assert_eq!(
            TimeOfDay::from_day_seconds(70_200),
            Some(TimeOfDay::new(19, 30))
        );
        assert_eq!(
            TimeOfDay::from_day_seconds(86_399),
            Some(TimeOfDay::new(23, 59))
        );
    }

    #[test]
    fn rejects_out_of_range_day_seconds() {
        assert_eq!(TimeOfDay::from_day_seconds(-1), None);
        assert_eq!(TimeOfDay::from_day_seconds(86_400), None);
        assert_eq!(TimeOfDay::from_day_seconds(i64::MAX), None);
    }

    #[test]
    fn trigger_is_exact_minute_match() {
        let schedule = Schedule::default();
        assert!(schedule.open_due(TimeOfDay::new(7, 0)));
        assert!(!schedule.open_due(TimeOfDay::new(7, 1)));
        assert!(!schedule.open_due(TimeOfDay::new(6, 59)));
        assert!(schedule.close_due(TimeOfDay::new(19, 30)));
        assert!(!schedule.close_due(TimeOfDay::new(19, 29)));
    }

    #[test]
    fn formats_lcd_schedule_line() {
        let schedule = Schedule {
            open: TimeOfDay::new(7, 0),
            close: TimeOfDay::new(19, 30),
        };
        assert_eq!(schedule.to_string(), "7:00 - 19:30");
    }
}
