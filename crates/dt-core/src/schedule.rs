//! Weekly block schedules
//!
//! While any schedule window is in force the global snooze is ignored, so a
//! user can't snooze their way out of e.g. working hours.

use log::warn;
use serde::{Deserialize, Deserializer, Serialize};

use crate::clock::Moment;
use crate::types::DayMask;

const MINUTES_PER_DAY: u16 = 24 * 60;

/// Error type for schedule parsing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScheduleError {
    #[error("Invalid time '{0}', expected HH:MM")]
    InvalidTime(String),
    #[error("Schedule '{0}' has no valid days")]
    NoDays(String),
}

/// A recurring weekly window, as stored by the options page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    #[serde(default)]
    pub id: String,
    /// Weekday numbers, 0 = Sunday
    #[serde(default, deserialize_with = "integer_days")]
    pub days: Vec<i64>,
    /// Missing times leave the schedule unparseable, so it never blocks
    #[serde(default)]
    pub start_time: String,
    #[serde(default)]
    pub end_time: String,
}

/// Keep only integral day numbers. Strings and other values can never equal
/// a weekday and are dropped rather than failing the whole snapshot.
fn integer_days<'de, D>(deserializer: D) -> Result<Vec<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Vec<serde_json::Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(raw
        .iter()
        .filter_map(|v| {
            v.as_i64()
                .or_else(|| v.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
        })
        .collect())
}

/// A schedule with its times resolved to minutes since midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub days: DayMask,
    pub start: u16,
    pub end: u16,
}

impl Schedule {
    /// Resolve the stored strings into a window.
    pub fn window(&self) -> Result<Window, ScheduleError> {
        Ok(Window {
            days: DayMask::from_days(self.days.iter().copied()),
            start: parse_clock_time(&self.start_time)?,
            end: parse_clock_time(&self.end_time)?,
        })
    }

    /// Full validation, stricter than what the decision path needs.
    pub fn validate(&self) -> Result<Window, ScheduleError> {
        let window = self.window()?;
        if window.days.is_empty() {
            return Err(ScheduleError::NoDays(self.id.clone()));
        }
        Ok(window)
    }
}

impl Window {
    /// `end <= start` wraps past midnight.
    #[inline]
    pub fn is_overnight(&self) -> bool {
        self.end <= self.start
    }

    /// Whether the window is in force at the given local day and minute.
    ///
    /// Only the day the window starts on is checked, so an overnight window
    /// configured for Friday still covers 01:00 on Friday, not Saturday.
    pub fn covers(&self, weekday: u8, minute: u16) -> bool {
        if !self.days.contains_day(weekday) {
            return false;
        }
        if self.is_overnight() {
            minute >= self.start || minute < self.end
        } else {
            minute >= self.start && minute < self.end
        }
    }
}

/// Parse "HH:MM" into minutes since midnight.
pub fn parse_clock_time(raw: &str) -> Result<u16, ScheduleError> {
    let invalid = || ScheduleError::InvalidTime(raw.to_string());

    let (hours, minutes) = raw.trim().split_once(':').ok_or_else(invalid)?;
    if hours.is_empty() || hours.len() > 2 || minutes.len() != 2 {
        return Err(invalid());
    }
    let hours: u16 = hours.parse().map_err(|_| invalid())?;
    let minutes: u16 = minutes.parse().map_err(|_| invalid())?;
    if hours >= 24 || minutes >= 60 {
        return Err(invalid());
    }

    let total = hours * 60 + minutes;
    debug_assert!(total < MINUTES_PER_DAY);
    Ok(total)
}

/// Whether any schedule currently blocks snoozing.
///
/// Schedules that fail to parse never block; they are reported by settings
/// validation instead.
pub fn is_snooze_blocked(schedules: &[Schedule], now: &Moment) -> bool {
    schedules.iter().any(|schedule| match schedule.window() {
        Ok(window) => window.covers(now.weekday, now.minute_of_day),
        Err(e) => {
            warn!("Ignoring schedule '{}': {}", schedule.id, e);
            false
        }
    })
}
