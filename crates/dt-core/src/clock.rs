//! Wall-clock abstraction
//!
//! Snooze expiries are absolute epoch timestamps while schedules are local
//! weekly windows, so a decision needs both views of the same instant.

use std::cell::Cell;

use chrono::{DateTime, Datelike, Local, TimeZone, Timelike};

/// A single instant seen both as an epoch timestamp and as local wall time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Moment {
    /// Milliseconds since the Unix epoch
    pub epoch_ms: i64,
    /// Local day of the week, 0 = Sunday
    pub weekday: u8,
    /// Local minutes since midnight, 0..1440
    pub minute_of_day: u16,
}

impl Moment {
    pub fn from_datetime<Tz: TimeZone>(dt: &DateTime<Tz>) -> Self {
        Self {
            epoch_ms: dt.timestamp_millis(),
            weekday: dt.weekday().num_days_from_sunday() as u8,
            minute_of_day: (dt.hour() * 60 + dt.minute()) as u16,
        }
    }

    pub fn local_now() -> Self {
        Self::from_datetime(&Local::now())
    }
}

/// Source of the current instant.
pub trait Clock {
    fn now(&self) -> Moment;
}

/// Reads the system clock in the local time zone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Moment {
        Moment::local_now()
    }
}

/// A clock pinned to a given instant, movable by hand.
#[derive(Debug, Clone)]
pub struct FixedClock {
    moment: Cell<Moment>,
}

impl FixedClock {
    pub fn new(moment: Moment) -> Self {
        Self {
            moment: Cell::new(moment),
        }
    }

    pub fn set(&self, moment: Moment) {
        self.moment.set(moment);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> Moment {
        self.moment.get()
    }
}
