//! Snooze bookkeeping
//!
//! Everything here returns patches for the caller to persist; the snapshot
//! passed in is never modified.

use std::time::Duration;

use log::debug;

use crate::clock::Moment;
use crate::schedule::is_snooze_blocked;
use crate::settings::{Settings, SettingsPatch};
use crate::url::parse_pattern;

const MS_PER_MINUTE: i64 = 60_000;

/// What the popup shows as the extension status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Focus mode is on; snoozes are ignored
    Focus,
    /// A block schedule is in force; snoozing has no effect
    ScheduleBlocked,
    /// Global snooze active until the given timestamp
    Snoozed { until: i64 },
    /// Redirecting normally
    Active,
}

pub fn status(settings: &Settings, now: &Moment) -> Status {
    if settings.focus_mode {
        return Status::Focus;
    }
    if is_snooze_blocked(&settings.schedules, now) {
        return Status::ScheduleBlocked;
    }
    match settings.snooze_until {
        Some(until) if now.epoch_ms < until => Status::Snoozed { until },
        _ => Status::Active,
    }
}

/// Start a global snooze lasting `minutes` from now.
pub fn snooze_for(now: &Moment, minutes: u32) -> SettingsPatch {
    SettingsPatch {
        snooze_until: Some(Some(now.epoch_ms + i64::from(minutes) * MS_PER_MINUTE)),
        ..Default::default()
    }
}

pub fn clear_snooze() -> SettingsPatch {
    SettingsPatch {
        snooze_until: Some(None),
        ..Default::default()
    }
}

/// Snooze a single trigger for `minutes`, keyed by its hostname.
pub fn snooze_site(settings: &Settings, trigger: &str, now: &Moment, minutes: u32) -> SettingsPatch {
    let mut sites = settings.snoozed_sites.clone();
    sites.insert(
        parse_pattern(trigger).hostname.to_string(),
        now.epoch_ms + i64::from(minutes) * MS_PER_MINUTE,
    );
    SettingsPatch {
        snoozed_sites: Some(sites),
        ..Default::default()
    }
}

/// Clear a global snooze that has already run out.
///
/// Run when the extension starts so a stale expiry doesn't linger in storage.
pub fn cleanup_expired_snooze(settings: &Settings, now: &Moment) -> Option<SettingsPatch> {
    match settings.snooze_until {
        Some(until) if now.epoch_ms >= until => {
            debug!("Clearing expired snooze (expired at {})", until);
            Some(clear_snooze())
        }
        _ => None,
    }
}

/// Drop expired site snoozes. `None` when nothing expired.
pub fn prune_site_snoozes(settings: &Settings, now: &Moment) -> Option<SettingsPatch> {
    let live: std::collections::BTreeMap<String, i64> = settings
        .snoozed_sites
        .iter()
        .filter(|(_, until)| now.epoch_ms < **until)
        .map(|(site, until)| (site.clone(), *until))
        .collect();

    if live.len() == settings.snoozed_sites.len() {
        return None;
    }
    debug!("Pruned {} expired site snoozes", settings.snoozed_sites.len() - live.len());
    Some(SettingsPatch {
        snoozed_sites: Some(live),
        ..Default::default()
    })
}

/// Time left on an active global snooze.
pub fn snooze_remaining(settings: &Settings, now: &Moment) -> Option<Duration> {
    let until = settings.snooze_until?;
    let left = until - now.epoch_ms;
    if left > 0 {
        Some(Duration::from_millis(left as u64))
    } else {
        None
    }
}

/// Render remaining time as "1h 30m", "2h" or "45m", rounding minutes up.
pub fn format_remaining(remaining: Duration) -> String {
    let millis = remaining.as_millis();
    let minutes = (millis + 59_999) / 60_000;
    if minutes >= 60 {
        let hours = minutes / 60;
        let mins = minutes % 60;
        if mins > 0 {
            format!("{}h {}m", hours, mins)
        } else {
            format!("{}h", hours)
        }
    } else {
        format!("{}m", minutes)
    }
}
