//! Settings snapshot, partial patches and the storage seam
//!
//! The extension keeps its settings in a key-value store under camelCase keys.
//! The engine reads a fresh [`Settings`] snapshot for every decision and never
//! writes it back whole: changes are expressed as a [`SettingsPatch`] holding
//! only the touched keys, so concurrent edits from the options page survive.

use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;

use log::warn;
use serde::{Deserialize, Deserializer, Serialize};

use crate::schedule::{Schedule, ScheduleError};
use crate::types::Category;
use crate::url::{has_http_scheme, parse_pattern};

/// Error type for settings decoding.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Invalid settings JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

/// Error type for settings stores.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Failed to read settings: {0}")]
    Read(String),
    #[error("Failed to write settings: {0}")]
    Write(String),
    #[error(transparent)]
    Settings(#[from] SettingsError),
}

// =============================================================================
// Settings
// =============================================================================

/// Snapshot of the persisted extension settings.
///
/// Every key is optional in storage; absent or `null` values take the
/// defaults (empty lists and maps, no snooze, focus off, no delay).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    #[serde(deserialize_with = "null_as_default")]
    pub trigger_sites: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub destinations: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub whitelist: Vec<String>,
    /// Global snooze expiry, ms since epoch
    #[serde(deserialize_with = "lenient_timestamp")]
    pub snooze_until: Option<i64>,
    #[serde(rename = "snoozeBlockSchedules", deserialize_with = "lenient_schedules")]
    pub schedules: Vec<Schedule>,
    /// Per-site snooze expiries, ms since epoch
    #[serde(deserialize_with = "null_as_default")]
    pub snoozed_sites: BTreeMap<String, i64>,
    #[serde(deserialize_with = "null_as_default")]
    pub trigger_categories: BTreeMap<String, String>,
    #[serde(deserialize_with = "null_as_default")]
    pub destination_categories: BTreeMap<String, String>,
    #[serde(deserialize_with = "null_as_default")]
    pub redirect_stats: BTreeMap<String, u64>,
    #[serde(deserialize_with = "null_as_default")]
    pub focus_mode: bool,
    /// Milliseconds to wait before updating the tab
    #[serde(deserialize_with = "lenient_delay")]
    pub redirect_delay: u64,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Any JSON number as whole milliseconds; anything else is no snooze.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| v.as_i64().or_else(|| v.as_f64().filter(|f| f.is_finite()).map(|f| f as i64))))
}

/// Any JSON number, rounded and clamped to a non-negative delay.
fn lenient_delay<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value
        .and_then(|v| v.as_u64().or_else(|| v.as_f64().filter(|f| f.is_finite()).map(|f| f.max(0.0).round() as u64)))
        .unwrap_or(0))
}

/// Schedules that aren't even objects are dropped with a warning; the rest
/// are checked later by [`Schedule::window`].
fn lenient_schedules<'de, D>(deserializer: D) -> Result<Vec<Schedule>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Vec<serde_json::Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(raw
        .into_iter()
        .filter_map(|v| match serde_json::from_value::<Schedule>(v) {
            Ok(schedule) => Some(schedule),
            Err(e) => {
                warn!("Dropping unreadable schedule: {}", e);
                None
            }
        })
        .collect())
}

impl Settings {
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json_pretty(&self) -> Result<String, SettingsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Category of a trigger entry. Looked up by the entry as configured,
    /// then by its hostname.
    pub fn trigger_category(&self, trigger: &str) -> Option<Category> {
        self.trigger_categories
            .get(trigger)
            .or_else(|| self.trigger_categories.get(parse_pattern(trigger).hostname))
            .and_then(|label| Category::parse(label))
    }

    pub fn destination_category(&self, destination: &str) -> Option<Category> {
        self.destination_categories
            .get(destination)
            .and_then(|label| Category::parse(label))
    }

    /// Site snooze expiry for a trigger. Keyed by trigger hostname; entries
    /// keyed by the full trigger string are honored too.
    pub fn site_snooze_until(&self, trigger: &str) -> Option<i64> {
        self.snoozed_sites
            .get(parse_pattern(trigger).hostname)
            .or_else(|| self.snoozed_sites.get(trigger))
            .copied()
    }

    /// Apply a patch in place, the way the backing store merges a write.
    pub fn apply(&mut self, patch: &SettingsPatch) {
        if let Some(snooze_until) = patch.snooze_until {
            self.snooze_until = snooze_until;
        }
        if let Some(sites) = &patch.snoozed_sites {
            self.snoozed_sites = sites.clone();
        }
        if let Some(stats) = &patch.redirect_stats {
            self.redirect_stats = stats.clone();
        }
    }
}

// =============================================================================
// Settings Patch
// =============================================================================

/// Partial write containing only the changed keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    /// `Some(None)` clears the snooze and serializes as `null`
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "present_value")]
    pub snooze_until: Option<Option<i64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snoozed_sites: Option<BTreeMap<String, i64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_stats: Option<BTreeMap<String, u64>>,
}

fn present_value<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

impl SettingsPatch {
    pub fn is_empty(&self) -> bool {
        self.snooze_until.is_none() && self.snoozed_sites.is_none() && self.redirect_stats.is_none()
    }

    /// Fold a later patch into this one; later values win.
    pub fn merge(&mut self, later: SettingsPatch) {
        if later.snooze_until.is_some() {
            self.snooze_until = later.snooze_until;
        }
        if later.snoozed_sites.is_some() {
            self.snoozed_sites = later.snoozed_sites;
        }
        if later.redirect_stats.is_some() {
            self.redirect_stats = later.redirect_stats;
        }
    }

    pub fn to_json(&self) -> Result<String, SettingsError> {
        Ok(serde_json::to_string(self)?)
    }
}

// =============================================================================
// Stores
// =============================================================================

/// Read-all / write-subset access to the persisted settings.
pub trait SettingsStore {
    /// Read a fresh snapshot.
    fn load(&self) -> Result<Settings, StoreError>;

    /// Merge a partial write.
    fn persist(&self, patch: &SettingsPatch) -> Result<(), StoreError>;
}

/// In-process store, used by tests and the CLI replay.
#[derive(Debug, Default)]
pub struct MemoryStore {
    settings: Mutex<Settings>,
    writes: Mutex<Vec<SettingsPatch>>,
}

impl MemoryStore {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings: Mutex::new(settings),
            writes: Mutex::new(Vec::new()),
        }
    }

    /// Current merged settings.
    pub fn snapshot(&self) -> Settings {
        self.settings.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Every patch persisted so far, in order.
    pub fn writes(&self) -> Vec<SettingsPatch> {
        self.writes.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Replace the stored settings, as an options-page save would.
    pub fn replace(&self, settings: Settings) {
        *self.settings.lock().unwrap_or_else(|e| e.into_inner()) = settings;
    }
}

impl SettingsStore for MemoryStore {
    fn load(&self) -> Result<Settings, StoreError> {
        Ok(self.snapshot())
    }

    fn persist(&self, patch: &SettingsPatch) -> Result<(), StoreError> {
        self.settings
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .apply(patch);
        self.writes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(patch.clone());
        Ok(())
    }
}

// =============================================================================
// Validation
// =============================================================================

/// A problem found in stored settings. None of these stop the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingsIssue {
    InvalidSchedule { id: String, error: ScheduleError },
    DuplicateEntry { list: &'static str, entry: String },
    UnknownCategory { site: String, label: String },
    UnnormalizedEntry { list: &'static str, entry: String },
}

impl std::fmt::Display for SettingsIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidSchedule { id, error } => write!(f, "schedule '{}': {}", id, error),
            Self::DuplicateEntry { list, entry } => write!(f, "{}: duplicate entry '{}'", list, entry),
            Self::UnknownCategory { site, label } => write!(f, "'{}': unknown category '{}'", site, label),
            Self::UnnormalizedEntry { list, entry } => {
                write!(f, "{}: '{}' is not lowercase or keeps a scheme or www. prefix", list, entry)
            }
        }
    }
}

/// Collect everything that would make the engine behave differently from
/// what the user sees in the options page.
pub fn validate_settings(settings: &Settings) -> Vec<SettingsIssue> {
    let mut issues = Vec::new();

    for schedule in &settings.schedules {
        if let Err(error) = schedule.validate() {
            issues.push(SettingsIssue::InvalidSchedule {
                id: schedule.id.clone(),
                error,
            });
        }
    }

    let lists: [(&'static str, &[String]); 3] = [
        ("triggerSites", &settings.trigger_sites),
        ("destinations", &settings.destinations),
        ("whitelist", &settings.whitelist),
    ];
    for (list, entries) in lists {
        let mut seen = HashSet::new();
        for entry in entries {
            if !seen.insert(entry.as_str()) {
                issues.push(SettingsIssue::DuplicateEntry {
                    list,
                    entry: entry.clone(),
                });
            }
            // Destinations may carry a scheme; matched entries never can
            let stray_scheme = list != "destinations" && has_http_scheme(entry);
            if entry.starts_with("www.") || stray_scheme || entry.chars().any(|c| c.is_ascii_uppercase()) {
                issues.push(SettingsIssue::UnnormalizedEntry {
                    list,
                    entry: entry.clone(),
                });
            }
        }
    }

    let categories = settings
        .trigger_categories
        .iter()
        .chain(settings.destination_categories.iter());
    for (site, label) in categories {
        if Category::parse(label).is_none() {
            issues.push(SettingsIssue::UnknownCategory {
                site: site.clone(),
                label: label.clone(),
            });
        }
    }

    issues
}
