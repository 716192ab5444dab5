//! Redirect counters
//!
//! Counters are keyed by the hostname of the trigger that fired and only ever
//! go up. Each increment is emitted as a patch carrying the full map, built
//! from the snapshot the decision was made on.

use std::collections::BTreeMap;

use crate::settings::SettingsPatch;
use crate::url::parse_pattern;

/// Counter key for a trigger entry: its hostname.
#[inline]
pub fn stats_key(trigger: &str) -> &str {
    parse_pattern(trigger).hostname
}

/// Patch incrementing the counter for `trigger` by one.
pub fn record_redirect(stats: &BTreeMap<String, u64>, trigger: &str) -> SettingsPatch {
    let mut updated = stats.clone();
    let count = updated.entry(stats_key(trigger).to_string()).or_insert(0);
    *count = count.saturating_add(1);

    SettingsPatch {
        redirect_stats: Some(updated),
        ..Default::default()
    }
}

pub fn redirect_count(stats: &BTreeMap<String, u64>, trigger: &str) -> u64 {
    stats.get(stats_key(trigger)).copied().unwrap_or(0)
}

pub fn total_redirects(stats: &BTreeMap<String, u64>) -> u64 {
    stats.values().fold(0u64, |acc, n| acc.saturating_add(*n))
}

/// Administrative reset. Never issued by the decision path.
pub fn reset_stats() -> SettingsPatch {
    SettingsPatch {
        redirect_stats: Some(BTreeMap::new()),
        ..Default::default()
    }
}

/// Counters sorted by count, highest first; ties by hostname.
pub fn top_triggers(stats: &BTreeMap<String, u64>) -> Vec<(&str, u64)> {
    let mut entries: Vec<(&str, u64)> = stats.iter().map(|(k, v)| (k.as_str(), *v)).collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    entries
}
