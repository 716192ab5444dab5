//! Trigger and Whitelist Matching
//!
//! Both lists are scanned linearly in configured order and the first entry
//! that matches wins. Earlier entries take precedence, so the scan order must
//! not change.

use crate::settings::Settings;
use crate::url::{parse_pattern, ParsedUrl, SitePattern};

// =============================================================================
// Matcher
// =============================================================================

/// Matches navigation URLs against the trigger and whitelist entries of a
/// settings snapshot.
pub struct Matcher<'a> {
    triggers: &'a [String],
    whitelist: &'a [String],
}

impl<'a> Matcher<'a> {
    pub fn new(settings: &'a Settings) -> Self {
        Self::from_lists(&settings.trigger_sites, &settings.whitelist)
    }

    pub fn from_lists(triggers: &'a [String], whitelist: &'a [String]) -> Self {
        Self { triggers, whitelist }
    }

    /// First trigger entry matching the URL, as configured.
    pub fn match_trigger(&self, url: &ParsedUrl) -> Option<&'a str> {
        match_first(url, self.triggers)
    }

    /// Whether any whitelist entry matches the URL.
    pub fn is_whitelisted(&self, url: &ParsedUrl) -> bool {
        match_first(url, self.whitelist).is_some()
    }
}

// =============================================================================
// Pattern Matching
// =============================================================================

/// Return the first pattern in list order that matches the URL.
pub fn match_first<'p, S: AsRef<str>>(url: &ParsedUrl, patterns: &'p [S]) -> Option<&'p str> {
    patterns
        .iter()
        .map(|p| p.as_ref())
        .find(|p| pattern_matches(url, &parse_pattern(p)))
}

/// Check a single pattern against a parsed URL.
#[inline]
pub fn pattern_matches(url: &ParsedUrl, pattern: &SitePattern<'_>) -> bool {
    if !host_matches(&url.hostname, pattern.hostname) {
        return false;
    }

    // A path on the pattern is a raw prefix: /inbox also matches /inbox2
    match pattern.path {
        None => true,
        Some(prefix) => url.path.starts_with(prefix),
    }
}

/// Exact hostname or any subdomain of it.
#[inline]
pub fn host_matches(host: &str, pattern_host: &str) -> bool {
    if host == pattern_host {
        return true;
    }
    host.len() > pattern_host.len()
        && host.ends_with(pattern_host)
        && host.as_bytes()[host.len() - pattern_host.len() - 1] == b'.'
}
