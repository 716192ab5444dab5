//! URL and site-pattern parsing
//!
//! Navigation URLs go through a full WHATWG parse. Trigger, whitelist and
//! destination entries are plain site strings and are only split, never
//! validated.

use std::borrow::Cow;

use url::Url;

const WWW_PREFIX: &str = "www.";

// =============================================================================
// Parsed URL
// =============================================================================

/// Hostname and path of a navigation URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedUrl {
    /// Lowercase hostname with a single leading `www.` removed
    pub hostname: String,
    /// Path component, `/` when the URL has none
    pub path: String,
}

/// Parse a navigation URL.
///
/// Returns `None` when the URL is malformed; callers treat that as "matches
/// nothing" rather than an error.
pub fn parse_url(raw: &str) -> Option<ParsedUrl> {
    let parsed = Url::parse(raw).ok()?;
    let host = parsed.host_str().unwrap_or("");
    let path = match parsed.path() {
        "" => "/",
        path => path,
    };

    Some(ParsedUrl {
        hostname: strip_www(host).to_string(),
        path: path.to_string(),
    })
}

// =============================================================================
// Site Patterns
// =============================================================================

/// A trigger or whitelist entry split into hostname and optional path prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SitePattern<'a> {
    pub hostname: &'a str,
    pub path: Option<&'a str>,
}

/// Split a site pattern at its first `/`.
///
/// The leading `www.` is stripped; nothing else is normalized. Lowercasing and
/// trailing-slash cleanup happen when the entry is written.
#[inline]
pub fn parse_pattern(raw: &str) -> SitePattern<'_> {
    let normalized = strip_www(raw);
    match normalized.find('/') {
        Some(slash) => SitePattern {
            hostname: &normalized[..slash],
            path: Some(&normalized[slash..]),
        },
        None => SitePattern {
            hostname: normalized,
            path: None,
        },
    }
}

/// Remove a single leading `www.`.
#[inline]
pub fn strip_www(host: &str) -> &str {
    host.strip_prefix(WWW_PREFIX).unwrap_or(host)
}

// =============================================================================
// Destination Formatting
// =============================================================================

/// Check whether a site string already carries an http(s) scheme.
#[inline]
pub fn has_http_scheme(site: &str) -> bool {
    site.starts_with("http://") || site.starts_with("https://")
}

/// Render a destination entry as a fully-qualified URL.
pub fn format_destination_url(destination: &str) -> Cow<'_, str> {
    if has_http_scheme(destination) {
        Cow::Borrowed(destination)
    } else {
        Cow::Owned(format!("https://{}", destination))
    }
}
