use log::debug;

use dt_core::url::parse_pattern;

/// Error type for list entries.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ListError {
    #[error("Entry '{0}' is empty after normalization")]
    Empty(String),
    #[error("Entry '{0}' has no valid hostname")]
    InvalidHost(String),
}

/// Which list an entry is written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Trigger,
    Whitelist,
    Destination,
}

impl ListKind {
    /// Triggers and whitelist entries may target a path; destinations are
    /// bare sites.
    pub fn keeps_path(&self) -> bool {
        !matches!(self, Self::Destination)
    }

    pub fn storage_key(&self) -> &'static str {
        match self {
            Self::Trigger => "triggerSites",
            Self::Whitelist => "whitelist",
            Self::Destination => "destinations",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "trigger" | "triggers" | "triggerSites" => Some(Self::Trigger),
            "whitelist" | "allow" => Some(Self::Whitelist),
            "destination" | "destinations" => Some(Self::Destination),
            _ => None,
        }
    }
}

/// Normalize raw site input the way the options page stores it.
///
/// Lowercases, drops an http(s) scheme and a leading `www.`. With
/// `keep_path` a single trailing slash is removed; without it everything from
/// the first slash is dropped. Returns `None` if nothing is left.
pub fn normalize_site(input: &str, keep_path: bool) -> Option<String> {
    let lowered = input.trim().to_lowercase();
    let mut site = lowered.as_str();
    site = site
        .strip_prefix("https://")
        .or_else(|| site.strip_prefix("http://"))
        .unwrap_or(site);
    site = site.strip_prefix("www.").unwrap_or(site);

    if keep_path {
        site = site.strip_suffix('/').unwrap_or(site);
    } else if let Some(slash) = site.find('/') {
        site = &site[..slash];
    }

    if site.is_empty() {
        None
    } else {
        Some(site.to_string())
    }
}

/// Normalize and check a single entry for the given list.
pub fn normalize_entry(input: &str, kind: ListKind) -> Result<String, ListError> {
    let site = normalize_site(input, kind.keeps_path()).ok_or_else(|| ListError::Empty(input.to_string()))?;

    let host = parse_pattern(&site).hostname;
    if host.is_empty() || host.chars().any(char::is_whitespace) {
        return Err(ListError::InvalidHost(input.to_string()));
    }
    Ok(site)
}

/// Parse a newline-separated site list.
///
/// Blank lines and lines starting with `#` or `!` are comments. Lines that
/// fail to normalize are skipped.
pub fn parse_site_list(text: &str, kind: ListKind) -> Vec<String> {
    let mut entries = Vec::new();

    for line in list_lines(text) {
        match normalize_entry(line, kind) {
            Ok(entry) => entries.push(entry),
            Err(e) => debug!("Skipping {} line: {}", kind.storage_key(), e),
        }
    }

    entries
}

/// Trimmed lines of a site list with blanks and comments removed.
pub fn list_lines(text: &str) -> impl Iterator<Item = &str> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !is_comment_line(line))
}

fn is_comment_line(line: &str) -> bool {
    line.starts_with('#') || line.starts_with('!')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_site_keep_path() {
        assert_eq!(normalize_site("https://www.Substack.com/inbox/", true), Some("substack.com/inbox".into()));
        assert_eq!(normalize_site("  reddit.com  ", true), Some("reddit.com".into()));
        assert_eq!(normalize_site("http://example.com/", true), Some("example.com".into()));
        // Only one trailing slash goes
        assert_eq!(normalize_site("example.com/a//", true), Some("example.com/a/".into()));
    }

    #[test]
    fn test_normalize_site_drop_path() {
        assert_eq!(normalize_site("https://www.Wikipedia.org/wiki/Rust", false), Some("wikipedia.org".into()));
        assert_eq!(normalize_site("example.org", false), Some("example.org".into()));
    }

    #[test]
    fn test_normalize_site_empty() {
        assert_eq!(normalize_site("", true), None);
        assert_eq!(normalize_site("   ", false), None);
        assert_eq!(normalize_site("https://", false), None);
        assert_eq!(normalize_site("www.", true), None);
    }

    #[test]
    fn test_normalize_entry() {
        assert_eq!(normalize_entry("YouTube.com/Shorts", ListKind::Trigger), Ok("youtube.com/shorts".into()));
        assert_eq!(normalize_entry("youtube.com/shorts", ListKind::Destination), Ok("youtube.com".into()));
        assert_eq!(normalize_entry("/inbox", ListKind::Trigger), Err(ListError::InvalidHost("/inbox".into())));
        assert_eq!(normalize_entry("my site.com", ListKind::Trigger), Err(ListError::InvalidHost("my site.com".into())));
        assert_eq!(normalize_entry("", ListKind::Whitelist), Err(ListError::Empty("".into())));
    }

    #[test]
    fn test_parse_site_list() {
        let text = "# distractions\nreddit.com\n\n! legacy comment\nhttps://www.YouTube.com/shorts/\n/broken\n";
        let entries = parse_site_list(text, ListKind::Trigger);
        assert_eq!(entries, vec!["reddit.com".to_string(), "youtube.com/shorts".to_string()]);

        let entries = parse_site_list(text, ListKind::Destination);
        assert_eq!(entries, vec!["reddit.com".to_string(), "youtube.com".to_string()]);
    }

    #[test]
    fn test_list_lines() {
        let lines: Vec<&str> = list_lines("  a.com  \n#x\n\n!y\n b.com/p\n").collect();
        assert_eq!(lines, vec!["a.com", "b.com/p"]);
    }

    #[test]
    fn test_list_kind() {
        assert_eq!(ListKind::from_str("trigger"), Some(ListKind::Trigger));
        assert_eq!(ListKind::from_str("destinations"), Some(ListKind::Destination));
        assert_eq!(ListKind::from_str("nope"), None);
        assert!(ListKind::Whitelist.keeps_path());
        assert!(!ListKind::Destination.keeps_path());
    }
}
