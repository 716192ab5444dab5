use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DedupeStats {
    pub before: usize,
    pub after: usize,
    pub deduped: usize,
}

/// Remove duplicate entries, keeping the first occurrence.
///
/// List order matters to the matcher (earlier entries win), so surviving
/// entries keep their relative order.
pub fn dedupe_entries(entries: &mut Vec<String>) -> DedupeStats {
    let before = entries.len();

    let mut seen: HashSet<String> = HashSet::with_capacity(before);
    entries.retain(|entry| seen.insert(entry.clone()));

    let after = entries.len();

    DedupeStats {
        before,
        after,
        deduped: before - after,
    }
}

/// Entries that can never match because an earlier entry already covers them.
///
/// `reddit.com` shadows `old.reddit.com` and `reddit.com/r/rust`. These are
/// reported, not removed: the user may still want them listed.
pub fn shadowed_entries(entries: &[String]) -> Vec<(usize, usize)> {
    use dt_core::matcher::host_matches;
    use dt_core::url::parse_pattern;

    let mut shadowed = Vec::new();
    for (later_idx, later) in entries.iter().enumerate() {
        let later_pat = parse_pattern(later);
        for (earlier_idx, earlier) in entries[..later_idx].iter().enumerate() {
            let earlier_pat = parse_pattern(earlier);
            if earlier == later || !host_matches(later_pat.hostname, earlier_pat.hostname) {
                continue;
            }
            let covered = match (earlier_pat.path, later_pat.path) {
                (None, _) => true,
                (Some(prefix), Some(path)) => path.starts_with(prefix),
                (Some(_), None) => false,
            };
            if covered {
                shadowed.push((later_idx, earlier_idx));
                break;
            }
        }
    }
    shadowed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_dedupe_keeps_first_and_order() {
        let mut entries = list(&["b.com", "a.com", "b.com", "c.com", "a.com"]);
        let stats = dedupe_entries(&mut entries);
        assert_eq!(entries, list(&["b.com", "a.com", "c.com"]));
        assert_eq!(stats.before, 5);
        assert_eq!(stats.after, 3);
        assert_eq!(stats.deduped, 2);
    }

    #[test]
    fn test_dedupe_noop() {
        let mut entries = list(&["a.com"]);
        let stats = dedupe_entries(&mut entries);
        assert_eq!(stats.deduped, 0);
        assert_eq!(entries, list(&["a.com"]));
    }

    #[test]
    fn test_shadowed_entries() {
        let entries = list(&["reddit.com", "old.reddit.com", "x.com/a", "x.com/ab", "x.com", "notreddit.com"]);
        assert_eq!(shadowed_entries(&entries), vec![(1, 0), (3, 2)]);
    }
}
