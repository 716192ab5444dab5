use log::debug;

use crate::optimizer::{dedupe_entries, DedupeStats};
use crate::parser::{normalize_entry, ListError, ListKind};

/// Normalize `raw` and append it to `list` unless an equal entry exists.
///
/// Returns `Ok(false)` when the entry was already present.
pub fn add_entry(list: &mut Vec<String>, raw: &str, kind: ListKind) -> Result<bool, ListError> {
    let entry = normalize_entry(raw, kind)?;
    if list.contains(&entry) {
        debug!("{}: '{}' already listed", kind.storage_key(), entry);
        return Ok(false);
    }
    list.push(entry);
    Ok(true)
}

/// Accumulates entries for one list, normalizing and rejecting duplicates.
pub struct ListBuilder {
    kind: ListKind,
    entries: Vec<String>,
    rejected: Vec<ListError>,
}

impl ListBuilder {
    pub fn new(kind: ListKind) -> Self {
        Self {
            kind,
            entries: Vec::new(),
            rejected: Vec::new(),
        }
    }

    /// Start from an existing stored list. Stored duplicates are dropped.
    pub fn from_existing(kind: ListKind, existing: &[String]) -> (Self, DedupeStats) {
        let mut entries = existing.to_vec();
        let stats = dedupe_entries(&mut entries);
        let builder = Self {
            kind,
            entries,
            rejected: Vec::new(),
        };
        (builder, stats)
    }

    pub fn push(&mut self, raw: &str) -> bool {
        match add_entry(&mut self.entries, raw, self.kind) {
            Ok(added) => added,
            Err(e) => {
                self.rejected.push(e);
                false
            }
        }
    }

    pub fn extend<'a, I: IntoIterator<Item = &'a str>>(&mut self, raws: I) -> usize {
        raws.into_iter().filter(|raw| self.push(raw)).count()
    }

    pub fn rejected(&self) -> &[ListError] {
        &self.rejected
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn build(self) -> Vec<String> {
        self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_entry() {
        let mut list = Vec::new();
        assert_eq!(add_entry(&mut list, "https://www.Reddit.com/", ListKind::Trigger), Ok(true));
        assert_eq!(add_entry(&mut list, "reddit.com", ListKind::Trigger), Ok(false));
        assert_eq!(add_entry(&mut list, "reddit.com/r/rust", ListKind::Trigger), Ok(true));
        assert!(add_entry(&mut list, "  ", ListKind::Trigger).is_err());
        assert_eq!(list, vec!["reddit.com".to_string(), "reddit.com/r/rust".to_string()]);
    }

    #[test]
    fn test_list_builder() {
        let existing = vec!["a.org".to_string(), "a.org".to_string()];
        let (mut builder, stats) = ListBuilder::from_existing(ListKind::Destination, &existing);
        assert_eq!(stats.deduped, 1);

        let added = builder.extend(["https://b.org/page", "A.org", "", "www.c.org"]);
        assert_eq!(added, 2);
        assert_eq!(builder.rejected().len(), 1);
        assert_eq!(builder.len(), 3);
        assert!(!builder.is_empty());
        assert_eq!(builder.build(), vec!["a.org".to_string(), "b.org".to_string(), "c.org".to_string()]);
    }
}
