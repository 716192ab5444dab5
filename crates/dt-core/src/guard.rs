//! Redirect Loop Guard
//!
//! Updating a tab fires a fresh navigation event for the destination. The
//! guard arms a tab when we redirect it and swallows exactly the next main
//! frame event for that tab, whatever its URL, then forgets the tab.

use std::collections::HashMap;
use std::sync::Mutex;

use log::trace;

use crate::types::TabId;

/// Owned map of armed tabs. Absent tabs are unarmed.
#[derive(Debug, Default)]
pub struct RedirectLoopGuard {
    armed: Mutex<HashMap<TabId, String>>,
}

impl RedirectLoopGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a tab after issuing a redirect to `destination`.
    pub fn arm(&self, tab_id: TabId, destination: &str) {
        trace!("guard: arm tab {} -> {}", tab_id, destination);
        self.lock().insert(tab_id, destination.to_string());
    }

    /// Consume the guard for a tab.
    ///
    /// Returns `true` if the tab was armed, in which case the caller must skip
    /// the event. The entry is removed either way.
    pub fn consume(&self, tab_id: TabId) -> bool {
        match self.lock().remove(&tab_id) {
            Some(destination) => {
                trace!("guard: consumed tab {} (redirected to {})", tab_id, destination);
                true
            }
            None => false,
        }
    }

    pub fn is_armed(&self, tab_id: TabId) -> bool {
        self.lock().contains_key(&tab_id)
    }

    /// Number of tabs with a redirect in flight.
    pub fn armed_count(&self) -> usize {
        self.lock().len()
    }

    /// Forget a tab, e.g. when it is closed before its redirect lands.
    pub fn forget(&self, tab_id: TabId) {
        self.lock().remove(&tab_id);
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<TabId, String>> {
        self.armed.lock().unwrap_or_else(|e| e.into_inner())
    }
}
