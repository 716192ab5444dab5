//! Core type definitions for Detour
//!
//! These types cross the boundary between the decision engine and the
//! extension glue (background script, CLI) and are shared by every module.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::settings::SettingsPatch;

/// Browser tab identifier.
pub type TabId = i32;

// =============================================================================
// Categories
// =============================================================================

/// Label shared by triggers and destinations for filtered selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Social,
    News,
    Video,
    Shopping,
    Work,
    Learning,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Self::Social,
        Self::News,
        Self::Video,
        Self::Shopping,
        Self::Work,
        Self::Learning,
    ];

    /// Parse a stored category label. Unknown labels are treated as absent.
    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "social" => Some(Self::Social),
            "news" => Some(Self::News),
            "video" => Some(Self::Video),
            "shopping" => Some(Self::Shopping),
            "work" => Some(Self::Work),
            "learning" => Some(Self::Learning),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Social => "social",
            Self::News => "news",
            Self::Video => "video",
            Self::Shopping => "shopping",
            Self::Work => "work",
            Self::Learning => "learning",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Day Masks
// =============================================================================

bitflags::bitflags! {
    /// Days of the week a schedule applies to. Bit `n` is weekday `n`, 0 = Sunday.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct DayMask: u8 {
        const SUNDAY = 1 << 0;
        const MONDAY = 1 << 1;
        const TUESDAY = 1 << 2;
        const WEDNESDAY = 1 << 3;
        const THURSDAY = 1 << 4;
        const FRIDAY = 1 << 5;
        const SATURDAY = 1 << 6;

        /// Monday through Friday
        const WEEKDAYS = Self::MONDAY.bits()
            | Self::TUESDAY.bits()
            | Self::WEDNESDAY.bits()
            | Self::THURSDAY.bits()
            | Self::FRIDAY.bits();
        /// Saturday and Sunday
        const WEEKEND = Self::SATURDAY.bits() | Self::SUNDAY.bits();
        const ALL = 0x7F;
    }
}

impl DayMask {
    /// Mask for a single weekday number (0 = Sunday). None when out of range.
    pub fn from_day(day: i64) -> Option<Self> {
        if (0..7).contains(&day) {
            Self::from_bits(1 << day)
        } else {
            None
        }
    }

    /// Build a mask from weekday numbers, ignoring anything outside 0–6.
    pub fn from_days<I: IntoIterator<Item = i64>>(days: I) -> Self {
        days.into_iter()
            .filter_map(Self::from_day)
            .fold(Self::empty(), |mask, day| mask | day)
    }

    #[inline]
    pub fn contains_day(&self, day: u8) -> bool {
        Self::from_day(day as i64).map_or(false, |d| self.contains(d))
    }
}

// =============================================================================
// Navigation Event
// =============================================================================

/// A navigation attempt reported by the browser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationEvent {
    pub tab_id: TabId,
    pub url: String,
    #[serde(default = "default_main_frame")]
    pub is_main_frame: bool,
}

fn default_main_frame() -> bool {
    true
}

impl NavigationEvent {
    pub fn main_frame(tab_id: TabId, url: impl Into<String>) -> Self {
        Self {
            tab_id,
            url: url.into(),
            is_main_frame: true,
        }
    }

    pub fn sub_frame(tab_id: TabId, url: impl Into<String>) -> Self {
        Self {
            tab_id,
            url: url.into(),
            is_main_frame: false,
        }
    }
}

// =============================================================================
// Outcome
// =============================================================================

/// Why a navigation was left unmodified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllowReason {
    /// The URL could not be parsed
    InvalidUrl,
    /// No trigger matched
    NoTrigger,
    /// A trigger matched but a whitelist entry cancelled it
    Whitelisted,
    /// A trigger matched but there was nowhere to send the tab
    NoDestination,
    /// The settings snapshot could not be read
    SettingsUnavailable,
}

/// Temporary suppression that let a navigation through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Suppression {
    /// Global snooze active until the given timestamp (ms since epoch)
    GlobalSnooze { until: i64 },
    /// The matched trigger is snoozed until the given timestamp
    SiteSnooze { trigger: String, until: i64 },
}

/// A redirect the execution side must carry out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub tab_id: TabId,
    /// Fully-qualified destination URL
    pub destination_url: String,
    /// Trigger entry that matched, as configured
    pub trigger: String,
    /// Delay before updating the tab, from the `redirectDelay` setting
    pub delay_ms: u64,
    /// Stats write to persist alongside the redirect
    pub patch: SettingsPatch,
}

/// Terminal outcome of one navigation event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Sub-frame navigation, never evaluated
    SkippedSubFrame,
    /// First navigation after our own redirect on this tab
    SkippedByGuard,
    /// Navigation proceeds unmodified
    Allowed(AllowReason),
    /// Navigation proceeds unmodified because of a snooze
    Suppressed(Suppression),
    /// Navigation is redirected
    Redirect(Redirect),
}

impl Outcome {
    pub fn is_redirect(&self) -> bool {
        matches!(self, Self::Redirect(_))
    }

    pub fn redirect(&self) -> Option<&Redirect> {
        match self {
            Self::Redirect(r) => Some(r),
            _ => None,
        }
    }

    /// Stable label used by the wasm bindings and the CLI.
    pub fn label(&self) -> &'static str {
        match self {
            Self::SkippedSubFrame => "skipped-sub-frame",
            Self::SkippedByGuard => "skipped-guard",
            Self::Allowed(AllowReason::InvalidUrl) => "allowed-invalid-url",
            Self::Allowed(AllowReason::NoTrigger) => "allowed-no-trigger",
            Self::Allowed(AllowReason::Whitelisted) => "allowed-whitelisted",
            Self::Allowed(AllowReason::NoDestination) => "allowed-no-destination",
            Self::Allowed(AllowReason::SettingsUnavailable) => "allowed-settings-unavailable",
            Self::Suppressed(Suppression::GlobalSnooze { .. }) => "suppressed-snooze",
            Self::Suppressed(Suppression::SiteSnooze { .. }) => "suppressed-site-snooze",
            Self::Redirect(_) => "redirect",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Redirect(r) => write!(f, "redirect {} -> {} (trigger {})", r.tab_id, r.destination_url, r.trigger),
            Self::Suppressed(Suppression::SiteSnooze { trigger, until }) => {
                write!(f, "{} ({} until {})", self.label(), trigger, until)
            }
            Self::Suppressed(Suppression::GlobalSnooze { until }) => write!(f, "{} (until {})", self.label(), until),
            _ => f.write_str(self.label()),
        }
    }
}
