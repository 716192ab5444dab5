//! Detour Core Library
//!
//! This crate decides, for every top-level navigation, whether the page should
//! be left alone or redirected to one of the user's destinations.
//!
//! # Architecture
//!
//! Every decision runs against an immutable [`Settings`] snapshot read from the
//! extension's storage. The engine never mutates that snapshot; anything that
//! needs to be written back (redirect counters, snooze bookkeeping) is emitted
//! as a [`SettingsPatch`] holding only the changed fields.
//!
//! # Modules
//!
//! - `url`: URL and site-pattern parsing into (hostname, path) form
//! - `matcher`: First-match trigger and whitelist matching
//! - `schedule`: Weekly windows that block snoozing
//! - `suppression`: Focus mode, schedules, global and per-site snooze
//! - `destination`: Category-aware destination selection
//! - `guard`: Per-tab redirect loop guard
//! - `stats`: Redirect counters
//! - `snooze`: Snooze bookkeeping and status helpers
//! - `settings`: Settings snapshot, patches and stores
//! - `clock`: Wall-clock abstraction
//! - `engine`: The navigation decision pipeline
//! - `types`: Shared type definitions

pub mod clock;
pub mod destination;
pub mod engine;
pub mod guard;
pub mod matcher;
pub mod schedule;
pub mod settings;
pub mod snooze;
pub mod stats;
pub mod suppression;
pub mod types;
pub mod url;

// Re-export commonly used types
pub use clock::{Clock, FixedClock, Moment, SystemClock};
pub use engine::Engine;
pub use matcher::Matcher;
pub use settings::{MemoryStore, Settings, SettingsError, SettingsPatch, SettingsStore, StoreError};
pub use types::{AllowReason, Category, NavigationEvent, Outcome, Redirect, Suppression};
