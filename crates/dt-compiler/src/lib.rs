//! Detour Site List Compiler
//!
//! This crate turns raw user input into the normalized trigger, whitelist and
//! destination entries the decision engine expects.

pub mod builder;
pub mod optimizer;
pub mod parser;

pub use builder::{add_entry, ListBuilder};
pub use optimizer::{dedupe_entries, shadowed_entries, DedupeStats};
pub use parser::{list_lines, normalize_entry, normalize_site, parse_site_list, ListError, ListKind};
