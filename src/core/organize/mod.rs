//! # Organize Module
//!
//! Destination naming, collision policies, per-file outcomes and the
//! filesystem moves that put a photo where its date says it belongs.

mod mover;
mod pattern;
mod types;

pub use mover::{move_file, remove_file, with_numeric_suffix, MAX_SUFFIX_ATTEMPTS};
pub use pattern::{NamingContext, NamingPattern, DEFAULT_PATTERN};
pub use types::*;
