//! # Pipeline Module
//!
//! Drives a full sort run over one directory tree.
//!
//! ## Per-file Stages
//! 1. **Classify** - non-images are pruned (reported, optionally moved aside)
//! 2. **Fingerprint** - exact duplicates of an earlier file are removed
//! 3. **Date** - metadata, then filename, then modification time
//! 4. **Name** - render the destination from the naming pattern
//! 5. **Place** - apply the collision policy and move
//!
//! Files are handled one at a time in walk order, so "first seen" is
//! deterministic for an unchanged tree.

mod config;
mod executor;
mod state;
mod summary;

pub use config::{SortConfig, SorterBuilder, DEFAULT_PRUNE_DIR};
pub use executor::Sorter;
pub use state::{Occupancy, RunState};
pub use summary::{SortResult, SortSummary};
