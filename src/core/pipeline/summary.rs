//! Run results and counters.

use crate::core::organize::{FileOutcome, FileReport};
use serde::{Deserialize, Serialize};

/// Counters for one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSummary {
    /// Files found by the scan, images and non-images
    pub scanned: usize,
    /// Files moved, including those moved after a collision was resolved
    pub moved: usize,
    /// Files already at their destination
    pub unchanged: usize,
    pub duplicates_removed: usize,
    /// Non-image files
    pub pruned: usize,
    /// Images with no usable date
    pub unresolved: usize,
    /// Every name collision encountered
    pub collisions: usize,
    pub collision_skipped: usize,
    pub metadata_fixed: usize,
    pub warnings: usize,
    /// Per-file errors plus unreadable scan entries
    pub errors: usize,
}

impl SortSummary {
    /// Count one file's report
    pub fn record(&mut self, report: &FileReport) {
        self.warnings += report.warnings.len();
        if report.metadata_fixed {
            self.metadata_fixed += 1;
        }
        if report.outcome.is_collision() {
            self.collisions += 1;
        }

        match report.outcome {
            FileOutcome::Pruned { .. } => self.pruned += 1,
            FileOutcome::DuplicateRemoved { .. } => self.duplicates_removed += 1,
            FileOutcome::Moved { .. } | FileOutcome::CollisionResolved { .. } => self.moved += 1,
            FileOutcome::CollisionSkipped { .. } => self.collision_skipped += 1,
            FileOutcome::Unchanged => self.unchanged += 1,
            FileOutcome::Unresolved => self.unresolved += 1,
            FileOutcome::Error { .. } => self.errors += 1,
        }
    }
}

/// Result of a sort run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SortResult {
    pub summary: SortSummary,
    /// One report per processed file, in walk order
    pub files: Vec<FileReport>,
    /// Entries the scan could not read (non-fatal)
    pub scan_errors: Vec<String>,
    pub dry_run: bool,
    /// The run was interrupted before every file was processed
    pub cancelled: bool,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl SortResult {
    /// Whether any file ended in an error
    pub fn has_errors(&self) -> bool {
        self.summary.errors > 0
    }
}
