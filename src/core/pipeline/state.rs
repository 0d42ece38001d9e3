//! Mutable state threaded through one run.

use crate::core::fingerprint::{Fingerprint, FingerprintIndex};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// What the run knows about a path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occupancy {
    /// A file was placed here during this run (fingerprint unknown for non-images)
    Claimed(Option<Fingerprint>),
    /// A file left this path during this run
    Vacated,
    /// Untouched so far; ask the filesystem
    Unknown,
}

/// Run state owned by the driver.
///
/// Tracks placements and departures so that a dry run, which never touches
/// the disk, sees the same occupancy a real run would.
#[derive(Debug, Default)]
pub struct RunState {
    pub index: FingerprintIndex,
    claimed: HashMap<PathBuf, Option<Fingerprint>>,
    vacated: HashSet<PathBuf>,
}

impl RunState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that a file now lives at `path`
    pub fn claim(&mut self, path: &Path, fingerprint: Option<Fingerprint>) {
        self.vacated.remove(path);
        self.claimed.insert(path.to_path_buf(), fingerprint);
    }

    /// Record that `path` no longer holds a file
    pub fn vacate(&mut self, path: &Path) {
        self.claimed.remove(path);
        self.vacated.insert(path.to_path_buf());
    }

    pub fn occupancy(&self, path: &Path) -> Occupancy {
        if let Some(fingerprint) = self.claimed.get(path) {
            Occupancy::Claimed(*fingerprint)
        } else if self.vacated.contains(path) {
            Occupancy::Vacated
        } else {
            Occupancy::Unknown
        }
    }

    pub fn is_claimed(&self, path: &Path) -> bool {
        self.claimed.contains_key(path)
    }
}
