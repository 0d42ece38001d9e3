//! Event type definitions for progress reporting.

use crate::core::organize::FileOutcome;
use crate::core::pipeline::SortSummary;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// All events emitted by a sort run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    /// Scanning phase events
    Scan(ScanEvent),
    /// Per-file processing events
    File(FileEvent),
    /// Run-level events
    Run(RunEvent),
}

/// Events during the scanning phase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ScanEvent {
    /// Scanning has started
    Started { root: PathBuf },
    /// An entry could not be read, scanning continues
    Error { path: PathBuf, message: String },
    /// Scanning completed
    Completed { total_files: usize },
}

/// Events while files are processed one by one
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FileEvent {
    /// A file reached its terminal state
    Processed(FileProgress),
    /// A recovered problem (metadata read/write) on a file
    Warning { path: PathBuf, message: String },
}

/// Progress information after each file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileProgress {
    /// Number of files processed so far
    pub completed: usize,
    /// Total number of files in this run
    pub total: usize,
    /// The file that was just processed
    pub path: PathBuf,
    /// What happened to it
    pub outcome: FileOutcome,
}

/// Run-level events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RunEvent {
    /// Run has started
    Started { dry_run: bool },
    /// Run finished (possibly cancelled)
    Completed { summary: SortSummary },
    /// Run was interrupted between files
    Cancelled,
}
