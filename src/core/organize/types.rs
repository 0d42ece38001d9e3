//! Types for the organize module.

use crate::core::date::ResolvedDate;
use crate::error::FileError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// What to do when a destination already holds different content
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CollisionPolicy {
    /// Append `_1`, `_2`, ... to the name until a free one is found
    #[default]
    Suffix,
    /// Leave the file where it is
    Skip,
    /// Replace the destination
    Overwrite,
    /// Report a collision error for this file
    Error,
}

impl std::fmt::Display for CollisionPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CollisionPolicy::Suffix => write!(f, "suffix"),
            CollisionPolicy::Skip => write!(f, "skip"),
            CollisionPolicy::Overwrite => write!(f, "overwrite"),
            CollisionPolicy::Error => write!(f, "error"),
        }
    }
}

/// Broad class of a per-file error
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FileErrorKind {
    Io,
    Collision,
    InvalidDestination,
}

impl FileError {
    pub fn kind(&self) -> FileErrorKind {
        match self {
            FileError::Io { .. } => FileErrorKind::Io,
            FileError::Collision { .. } | FileError::SuffixExhausted { .. } => {
                FileErrorKind::Collision
            }
            FileError::InvalidDestination { .. } => FileErrorKind::InvalidDestination,
        }
    }
}

/// Terminal state of one file in a run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum FileOutcome {
    /// Not an image; left in place or moved aside into the prune directory
    Pruned { moved_to: Option<PathBuf> },
    /// Byte-identical to a file that survives; deleted
    DuplicateRemoved { original: PathBuf },
    /// Moved to its computed destination
    Moved { destination: PathBuf },
    /// Moved after a name collision was resolved by the policy
    CollisionResolved {
        destination: PathBuf,
        policy: CollisionPolicy,
    },
    /// Left in place because the destination was taken
    CollisionSkipped { destination: PathBuf },
    /// Already at its computed destination
    Unchanged,
    /// No date could be determined; left in place
    Unresolved,
    /// Handling failed; the file is left where it was
    Error { kind: FileErrorKind, message: String },
}

impl FileOutcome {
    /// Whether this outcome arose from a name collision
    pub fn is_collision(&self) -> bool {
        matches!(
            self,
            FileOutcome::CollisionResolved { .. }
                | FileOutcome::CollisionSkipped { .. }
                | FileOutcome::Error {
                    kind: FileErrorKind::Collision,
                    ..
                }
        )
    }
}

impl From<FileError> for FileOutcome {
    fn from(error: FileError) -> Self {
        FileOutcome::Error {
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

/// Per-file report line
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileReport {
    /// Where the file was when the run started
    pub path: PathBuf,
    /// Resolved capture date, when the pipeline got that far
    pub date: Option<ResolvedDate>,
    pub outcome: FileOutcome,
    /// Recovered problems (metadata read or write-back failures)
    pub warnings: Vec<String>,
    /// Whether the resolved date was (or would be) written into the file
    pub metadata_fixed: bool,
}

impl FileReport {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            date: None,
            outcome: FileOutcome::Unresolved,
            warnings: Vec::new(),
            metadata_fixed: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collision_error_counts_as_collision() {
        let outcome: FileOutcome = FileError::Collision {
            path: PathBuf::from("/in/b.jpg"),
            destination: PathBuf::from("/out/a.jpg"),
        }
        .into();
        assert!(outcome.is_collision());
    }

    #[test]
    fn io_error_is_not_a_collision() {
        let outcome: FileOutcome = FileError::io(
            "/in/b.jpg",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        )
        .into();
        assert!(!outcome.is_collision());
    }

    #[test]
    fn outcome_serializes_with_state_tag() {
        let json = serde_json::to_string(&FileOutcome::Unchanged).unwrap();
        assert_eq!(json, r#"{"state":"unchanged"}"#);
    }

    #[test]
    fn default_policy_is_suffix() {
        assert_eq!(CollisionPolicy::default(), CollisionPolicy::Suffix);
        assert_eq!(CollisionPolicy::Overwrite.to_string(), "overwrite");
    }
}
