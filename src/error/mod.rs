//! # Error Module
//!
//! Error types for the photo sorter.
//!
//! ## Design Principles
//! - **Never panic** on user data - return errors instead
//! - **Include context** - paths, file names, what went wrong
//! - **Per-file errors stay per-file** - only a bad root or bad configuration
//!   aborts a run; everything else becomes a reported outcome

use std::path::PathBuf;
use thiserror::Error;

/// Top-level application error
#[derive(Error, Debug)]
pub enum SorterError {
    #[error("Scanning error: {0}")]
    Scan(#[from] ScanError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Errors that occur while walking the root directory
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Directory not found: {path}")]
    DirectoryNotFound { path: PathBuf },

    #[error("Not a directory: {path}")]
    NotADirectory { path: PathBuf },

    #[error("Permission denied accessing: {path}")]
    PermissionDenied { path: PathBuf },

    #[error("Failed to read {path}: {source}")]
    ReadEntry {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors reading or writing the embedded capture date
#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("Failed to read metadata of {path}: {reason}")]
    Read { path: PathBuf, reason: String },

    #[error("Malformed {tag} in {path}: {value:?}")]
    Malformed {
        path: PathBuf,
        tag: String,
        value: String,
    },

    #[error("Failed to write metadata to {path}: {reason}")]
    Write { path: PathBuf, reason: String },

    #[error("Writing metadata is not supported for {format} files: {path}")]
    Unsupported { path: PathBuf, format: String },
}

/// Errors that abort the handling of a single file
#[derive(Error, Debug)]
pub enum FileError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Destination {destination} already exists with different content (from {path})")]
    Collision { path: PathBuf, destination: PathBuf },

    #[error("No free name found for {destination} after {attempts} attempts")]
    SuffixExhausted { destination: PathBuf, attempts: usize },

    #[error("Rendered destination {rendered:?} for {path} is not a usable relative path")]
    InvalidDestination { path: PathBuf, rendered: String },
}

impl FileError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        FileError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Errors in the run configuration, detected before any file is touched
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid naming pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("Invalid filename date pattern {pattern:?}: {reason}")]
    InvalidFilenamePattern { pattern: String, reason: String },

    #[error("Invalid destination {path}: {reason}")]
    InvalidDestination { path: PathBuf, reason: String },

    #[error("Invalid source directories: {reason}")]
    InvalidSources { reason: String },
}

/// Convenience Result type alias
pub type Result<T> = std::result::Result<T, SorterError>;
