//! Directory walking implementation using walkdir.

use super::{filter::ImageFilter, ScanResult, ScannedFile};
use crate::error::ScanError;
use crate::events::{null_sender, Event, EventSender, ScanEvent};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Configuration for the directory scanner
#[derive(Debug, Clone, Default)]
pub struct ScanConfig {
    /// Whether to follow symbolic links
    pub follow_symlinks: bool,
    /// Whether to include hidden files and directories
    pub include_hidden: bool,
    /// Directories never descended into (e.g. the prune directory)
    pub exclude: Vec<PathBuf>,
}

/// Scanner implementation using the walkdir crate
pub struct WalkDirScanner {
    config: ScanConfig,
    filter: ImageFilter,
}

impl WalkDirScanner {
    /// Create a new scanner with the given configuration
    pub fn new(config: ScanConfig) -> Self {
        let filter = ImageFilter::new().with_hidden(config.include_hidden);
        Self { config, filter }
    }

    /// Start a lazy walk beneath `root`.
    ///
    /// Entries are yielded in file-name order, so repeated walks over an
    /// unchanged tree produce the same sequence. Calling this again restarts
    /// the walk from the beginning.
    pub fn iter(&self, root: &Path) -> Result<ScanIter<'_>, ScanError> {
        check_root(root)?;

        let walker = WalkDir::new(root)
            .follow_links(self.config.follow_symlinks)
            .sort_by_file_name();

        let filter = &self.filter;
        let exclude = &self.config.exclude;
        let entries = walker.into_iter().filter_entry(move |entry| {
            entry.depth() == 0
                || !(filter.is_excluded_hidden(entry.path())
                    || exclude.iter().any(|dir| entry.path().starts_with(dir)))
        });

        Ok(ScanIter {
            entries: Box::new(entries),
            filter,
        })
    }

    /// Walk `root` to completion
    pub fn scan(&self, root: &Path) -> Result<ScanResult, ScanError> {
        self.scan_with_events(root, &null_sender())
    }

    /// Walk `root` to completion, reporting through `events`
    pub fn scan_with_events(
        &self,
        root: &Path,
        events: &EventSender,
    ) -> Result<ScanResult, ScanError> {
        events.send(Event::Scan(ScanEvent::Started {
            root: root.to_path_buf(),
        }));

        let mut files = Vec::new();
        let mut errors = Vec::new();

        for item in self.iter(root)? {
            match item {
                Ok(file) => files.push(file),
                Err(error) => {
                    tracing::warn!("skipping unreadable entry: {}", error);
                    events.send(Event::Scan(ScanEvent::Error {
                        path: error_path(&error),
                        message: error.to_string(),
                    }));
                    errors.push(error);
                }
            }
        }

        events.send(Event::Scan(ScanEvent::Completed {
            total_files: files.len(),
        }));

        Ok(ScanResult { files, errors })
    }
}

/// Lazy sequence of scanned files beneath a root
pub struct ScanIter<'a> {
    entries: Box<dyn Iterator<Item = walkdir::Result<DirEntry>> + 'a>,
    filter: &'a ImageFilter,
}

impl ScanIter<'_> {
    fn describe(&self, path: &Path) -> Result<ScannedFile, ScanError> {
        let metadata = fs::metadata(path).map_err(|e| io_error(path, e))?;
        let kind = self.filter.classify(path).map_err(|e| io_error(path, e))?;

        Ok(ScannedFile {
            path: path.to_path_buf(),
            size: metadata.len(),
            modified: metadata.modified().ok(),
            kind,
        })
    }
}

impl Iterator for ScanIter<'_> {
    type Item = Result<ScannedFile, ScanError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.entries.next()? {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().map(Path::to_path_buf).unwrap_or_default();
                    let source = e
                        .into_io_error()
                        .unwrap_or_else(|| io::Error::other("filesystem loop detected"));
                    return Some(Err(io_error(&path, source)));
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            return Some(self.describe(entry.path()));
        }
    }
}

fn check_root(root: &Path) -> Result<(), ScanError> {
    if !root.exists() {
        return Err(ScanError::DirectoryNotFound {
            path: root.to_path_buf(),
        });
    }
    if !root.is_dir() {
        return Err(ScanError::NotADirectory {
            path: root.to_path_buf(),
        });
    }
    fs::read_dir(root).map_err(|e| io_error(root, e))?;
    Ok(())
}

fn io_error(path: &Path, source: io::Error) -> ScanError {
    if source.kind() == io::ErrorKind::PermissionDenied {
        ScanError::PermissionDenied {
            path: path.to_path_buf(),
        }
    } else {
        ScanError::ReadEntry {
            path: path.to_path_buf(),
            source,
        }
    }
}

fn error_path(error: &ScanError) -> PathBuf {
    match error {
        ScanError::DirectoryNotFound { path }
        | ScanError::NotADirectory { path }
        | ScanError::PermissionDenied { path }
        | ScanError::ReadEntry { path, .. } => path.clone(),
    }
}
