//! # Date Module
//!
//! Resolves the capture date of a file through an ordered chain of
//! strategies. The first strategy that produces a date wins:
//!
//! 1. [`ExifDateResolver`] - embedded EXIF capture date
//! 2. [`FilenameDateResolver`] - a date pattern in the file name
//! 3. [`ModifiedTimeResolver`] - filesystem last-modified time
//!
//! New strategies implement [`DateResolver`] and are pushed onto a
//! [`ResolverChain`]; the chain itself never changes.

mod filename;

pub use filename::{FilenameDatePatterns, FilenameMatch, DEFAULT_FILENAME_PATTERN};

use crate::core::metadata;
use crate::core::scanner::ScannedFile;
use crate::error::MetadataError;
use chrono::{DateTime, Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::path::Path;
use std::sync::Arc;

/// Where a resolved date came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateSource {
    Metadata,
    Filename,
    ModifiedTime,
}

impl std::fmt::Display for DateSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DateSource::Metadata => write!(f, "metadata"),
            DateSource::Filename => write!(f, "filename"),
            DateSource::ModifiedTime => write!(f, "modified time"),
        }
    }
}

/// A capture date together with its source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedDate {
    pub datetime: NaiveDateTime,
    pub source: DateSource,
}

/// One strategy in the resolution chain
pub trait DateResolver {
    /// The source this strategy reads
    fn source(&self) -> DateSource;

    /// Attempt to produce a date.
    ///
    /// `Ok(None)` means the source is absent; `Err` means it is present
    /// but unreadable or malformed. Both let the chain move on.
    fn resolve(&self, file: &ScannedFile) -> Result<Option<NaiveDateTime>, MetadataError>;
}

/// Reads the EXIF capture date
pub struct ExifDateResolver;

impl DateResolver for ExifDateResolver {
    fn source(&self) -> DateSource {
        DateSource::Metadata
    }

    fn resolve(&self, file: &ScannedFile) -> Result<Option<NaiveDateTime>, MetadataError> {
        metadata::read_capture_date(&file.path)
    }
}

/// Parses a date out of the file stem
pub struct FilenameDateResolver {
    patterns: Arc<FilenameDatePatterns>,
}

impl FilenameDateResolver {
    pub fn new(patterns: Arc<FilenameDatePatterns>) -> Self {
        Self { patterns }
    }
}

impl DateResolver for FilenameDateResolver {
    fn source(&self) -> DateSource {
        DateSource::Filename
    }

    fn resolve(&self, file: &ScannedFile) -> Result<Option<NaiveDateTime>, MetadataError> {
        Ok(self.patterns.parse(&stem_of(&file.path)).map(|m| m.datetime))
    }
}

/// File stem as text, with any non-UTF-8 bytes replaced by U+FFFD.
///
/// Date parsing and naming both read the stem through this, so they
/// always see the same text.
pub fn stem_of(path: &Path) -> Cow<'_, str> {
    path.file_stem()
        .map(|stem| stem.to_string_lossy())
        .unwrap_or_default()
}

/// Uses the filesystem modification time, in local time
pub struct ModifiedTimeResolver;

impl DateResolver for ModifiedTimeResolver {
    fn source(&self) -> DateSource {
        DateSource::ModifiedTime
    }

    fn resolve(&self, file: &ScannedFile) -> Result<Option<NaiveDateTime>, MetadataError> {
        Ok(file
            .modified
            .map(|modified| DateTime::<Local>::from(modified).naive_local()))
    }
}

/// Outcome of running the chain on one file
#[derive(Debug)]
pub struct Resolution {
    /// The winning date, if any strategy produced one
    pub date: Option<ResolvedDate>,
    /// Sources that were present but unusable, in chain order
    pub failures: Vec<MetadataError>,
}

impl Resolution {
    /// Whether the embedded metadata lacks a usable date that was found elsewhere
    pub fn needs_write_back(&self) -> bool {
        self.date
            .is_some_and(|date| date.source != DateSource::Metadata)
    }
}

/// Ordered list of date strategies
pub struct ResolverChain {
    resolvers: Vec<Box<dyn DateResolver>>,
}

impl ResolverChain {
    /// An empty chain
    pub fn new() -> Self {
        Self {
            resolvers: Vec::new(),
        }
    }

    /// Metadata, then filename, then modification time
    pub fn standard(patterns: Arc<FilenameDatePatterns>) -> Self {
        Self::new()
            .with(ExifDateResolver)
            .with(FilenameDateResolver::new(patterns))
            .with(ModifiedTimeResolver)
    }

    /// Append a strategy at the lowest priority
    pub fn with(mut self, resolver: impl DateResolver + 'static) -> Self {
        self.resolvers.push(Box::new(resolver));
        self
    }

    /// Try each strategy in order; the first date wins
    pub fn resolve(&self, file: &ScannedFile) -> Resolution {
        let mut failures = Vec::new();

        for resolver in &self.resolvers {
            match resolver.resolve(file) {
                Ok(Some(datetime)) => {
                    tracing::debug!(
                        "{}: date {} from {}",
                        file.path.display(),
                        datetime,
                        resolver.source()
                    );
                    return Resolution {
                        date: Some(ResolvedDate {
                            datetime,
                            source: resolver.source(),
                        }),
                        failures,
                    };
                }
                Ok(None) => {
                    tracing::debug!("{}: no {} date", file.path.display(), resolver.source());
                }
                Err(error) => {
                    tracing::debug!("{}: {}", file.path.display(), error);
                    failures.push(error);
                }
            }
        }

        Resolution {
            date: None,
            failures,
        }
    }
}

impl Default for ResolverChain {
    fn default() -> Self {
        Self::standard(Arc::new(FilenameDatePatterns::default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::scanner::{FileKind, ImageFormat};
    use chrono::NaiveDate;
    use std::path::PathBuf;
    use std::time::{Duration, SystemTime};

    fn file(path: &str, modified: Option<SystemTime>) -> ScannedFile {
        ScannedFile {
            path: PathBuf::from(path),
            size: 0,
            modified,
            kind: FileKind::Image(ImageFormat::Jpeg),
        }
    }

    struct Fixed(DateSource, Option<NaiveDateTime>);

    impl DateResolver for Fixed {
        fn source(&self) -> DateSource {
            self.0
        }

        fn resolve(&self, _: &ScannedFile) -> Result<Option<NaiveDateTime>, MetadataError> {
            Ok(self.1)
        }
    }

    struct Broken;

    impl DateResolver for Broken {
        fn source(&self) -> DateSource {
            DateSource::Metadata
        }

        fn resolve(&self, file: &ScannedFile) -> Result<Option<NaiveDateTime>, MetadataError> {
            Err(MetadataError::Malformed {
                path: file.path.clone(),
                tag: "DateTimeOriginal".to_string(),
                value: "0000:00:00 00:00:00".to_string(),
            })
        }
    }

    fn noon(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    #[test]
    fn first_success_wins() {
        let chain = ResolverChain::new()
            .with(Fixed(DateSource::Metadata, Some(noon(2020, 1, 1))))
            .with(Fixed(DateSource::Filename, Some(noon(2021, 1, 1))));

        let resolution = chain.resolve(&file("/p/a.jpg", None));
        let date = resolution.date.unwrap();
        assert_eq!(date.datetime, noon(2020, 1, 1));
        assert_eq!(date.source, DateSource::Metadata);
        assert!(!resolution.needs_write_back());
    }

    #[test]
    fn malformed_source_falls_through() {
        let chain = ResolverChain::new()
            .with(Broken)
            .with(Fixed(DateSource::Filename, Some(noon(2021, 6, 1))));

        let resolution = chain.resolve(&file("/p/a.jpg", None));
        assert_eq!(resolution.date.unwrap().source, DateSource::Filename);
        assert_eq!(resolution.failures.len(), 1);
        assert!(resolution.needs_write_back());
    }

    #[test]
    fn nothing_found_is_unresolved() {
        let chain = ResolverChain::new()
            .with(Fixed(DateSource::Filename, None))
            .with(ModifiedTimeResolver);

        let resolution = chain.resolve(&file("/p/a.jpg", None));
        assert!(resolution.date.is_none());
        assert!(!resolution.needs_write_back());
    }

    #[test]
    fn filename_resolver_reads_stem() {
        let resolver = FilenameDateResolver::new(Arc::new(FilenameDatePatterns::default()));
        let date = resolver
            .resolve(&file("/p/IMG_20190509_154733.jpg", None))
            .unwrap();
        assert_eq!(
            date,
            Some(
                NaiveDate::from_ymd_opt(2019, 5, 9)
                    .unwrap()
                    .and_hms_opt(15, 47, 33)
                    .unwrap()
            )
        );
    }

    #[cfg(unix)]
    #[test]
    fn filename_resolver_reads_non_utf8_stem() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let path = Path::new("/p").join(OsStr::from_bytes(b"IMG_20240115_143000_\xff.jpg"));
        let scanned = ScannedFile {
            path,
            ..file("/p/a.jpg", None)
        };

        let resolver = FilenameDateResolver::new(Arc::new(FilenameDatePatterns::default()));
        let date = resolver.resolve(&scanned).unwrap();
        assert_eq!(
            date,
            Some(
                NaiveDate::from_ymd_opt(2024, 1, 15)
                    .unwrap()
                    .and_hms_opt(14, 30, 0)
                    .unwrap()
            )
        );
        assert_eq!(stem_of(&scanned.path), "IMG_20240115_143000_\u{FFFD}");
    }

    #[test]
    fn modified_time_is_local() {
        let modified = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        let date = ModifiedTimeResolver
            .resolve(&file("/p/a.jpg", Some(modified)))
            .unwrap()
            .unwrap();
        assert_eq!(date, DateTime::<Local>::from(modified).naive_local());
    }

    #[test]
    fn standard_chain_falls_back_to_modified_time() {
        let modified = SystemTime::UNIX_EPOCH + Duration::from_secs(1_600_000_000);
        let chain = ResolverChain::default();

        // Nonexistent file: metadata read fails, name has no date
        let resolution = chain.resolve(&file("/nonexistent/holiday.jpg", Some(modified)));
        assert_eq!(resolution.date.unwrap().source, DateSource::ModifiedTime);
        assert_eq!(resolution.failures.len(), 1);
    }
}
