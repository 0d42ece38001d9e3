//! Sort run execution.

use super::config::{SortConfig, SorterBuilder};
use super::state::{Occupancy, RunState};
use super::summary::{SortResult, SortSummary};
use crate::core::date::{stem_of, FilenameDatePatterns, ResolverChain};
use crate::core::fingerprint::{Fingerprint, Lookup};
use crate::core::metadata::DatedJpeg;
use crate::core::organize::{
    move_file, remove_file, with_numeric_suffix, CollisionPolicy, FileOutcome, FileReport,
    NamingContext, NamingPattern, MAX_SUFFIX_ATTEMPTS,
};
use crate::core::scanner::{FileKind, ImageFormat, ScanConfig, ScannedFile, WalkDirScanner};
use crate::error::{ConfigError, FileError, MetadataError, SorterError};
use crate::events::{null_sender, Event, EventSender, FileEvent, FileProgress, RunEvent};
use chrono::NaiveDateTime;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// A directory being sorted and where its non-images are set aside
#[derive(Debug)]
struct Source {
    root: PathBuf,
    prune: PathBuf,
}

/// Absolute locations for one run
#[derive(Debug)]
struct Layout {
    sources: Vec<Source>,
    destination: PathBuf,
}

/// What sits at a candidate destination
#[derive(Debug, PartialEq, Eq)]
enum Occupant {
    Free,
    /// The candidate is the file being placed
    Itself,
    /// A different file with the same content
    Identical,
    Different,
}

/// Sorts one directory tree
pub struct Sorter {
    config: SortConfig,
    pattern: NamingPattern,
    filename_dates: Arc<FilenameDatePatterns>,
    resolvers: ResolverChain,
    cancel: Arc<AtomicBool>,
}

impl Sorter {
    pub(super) fn new(
        config: SortConfig,
        pattern: NamingPattern,
        filename_dates: Arc<FilenameDatePatterns>,
        cancel: Arc<AtomicBool>,
    ) -> Self {
        Self {
            resolvers: ResolverChain::standard(filename_dates.clone()),
            config,
            pattern,
            filename_dates,
            cancel,
        }
    }

    /// Create a new sorter builder
    pub fn builder() -> SorterBuilder {
        SorterBuilder::new()
    }

    pub fn config(&self) -> &SortConfig {
        &self.config
    }

    /// Run without events
    pub fn run(&self) -> Result<SortResult, SorterError> {
        self.run_with_events(&null_sender())
    }

    /// Run with event reporting.
    ///
    /// Only an unusable root aborts the run; every per-file problem ends up
    /// in that file's report.
    pub fn run_with_events(&self, events: &EventSender) -> Result<SortResult, SorterError> {
        let start_time = Instant::now();
        let dry_run = self.config.dry_run;

        events.send(Event::Run(RunEvent::Started { dry_run }));

        let layout = self.layout()?;
        let scanner = WalkDirScanner::new(ScanConfig {
            include_hidden: self.config.include_hidden,
            follow_symlinks: self.config.follow_symlinks,
            exclude: layout.sources.iter().map(|s| s.prune.clone()).collect(),
        });

        // Every root is scanned before any file moves
        let mut queue = Vec::new();
        let mut scan_errors = Vec::new();
        for source in &layout.sources {
            let scan = scanner.scan_with_events(&source.root, events)?;
            queue.extend(scan.files.into_iter().map(|file| (source, file)));
            scan_errors.extend(scan.errors.iter().map(ToString::to_string));
        }

        let total = queue.len();
        let mut state = RunState::new();
        let mut summary = SortSummary {
            scanned: total,
            errors: scan_errors.len(),
            ..Default::default()
        };
        let mut reports = Vec::with_capacity(total);
        let mut cancelled = false;

        tracing::info!(
            "sorting {} files from {} director{} into {}{}",
            total,
            layout.sources.len(),
            if layout.sources.len() == 1 { "y" } else { "ies" },
            layout.destination.display(),
            if dry_run { " (dry run)" } else { "" }
        );

        for (i, (source, file)) in queue.iter().enumerate() {
            if self.cancel.load(Ordering::SeqCst) {
                tracing::warn!("cancelled after {} of {} files", i, total);
                events.send(Event::Run(RunEvent::Cancelled));
                cancelled = true;
                break;
            }

            let report = self.process(file, source, &layout.destination, &mut state);

            for warning in &report.warnings {
                events.send(Event::File(FileEvent::Warning {
                    path: file.path.clone(),
                    message: warning.clone(),
                }));
            }
            events.send(Event::File(FileEvent::Processed(FileProgress {
                completed: i + 1,
                total,
                path: file.path.clone(),
                outcome: report.outcome.clone(),
            })));

            summary.record(&report);
            reports.push(report);
        }

        events.send(Event::Run(RunEvent::Completed {
            summary: summary.clone(),
        }));

        Ok(SortResult {
            summary,
            files: reports,
            scan_errors,
            dry_run,
            cancelled,
            duration_ms: start_time.elapsed().as_millis() as u64,
        })
    }

    fn layout(&self) -> Result<Layout, ConfigError> {
        let sources: Vec<Source> = self
            .config
            .roots
            .iter()
            .map(|root| {
                let root = absolute(root);
                let prune = if self.config.prune_dir.is_absolute() {
                    absolute(&self.config.prune_dir)
                } else {
                    root.join(&self.config.prune_dir)
                };
                Source { root, prune }
            })
            .collect();

        for (i, a) in sources.iter().enumerate() {
            for b in sources.iter().skip(i + 1) {
                if a.root.starts_with(&b.root) || b.root.starts_with(&a.root) {
                    return Err(ConfigError::InvalidSources {
                        reason: format!(
                            "{} and {} overlap",
                            a.root.display(),
                            b.root.display()
                        ),
                    });
                }
            }
        }

        let destination = match (&self.config.destination, sources.first()) {
            (Some(destination), _) => absolute(destination),
            (None, Some(source)) => source.root.clone(),
            (None, None) => {
                return Err(ConfigError::InvalidSources {
                    reason: "no directory to sort".to_string(),
                })
            }
        };

        Ok(Layout {
            sources,
            destination,
        })
    }

    fn process(
        &self,
        file: &ScannedFile,
        source: &Source,
        destination: &Path,
        state: &mut RunState,
    ) -> FileReport {
        let mut report = FileReport::new(file.path.clone());

        report.outcome = match self.handle(file, source, destination, state, &mut report) {
            Ok(outcome) => outcome,
            Err(error) => {
                tracing::warn!("{}", error);
                error.into()
            }
        };

        report
    }

    fn handle(
        &self,
        file: &ScannedFile,
        source: &Source,
        destination_root: &Path,
        state: &mut RunState,
        report: &mut FileReport,
    ) -> Result<FileOutcome, FileError> {
        let FileKind::Image(format) = file.kind else {
            return self.set_aside(file, source, state);
        };

        // Content from earlier in this run was moved over this path
        if state.is_claimed(&file.path) {
            tracing::debug!("{}: replaced earlier in this run", file.path.display());
            return Ok(FileOutcome::Unchanged);
        }

        let mut fingerprint =
            Fingerprint::of_file(&file.path).map_err(|e| FileError::io(&file.path, e))?;

        if let Lookup::DuplicateOf(original) = state.index.check_or_register(fingerprint, &file.path)
        {
            return self.remove_duplicate(&file.path, original, state);
        }

        let resolution = self.resolvers.resolve(file);
        for failure in &resolution.failures {
            warn(report, failure);
        }

        let Some(date) = resolution.date else {
            tracing::info!("{}: no capture date found, left in place", file.path.display());
            return Ok(FileOutcome::Unresolved);
        };
        report.date = Some(date);

        // Placement sees the content the file will have once its date is written
        let mut dated = None;
        if self.config.fix_metadata && resolution.needs_write_back() {
            match prepare_write_back(&file.path, format, date.datetime) {
                Ok(jpeg) => {
                    fingerprint = Fingerprint::of_bytes(jpeg.bytes());
                    dated = Some(jpeg);
                }
                Err(error) => warn(report, &error),
            }
        }

        let stem = stem_of(&file.path);
        let extension = file.path.extension().map(|e| e.to_string_lossy());
        let found = self.filename_dates.parse(&stem);

        let context = NamingContext {
            datetime: date.datetime,
            stem: &stem,
            extension: extension.as_deref(),
            prefix: found.as_ref().map_or("", |m| m.prefix.as_str()),
            suffix: found.as_ref().map_or("", |m| m.suffix.as_str()),
            stem_has_date: found.is_some(),
            kind: format.name(),
        };

        let relative = self
            .pattern
            .render(&context)
            .map_err(|rendered| FileError::InvalidDestination {
                path: file.path.clone(),
                rendered,
            })?;
        let destination = destination_root.join(relative);

        let outcome = if destination == file.path {
            FileOutcome::Unchanged
        } else {
            self.place(&file.path, fingerprint, destination, state)?
        };

        // Only a file that ends up in its sorted place gets its date written
        if let Some(jpeg) = dated {
            let target = match &outcome {
                FileOutcome::Moved { destination }
                | FileOutcome::CollisionResolved { destination, .. } => Some(destination.as_path()),
                FileOutcome::Unchanged => Some(file.path.as_path()),
                _ => None,
            };
            if let Some(target) = target {
                match self.write_back(target, &jpeg, fingerprint, state) {
                    Ok(()) => report.metadata_fixed = true,
                    Err(error) => warn(report, &error),
                }
            }
        }

        Ok(outcome)
    }

    /// Apply the collision policy and move the file
    fn place(
        &self,
        source: &Path,
        fingerprint: Fingerprint,
        destination: PathBuf,
        state: &mut RunState,
    ) -> Result<FileOutcome, FileError> {
        match occupant(source, &destination, fingerprint, state)? {
            Occupant::Free => return self.relocate(source, fingerprint, destination, None, state),
            Occupant::Itself => return Ok(FileOutcome::Unchanged),
            Occupant::Identical => return self.absorb(source, destination, state),
            Occupant::Different => {}
        }

        tracing::debug!(
            "{}: {} is taken by different content",
            source.display(),
            destination.display()
        );

        match self.config.collision_policy {
            CollisionPolicy::Skip => {
                tracing::info!(
                    "{}: destination {} exists, skipped",
                    source.display(),
                    destination.display()
                );
                Ok(FileOutcome::CollisionSkipped { destination })
            }
            CollisionPolicy::Error => Err(FileError::Collision {
                path: source.to_path_buf(),
                destination,
            }),
            CollisionPolicy::Overwrite => {
                state.index.forget_path(&destination);
                self.relocate(
                    source,
                    fingerprint,
                    destination,
                    Some(CollisionPolicy::Overwrite),
                    state,
                )
            }
            CollisionPolicy::Suffix => {
                for n in 1..=MAX_SUFFIX_ATTEMPTS {
                    let candidate = with_numeric_suffix(&destination, n);
                    match occupant(source, &candidate, fingerprint, state)? {
                        Occupant::Free => {
                            return self.relocate(
                                source,
                                fingerprint,
                                candidate,
                                Some(CollisionPolicy::Suffix),
                                state,
                            )
                        }
                        Occupant::Itself => return Ok(FileOutcome::Unchanged),
                        Occupant::Identical => return self.absorb(source, candidate, state),
                        Occupant::Different => {}
                    }
                }

                Err(FileError::SuffixExhausted {
                    destination,
                    attempts: MAX_SUFFIX_ATTEMPTS,
                })
            }
        }
    }

    fn relocate(
        &self,
        source: &Path,
        fingerprint: Fingerprint,
        destination: PathBuf,
        policy: Option<CollisionPolicy>,
        state: &mut RunState,
    ) -> Result<FileOutcome, FileError> {
        if self.config.dry_run {
            tracing::info!(
                "Would rename: {} to {}",
                source.display(),
                destination.display()
            );
        } else {
            move_file(source, &destination)?;
            tracing::info!("Moved {} to {}", source.display(), destination.display());
        }

        state.index.relocate(source, &destination);
        state.vacate(source);
        state.claim(&destination, Some(fingerprint));

        Ok(match policy {
            None => FileOutcome::Moved { destination },
            Some(policy) => FileOutcome::CollisionResolved {
                destination,
                policy,
            },
        })
    }

    /// The destination already holds this content; the source goes
    fn absorb(
        &self,
        source: &Path,
        destination: PathBuf,
        state: &mut RunState,
    ) -> Result<FileOutcome, FileError> {
        state.index.relocate(source, &destination);
        self.remove_duplicate(source, destination, state)
    }

    fn remove_duplicate(
        &self,
        source: &Path,
        original: PathBuf,
        state: &mut RunState,
    ) -> Result<FileOutcome, FileError> {
        if self.config.dry_run {
            tracing::info!(
                "Would remove {} (duplicate of {})",
                source.display(),
                original.display()
            );
        } else {
            remove_file(source)?;
            tracing::info!(
                "Removed {} (duplicate of {})",
                source.display(),
                original.display()
            );
        }

        state.vacate(source);
        Ok(FileOutcome::DuplicateRemoved { original })
    }

    /// Write prepared date metadata into the file now at `path`
    fn write_back(
        &self,
        path: &Path,
        jpeg: &DatedJpeg,
        fingerprint: Fingerprint,
        state: &mut RunState,
    ) -> Result<(), MetadataError> {
        if self.config.dry_run {
            tracing::info!("Would write capture date into {}", path.display());
        } else {
            jpeg.write_to(path)?;
            tracing::info!("Wrote capture date into {}", path.display());
        }

        state.index.register(fingerprint, path);
        Ok(())
    }

    /// Non-images: reported, and moved into the prune directory on request
    fn set_aside(
        &self,
        file: &ScannedFile,
        source: &Source,
        state: &mut RunState,
    ) -> Result<FileOutcome, FileError> {
        if !self.config.prune {
            tracing::debug!("{}: not an image, left in place", file.path.display());
            return Ok(FileOutcome::Pruned { moved_to: None });
        }

        let relative = file
            .path
            .strip_prefix(&source.root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| PathBuf::from(file.path.file_name().unwrap_or_default()));
        let base = source.prune.join(relative);

        let mut target = base.clone();
        let mut attempts = 0;
        while !is_free(&target, state)? {
            attempts += 1;
            if attempts > MAX_SUFFIX_ATTEMPTS {
                return Err(FileError::SuffixExhausted {
                    destination: base,
                    attempts: MAX_SUFFIX_ATTEMPTS,
                });
            }
            target = with_numeric_suffix(&base, attempts);
        }

        if self.config.dry_run {
            tracing::info!(
                "Would set aside: {} to {}",
                file.path.display(),
                target.display()
            );
        } else {
            move_file(&file.path, &target)?;
            tracing::info!("Set aside {} to {}", file.path.display(), target.display());
        }

        state.vacate(&file.path);
        state.claim(&target, None);

        Ok(FileOutcome::Pruned {
            moved_to: Some(target),
        })
    }
}

fn prepare_write_back(
    path: &Path,
    format: ImageFormat,
    date: NaiveDateTime,
) -> Result<DatedJpeg, MetadataError> {
    if format != ImageFormat::Jpeg {
        return Err(MetadataError::Unsupported {
            path: path.to_path_buf(),
            format: format.name().to_string(),
        });
    }
    DatedJpeg::prepare(path, date)
}

fn warn(report: &mut FileReport, error: &MetadataError) {
    tracing::warn!("{}", error);
    report.warnings.push(error.to_string());
}

fn occupant(
    source: &Path,
    candidate: &Path,
    fingerprint: Fingerprint,
    state: &RunState,
) -> Result<Occupant, FileError> {
    if candidate == source {
        return Ok(Occupant::Itself);
    }

    match state.occupancy(candidate) {
        Occupancy::Claimed(Some(existing)) if existing == fingerprint => Ok(Occupant::Identical),
        Occupancy::Claimed(_) => Ok(Occupant::Different),
        Occupancy::Vacated => Ok(Occupant::Free),
        Occupancy::Unknown => {
            let metadata = match fs::symlink_metadata(candidate) {
                Ok(metadata) => metadata,
                Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Occupant::Free),
                Err(e) => return Err(FileError::io(candidate, e)),
            };

            if same_file(source, candidate) {
                return Ok(Occupant::Itself);
            }
            if !metadata.is_file() {
                return Ok(Occupant::Different);
            }

            let existing =
                Fingerprint::of_file(candidate).map_err(|e| FileError::io(candidate, e))?;
            Ok(if existing == fingerprint {
                Occupant::Identical
            } else {
                Occupant::Different
            })
        }
    }
}

fn is_free(path: &Path, state: &RunState) -> Result<bool, FileError> {
    match state.occupancy(path) {
        Occupancy::Claimed(_) => Ok(false),
        Occupancy::Vacated => Ok(true),
        Occupancy::Unknown => match fs::symlink_metadata(path) {
            Ok(_) => Ok(false),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(true),
            Err(e) => Err(FileError::io(path, e)),
        },
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

fn absolute(path: &Path) -> PathBuf {
    fs::canonicalize(path)
        .or_else(|_| std::path::absolute(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::date::DateSource;
    use crate::core::metadata;
    use crate::core::organize::FileErrorKind;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    // SOI, JFIF APP0, SOS, entropy bytes, EOI
    const JPEG_HEAD: &[u8] = &[
        0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0x00, 0x01, 0x01, 0x00, 0x00,
        0x01, 0x00, 0x01, 0x00, 0x00, 0xFF, 0xDA, 0x00, 0x08, 0x01, 0x01, 0x00, 0x00, 0x3F, 0x00,
    ];

    // 1x1 PNG: signature, IHDR, IDAT, IEND
    const PNG: &[u8] = &[
        0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
        0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x02, 0x00, 0x00, 0x00, 0x90,
        0x77, 0x53, 0xDE, 0x00, 0x00, 0x00, 0x0C, 0x49, 0x44, 0x41, 0x54, 0x08, 0xD7, 0x63, 0xF8,
        0xFF, 0xFF, 0x3F, 0x00, 0x05, 0xFE, 0x02, 0xFE, 0xDC, 0xCC, 0x59, 0xE7, 0x00, 0x00, 0x00,
        0x00, 0x49, 0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
    ];

    fn jpeg(tag: &str) -> Vec<u8> {
        let mut bytes = JPEG_HEAD.to_vec();
        bytes.extend_from_slice(tag.as_bytes());
        bytes.extend_from_slice(&[0xFF, 0xD9]);
        bytes
    }

    fn write(dir: &Path, relative: &str, bytes: &[u8]) -> PathBuf {
        let path = dir.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, bytes).unwrap();
        path
    }

    fn sorter(root: &Path) -> SorterBuilder {
        Sorter::builder().root(root)
    }

    fn outcome_for<'a>(result: &'a SortResult, name: &str) -> &'a FileOutcome {
        &result
            .files
            .iter()
            .find(|r| r.path.file_name().unwrap() == name)
            .unwrap()
            .outcome
    }

    #[test]
    fn moves_by_filename_date() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "IMG_20240115_143000.jpg", &jpeg("a"));

        let result = sorter(temp.path()).build().unwrap().run().unwrap();

        assert_eq!(result.summary.moved, 1);
        assert!(temp
            .path()
            .join("2024/01/2024-01-15_14-30-00.jpg")
            .exists());
        assert!(!temp.path().join("IMG_20240115_143000.jpg").exists());

        let date = result.files[0].date.unwrap();
        assert_eq!(date.source, DateSource::Filename);
    }

    #[test]
    fn metadata_date_wins_over_filename() {
        let temp = TempDir::new().unwrap();
        let path = write(temp.path(), "IMG_20240115_143000.jpg", &jpeg("a"));
        let taken = NaiveDate::from_ymd_opt(2019, 7, 4)
            .unwrap()
            .and_hms_opt(9, 15, 0)
            .unwrap();
        metadata::write_capture_date(&path, taken).unwrap();

        let result = sorter(temp.path()).build().unwrap().run().unwrap();

        assert_eq!(result.files[0].date.unwrap().source, DateSource::Metadata);
        assert!(temp
            .path()
            .join("2019/07/2019-07-04_09-15-00.jpg")
            .exists());
    }

    #[test]
    fn duplicate_keeps_first_in_walk_order() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "a/IMG_20240115_143000.jpg", &jpeg("same"));
        write(temp.path(), "b/IMG_20240115_143000.jpg", &jpeg("same"));

        let result = sorter(temp.path()).build().unwrap().run().unwrap();

        assert_eq!(result.summary.moved, 1);
        assert_eq!(result.summary.duplicates_removed, 1);
        assert_eq!(result.summary.collisions, 0);
        assert!(matches!(
            result.files[1].outcome,
            FileOutcome::DuplicateRemoved { .. }
        ));
        assert!(!temp.path().join("b/IMG_20240115_143000.jpg").exists());
        assert!(temp
            .path()
            .join("2024/01/2024-01-15_14-30-00.jpg")
            .exists());
    }

    #[test]
    fn suffix_policy_resolves_collisions() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "a/IMG_20240115_143000.jpg", &jpeg("first"));
        write(temp.path(), "b/IMG_20240115_143000.jpg", &jpeg("second"));

        let result = sorter(temp.path()).build().unwrap().run().unwrap();

        assert_eq!(result.summary.moved, 2);
        assert_eq!(result.summary.collisions, 1);
        assert!(matches!(
            result.files[1].outcome,
            FileOutcome::CollisionResolved {
                policy: CollisionPolicy::Suffix,
                ..
            }
        ));
        let dir = temp.path().join("2024/01");
        assert_eq!(fs::read(dir.join("2024-01-15_14-30-00.jpg")).unwrap(), jpeg("first"));
        assert_eq!(
            fs::read(dir.join("2024-01-15_14-30-00_1.jpg")).unwrap(),
            jpeg("second")
        );
    }

    #[test]
    fn skip_and_error_policies_leave_file_in_place() {
        for (policy, skipped, errors) in [
            (CollisionPolicy::Skip, 1, 0),
            (CollisionPolicy::Error, 0, 1),
        ] {
            let temp = TempDir::new().unwrap();
            write(temp.path(), "a/IMG_20240115_143000.jpg", &jpeg("first"));
            let second = write(temp.path(), "b/IMG_20240115_143000.jpg", &jpeg("second"));

            let result = sorter(temp.path())
                .collision_policy(policy)
                .build()
                .unwrap()
                .run()
                .unwrap();

            assert_eq!(result.summary.collision_skipped, skipped);
            assert_eq!(result.summary.errors, errors);
            assert_eq!(result.summary.collisions, 1);
            assert!(second.exists());
        }
    }

    #[test]
    fn collision_error_carries_kind() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "a/IMG_20240115_143000.jpg", &jpeg("first"));
        write(temp.path(), "b/IMG_20240115_143000.jpg", &jpeg("second"));

        let result = sorter(temp.path())
            .collision_policy(CollisionPolicy::Error)
            .build()
            .unwrap()
            .run()
            .unwrap();

        assert!(matches!(
            result.files[1].outcome,
            FileOutcome::Error {
                kind: FileErrorKind::Collision,
                ..
            }
        ));
    }

    #[test]
    fn overwrite_policy_replaces_destination() {
        let temp = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        write(dest.path(), "2024/01/2024-01-15_14-30-00.jpg", &jpeg("old"));
        write(temp.path(), "IMG_20240115_143000.jpg", &jpeg("new"));

        let result = sorter(temp.path())
            .destination(dest.path())
            .collision_policy(CollisionPolicy::Overwrite)
            .build()
            .unwrap()
            .run()
            .unwrap();

        assert_eq!(result.summary.collisions, 1);
        assert_eq!(result.summary.moved, 1);
        assert_eq!(
            fs::read(dest.path().join("2024/01/2024-01-15_14-30-00.jpg")).unwrap(),
            jpeg("new")
        );
    }

    #[test]
    fn identical_destination_removes_source() {
        let temp = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        write(dest.path(), "2024/01/2024-01-15_14-30-00.jpg", &jpeg("same"));
        let source = write(temp.path(), "IMG_20240115_143000.jpg", &jpeg("same"));

        let result = sorter(temp.path())
            .destination(dest.path())
            .build()
            .unwrap()
            .run()
            .unwrap();

        assert_eq!(result.summary.duplicates_removed, 1);
        assert_eq!(result.summary.collisions, 0);
        assert!(!source.exists());
    }

    #[test]
    fn second_run_is_a_no_op() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "IMG_20240115_143000.jpg", &jpeg("a"));
        write(temp.path(), "x/IMG_20240115_143000.jpg", &jpeg("b"));
        write(temp.path(), "holiday.png", PNG);

        let first = sorter(temp.path()).build().unwrap().run().unwrap();
        assert_eq!(first.summary.moved, 3);

        let second = sorter(temp.path()).build().unwrap().run().unwrap();
        assert_eq!(second.summary.moved, 0);
        assert_eq!(second.summary.duplicates_removed, 0);
        assert_eq!(second.summary.unchanged, 3);
    }

    #[test]
    fn dry_run_touches_nothing_and_matches_real_run() {
        let build = |root: &Path, dry_run: bool| {
            write(root, "a/IMG_20240115_143000.jpg", &jpeg("first"));
            write(root, "b/IMG_20240115_143000.jpg", &jpeg("second"));
            write(root, "c/IMG_20240115_143000.jpg", &jpeg("first"));
            write(root, "notes.txt", b"hello");
            sorter(root).dry_run(dry_run).prune(true).build().unwrap()
        };

        let dry = TempDir::new().unwrap();
        let dry_result = build(dry.path(), true).run().unwrap();
        assert!(dry.path().join("a/IMG_20240115_143000.jpg").exists());
        assert!(dry.path().join("notes.txt").exists());
        assert!(!dry.path().join("2024").exists());
        assert!(!dry.path().join(".pruned").exists());

        let real = TempDir::new().unwrap();
        let real_result = build(real.path(), false).run().unwrap();

        assert_eq!(dry_result.summary, real_result.summary);
        assert_eq!(real_result.summary.moved, 2);
        assert_eq!(real_result.summary.duplicates_removed, 1);
        assert_eq!(real_result.summary.pruned, 1);
    }

    #[test]
    fn non_images_are_pruned_aside() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "docs/notes.txt", b"hello");
        write(temp.path(), "fake.jpg", b"not really a jpeg");

        let result = sorter(temp.path()).prune(true).build().unwrap().run().unwrap();

        assert_eq!(result.summary.pruned, 2);
        assert!(temp.path().join(".pruned/docs/notes.txt").exists());
        assert!(temp.path().join(".pruned/fake.jpg").exists());
        assert!(!temp.path().join("fake.jpg").exists());
    }

    #[test]
    fn non_images_stay_without_prune() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "notes.txt", b"hello");

        let result = sorter(temp.path()).build().unwrap().run().unwrap();

        assert_eq!(result.summary.pruned, 1);
        assert_eq!(
            outcome_for(&result, "notes.txt"),
            &FileOutcome::Pruned { moved_to: None }
        );
        assert!(temp.path().join("notes.txt").exists());
    }

    #[test]
    fn undated_names_keep_their_stem() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "holiday.jpg", &jpeg("a"));

        let result = sorter(temp.path()).build().unwrap().run().unwrap();

        let FileOutcome::Moved { destination } = outcome_for(&result, "holiday.jpg") else {
            panic!("expected a move");
        };
        let name = destination.file_name().unwrap().to_str().unwrap();
        assert!(name.ends_with("_holiday.jpg"), "{}", name);
        assert_eq!(
            result.files[0].date.unwrap().source,
            DateSource::ModifiedTime
        );
    }

    #[test]
    fn fix_metadata_writes_resolved_date() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "IMG_20240115_143000.jpg", &jpeg("a"));

        let result = sorter(temp.path())
            .fix_metadata(true)
            .build()
            .unwrap()
            .run()
            .unwrap();

        assert_eq!(result.summary.metadata_fixed, 1);
        let moved = temp.path().join("2024/01/2024-01-15_14-30-00.jpg");
        let written = metadata::read_capture_date(&moved).unwrap();
        assert_eq!(written, Some(result.files[0].date.unwrap().datetime));
    }

    #[test]
    fn fix_metadata_dry_run_matches_real_run_against_fixed_copy() {
        let taken = NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(14, 30, 0)
            .unwrap();

        // The destination already holds the copy an earlier fixing run produced
        let build = |root: &Path, dest: &Path, dry_run: bool| {
            let source = write(root, "IMG_20240115_143000.jpg", &jpeg("a"));
            let fixed = DatedJpeg::prepare(&source, taken).unwrap();
            write(dest, "2024/01/2024-01-15_14-30-00.jpg", fixed.bytes());
            sorter(root)
                .destination(dest)
                .fix_metadata(true)
                .dry_run(dry_run)
                .build()
                .unwrap()
        };

        let (dry_root, dry_dest) = (TempDir::new().unwrap(), TempDir::new().unwrap());
        let planned = build(dry_root.path(), dry_dest.path(), true).run().unwrap();

        let (real_root, real_dest) = (TempDir::new().unwrap(), TempDir::new().unwrap());
        let done = build(real_root.path(), real_dest.path(), false).run().unwrap();

        assert_eq!(planned.summary, done.summary);
        assert_eq!(done.summary.duplicates_removed, 1);
        assert_eq!(done.summary.collisions, 0);
        assert!(dry_root.path().join("IMG_20240115_143000.jpg").exists());
        assert!(!real_root.path().join("IMG_20240115_143000.jpg").exists());
    }

    #[test]
    fn fix_metadata_skips_files_that_are_not_placed() {
        let temp = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        write(dest.path(), "2024/01/2024-01-15_14-30-00.jpg", &jpeg("other"));
        let source = write(temp.path(), "IMG_20240115_143000.jpg", &jpeg("a"));

        let result = sorter(temp.path())
            .destination(dest.path())
            .collision_policy(CollisionPolicy::Skip)
            .fix_metadata(true)
            .build()
            .unwrap()
            .run()
            .unwrap();

        assert_eq!(result.summary.collision_skipped, 1);
        assert_eq!(result.summary.metadata_fixed, 0);
        assert!(!result.files[0].metadata_fixed);
        assert_eq!(fs::read(&source).unwrap(), jpeg("a"));
    }

    #[test]
    fn fix_metadata_writes_files_already_in_place() {
        let temp = TempDir::new().unwrap();
        let path = write(temp.path(), "2024/01/2024-01-15_14-30-00.jpg", &jpeg("a"));

        let result = sorter(temp.path())
            .fix_metadata(true)
            .build()
            .unwrap()
            .run()
            .unwrap();

        assert_eq!(result.summary.unchanged, 1);
        assert_eq!(result.summary.metadata_fixed, 1);
        assert_eq!(
            metadata::read_capture_date(&path).unwrap(),
            Some(result.files[0].date.unwrap().datetime)
        );
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_name_is_dated_from_its_text() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let temp = TempDir::new().unwrap();
        let name = OsStr::from_bytes(b"IMG_20240115_143000_\xff.jpg");
        fs::write(temp.path().join(name), jpeg("a")).unwrap();

        let result = sorter(temp.path()).build().unwrap().run().unwrap();

        let date = result.files[0].date.unwrap();
        assert_eq!(date.source, DateSource::Filename);
        assert_eq!(
            date.datetime,
            NaiveDate::from_ymd_opt(2024, 1, 15)
                .unwrap()
                .and_hms_opt(14, 30, 0)
                .unwrap()
        );
        assert!(temp
            .path()
            .join("2024/01/2024-01-15_14-30-00_\u{FFFD}.jpg")
            .exists());
    }

    #[test]
    fn duplicates_are_found_across_roots() {
        let camera = TempDir::new().unwrap();
        let phone = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        write(camera.path(), "IMG_20240115_143000.jpg", &jpeg("same"));
        let copy = write(phone.path(), "PXL_20240115_143000.jpg", &jpeg("same"));
        write(phone.path(), "notes.txt", b"hello");

        let result = Sorter::builder()
            .roots([camera.path(), phone.path()])
            .destination(dest.path())
            .prune(true)
            .build()
            .unwrap()
            .run()
            .unwrap();

        assert_eq!(result.summary.scanned, 3);
        assert_eq!(result.summary.moved, 1);
        assert_eq!(result.summary.duplicates_removed, 1);
        assert!(!copy.exists());
        assert!(dest.path().join("2024/01/2024-01-15_14-30-00.jpg").exists());
        assert!(phone.path().join(".pruned/notes.txt").exists());
    }

    #[test]
    fn overlapping_roots_are_rejected() {
        let temp = TempDir::new().unwrap();
        let inner = temp.path().join("inner");
        fs::create_dir(&inner).unwrap();
        let dest = TempDir::new().unwrap();

        let result = Sorter::builder()
            .roots([temp.path(), inner.as_path()])
            .destination(dest.path())
            .build()
            .unwrap()
            .run();

        assert!(matches!(
            result,
            Err(SorterError::Config(ConfigError::InvalidSources { .. }))
        ));
    }

    #[test]
    fn fix_metadata_warns_for_unsupported_formats() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "IMG_20240115_143000.png", PNG);

        let result = sorter(temp.path())
            .fix_metadata(true)
            .build()
            .unwrap()
            .run()
            .unwrap();

        assert_eq!(result.summary.metadata_fixed, 0);
        assert_eq!(result.summary.warnings, 1);
        assert_eq!(result.summary.moved, 1);
    }

    #[test]
    fn cancelled_run_stops_before_first_file() {
        let temp = TempDir::new().unwrap();
        let source = write(temp.path(), "IMG_20240115_143000.jpg", &jpeg("a"));

        let result = sorter(temp.path())
            .cancel_flag(Arc::new(AtomicBool::new(true)))
            .build()
            .unwrap()
            .run()
            .unwrap();

        assert!(result.cancelled);
        assert!(result.files.is_empty());
        assert!(source.exists());
    }

    #[test]
    fn missing_root_is_a_scan_error() {
        let result = sorter(Path::new("/nonexistent/photos")).build().unwrap().run();
        assert!(matches!(result, Err(SorterError::Scan(_))));
    }
}
