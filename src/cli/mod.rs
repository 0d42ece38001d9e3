//! # CLI Module
//!
//! Command-line interface for the photo sorter.
//!
//! ## Usage
//! ```bash
//! # Sort a directory in place
//! sort-images ~/Photos
//!
//! # See what would happen first
//! sort-images ~/Photos --dry-run --verbose
//!
//! # Sort into another directory, keeping both files on name clashes
//! sort-images ~/Camera --dest ~/Photos --on-collision suffix
//!
//! # Merge several card dumps, removing duplicates across them
//! sort-images ~/Import/card1 ~/Import/card2 --dest ~/Photos
//!
//! # Move non-images aside and print a JSON report
//! sort-images ~/Photos --prune --output json
//! ```
//!
//! ## Exit Codes
//! - `0` - success (skipped, unresolved and pruned files are fine)
//! - `1` - at least one file ended in an error
//! - `2` - invalid root or configuration
//! - `130` - interrupted

use clap::{Parser, ValueEnum};
use console::{style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use photo_sorter::core::organize::{CollisionPolicy, FileOutcome};
use photo_sorter::core::pipeline::{SortResult, Sorter, DEFAULT_PRUNE_DIR};
use photo_sorter::events::{Event, EventChannel, FileEvent, RunEvent, ScanEvent};
use photo_sorter::SorterError;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

const EXIT_FILE_ERRORS: u8 = 1;
const EXIT_FATAL: u8 = 2;
const EXIT_INTERRUPTED: u8 = 130;

/// Sort photos into folders by the date they were taken
#[derive(Parser, Debug)]
#[command(name = "sort-images")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directories to sort (several need --dest)
    #[arg(required = true, num_args = 1..)]
    directories: Vec<PathBuf>,

    /// Destination root (defaults to the sorted directory)
    #[arg(short, long)]
    dest: Option<PathBuf>,

    /// Naming pattern, e.g. "{date:%Y}/{date:%m}/{date:%Y-%m-%d_%H-%M-%S}{suffix}"
    #[arg(short, long)]
    pattern: Option<String>,

    /// What to do when a destination holds different content
    #[arg(short = 'c', long, default_value = "suffix")]
    on_collision: Collision,

    /// Show what would happen without touching any file
    #[arg(short = 'n', long)]
    dry_run: bool,

    /// Move non-image files aside into the prune directory
    #[arg(long)]
    prune: bool,

    /// Prune directory (relative paths are taken under each DIRECTORY)
    #[arg(long, default_value = DEFAULT_PRUNE_DIR)]
    prune_dir: PathBuf,

    /// Write the resolved date into JPEG files that lack one
    #[arg(long)]
    fix_metadata: bool,

    /// Extra filename date regex with named groups year, month, day
    /// (optionally hour, minute, second, prefix, suffix); repeatable
    #[arg(long = "filename-pattern", value_name = "REGEX")]
    filename_patterns: Vec<String>,

    /// Include hidden files
    #[arg(long)]
    include_hidden: bool,

    /// Output format
    #[arg(short, long, default_value = "pretty")]
    output: OutputFormat,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Collision {
    /// Append _1, _2, ... to the name
    Suffix,
    /// Leave the file where it is
    Skip,
    /// Replace the existing file
    Overwrite,
    /// Report an error for the file
    Error,
}

impl From<Collision> for CollisionPolicy {
    fn from(collision: Collision) -> Self {
        match collision {
            Collision::Suffix => CollisionPolicy::Suffix,
            Collision::Skip => CollisionPolicy::Skip,
            Collision::Overwrite => CollisionPolicy::Overwrite,
            Collision::Error => CollisionPolicy::Error,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable output with colors
    Pretty,
    /// JSON output for scripting
    Json,
}

/// Run the CLI
pub fn run() -> ExitCode {
    let cli = Cli::parse();
    photo_sorter::init_tracing(if cli.verbose { "info" } else { "warn" });

    let term = Term::stderr();
    match run_sort(&cli, &term) {
        Ok(result) => {
            if result.cancelled {
                ExitCode::from(EXIT_INTERRUPTED)
            } else if result.has_errors() {
                ExitCode::from(EXIT_FILE_ERRORS)
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(error) => {
            term.write_line(&format!("{} {}", style("error:").red().bold(), error))
                .ok();
            ExitCode::from(EXIT_FATAL)
        }
    }
}

fn run_sort(cli: &Cli, term: &Term) -> Result<SortResult, SorterError> {
    let pretty = matches!(cli.output, OutputFormat::Pretty);

    if pretty {
        term.write_line(&format!(
            "{} {}{}",
            style("Photo Sorter").bold().cyan(),
            style(concat!("v", env!("CARGO_PKG_VERSION"))).dim(),
            if cli.dry_run {
                style(" (dry run)").yellow().to_string()
            } else {
                String::new()
            }
        ))
        .ok();
        term.write_line("").ok();
    }

    let cancelled = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancelled);
    if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst)) {
        tracing::warn!("Ctrl-C handler not installed: {}", e);
    }

    let mut builder = Sorter::builder()
        .roots(&cli.directories)
        .collision_policy(cli.on_collision.into())
        .dry_run(cli.dry_run)
        .prune(cli.prune)
        .prune_dir(&cli.prune_dir)
        .fix_metadata(cli.fix_metadata)
        .include_hidden(cli.include_hidden)
        .cancel_flag(cancelled);

    if let Some(ref dest) = cli.dest {
        builder = builder.destination(dest);
    }
    if let Some(ref pattern) = cli.pattern {
        builder = builder.pattern(pattern);
    }
    for regex in &cli.filename_patterns {
        builder = builder.filename_pattern(regex);
    }

    let sorter = builder.build()?;

    // Set up event handling
    let (sender, receiver) = EventChannel::new();

    let progress = if pretty {
        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▓░"),
        );
        Some(pb)
    } else {
        None
    };

    let progress_clone = progress.clone();
    let verbose = cli.verbose;

    // Handle events in a separate thread
    let event_thread = thread::spawn(move || {
        for event in receiver.iter() {
            let Some(ref pb) = progress_clone else {
                continue;
            };

            match event {
                Event::Scan(ScanEvent::Started { .. }) => pb.set_message("scanning"),
                Event::Scan(ScanEvent::Completed { total_files }) => {
                    pb.inc_length(total_files as u64);
                    pb.set_message("sorting");
                }
                Event::File(FileEvent::Processed(p)) => {
                    pb.set_position(p.completed as u64);
                    if verbose {
                        pb.set_message(
                            p.path
                                .file_name()
                                .unwrap_or_default()
                                .to_string_lossy()
                                .into_owned(),
                        );
                    }
                }
                Event::File(FileEvent::Warning { path, message }) if verbose => {
                    pb.println(format!(
                        "  {} {}: {}",
                        style("!").yellow(),
                        path.display(),
                        message
                    ));
                }
                Event::Run(RunEvent::Cancelled) => pb.abandon_with_message("interrupted"),
                Event::Run(RunEvent::Completed { .. }) => pb.finish_and_clear(),
                _ => {}
            }
        }
    });

    let result = sorter.run_with_events(&sender);

    // Drop sender to signal event thread to finish
    drop(sender);
    event_thread.join().ok();

    let result = result?;

    match cli.output {
        OutputFormat::Pretty => {
            let mut roots = cli.directories.clone();
            roots.extend(cli.dest.iter().cloned());
            print_pretty_results(term, &result, &roots, cli.verbose)
        }
        OutputFormat::Json => print_json_results(&result),
    }

    Ok(result)
}

fn print_pretty_results(term: &Term, result: &SortResult, roots: &[PathBuf], verbose: bool) {
    let s = &result.summary;
    let roots: Vec<PathBuf> = roots
        .iter()
        .map(|root| root.canonicalize().unwrap_or_else(|_| root.clone()))
        .collect();
    let root = roots.as_slice();
    let verb = |real: &'static str, dry: &'static str| if result.dry_run { dry } else { real };

    term.write_line("").ok();
    let headline = if result.cancelled {
        format!("{} Interrupted", style("✗").yellow().bold())
    } else if result.dry_run {
        format!("{} Dry Run Complete", style("✓").green().bold())
    } else {
        format!("{} Sort Complete", style("✓").green().bold())
    };
    term.write_line(&headline).ok();
    term.write_line("").ok();

    term.write_line(&format!(
        "  {} files scanned in {:.1}s",
        style(s.scanned).cyan(),
        result.duration_ms as f64 / 1000.0
    ))
    .ok();

    let lines = [
        (s.moved, verb("moved", "would be moved")),
        (s.unchanged, "already in place"),
        (s.duplicates_removed, verb("duplicates removed", "duplicates would be removed")),
        (s.pruned, "non-images pruned"),
        (s.unresolved, "without a date (left in place)"),
        (s.collisions, "name collisions"),
        (s.collision_skipped, "skipped on collision"),
        (s.metadata_fixed, verb("dates written to metadata", "dates would be written")),
    ];
    for (count, label) in lines {
        if count > 0 {
            term.write_line(&format!("  {} {}", style(count).cyan(), label))
                .ok();
        }
    }

    if s.warnings > 0 {
        term.write_line(&format!("  {} warnings", style(s.warnings).yellow()))
            .ok();
    }
    if s.errors > 0 {
        term.write_line(&format!("  {} errors", style(s.errors).red().bold()))
            .ok();
    }

    let shown: Vec<_> = result
        .files
        .iter()
        .filter(|r| verbose || matches!(r.outcome, FileOutcome::Error { .. }))
        .filter(|r| !matches!(r.outcome, FileOutcome::Unchanged))
        .collect();

    if !shown.is_empty() {
        term.write_line("").ok();
        for report in shown {
            let path = display_path(&report.path, root);
            let line = match &report.outcome {
                FileOutcome::Moved { destination }
                | FileOutcome::CollisionResolved { destination, .. } => format!(
                    "  {} {} -> {}",
                    style("→").green(),
                    path,
                    display_path(destination, root)
                ),
                FileOutcome::DuplicateRemoved { original } => format!(
                    "  {} {} (duplicate of {})",
                    style("×").dim(),
                    path,
                    display_path(original, root)
                ),
                FileOutcome::CollisionSkipped { destination } => format!(
                    "  {} {} ({} exists)",
                    style("○").yellow(),
                    path,
                    display_path(destination, root)
                ),
                FileOutcome::Pruned { moved_to } => match moved_to {
                    Some(target) => format!(
                        "  {} {} -> {}",
                        style("-").dim(),
                        path,
                        display_path(target, root)
                    ),
                    None => format!("  {} {} (not an image)", style("-").dim(), path),
                },
                FileOutcome::Unresolved => {
                    format!("  {} {} (no date)", style("?").yellow(), path)
                }
                FileOutcome::Error { message, .. } => {
                    format!("  {} {}", style("✗").red(), message)
                }
                FileOutcome::Unchanged => continue,
            };
            term.write_line(&line).ok();
        }
    }

    for error in &result.scan_errors {
        term.write_line(&format!("  {} {}", style("✗").red(), error))
            .ok();
    }

    if result.dry_run {
        term.write_line("").ok();
        term.write_line(&format!(
            "{}",
            style("Dry run: no files were changed.").dim()
        ))
        .ok();
    }
}

fn print_json_results(result: &SortResult) {
    match serde_json::to_string_pretty(result) {
        Ok(json) => println!("{}", json),
        Err(e) => tracing::error!("could not serialize results: {}", e),
    }
}

/// `path` relative to the first of `roots` that contains it
fn display_path(path: &Path, roots: &[PathBuf]) -> String {
    roots
        .iter()
        .find_map(|root| path.strip_prefix(root).ok())
        .unwrap_or(path)
        .display()
        .to_string()
}
