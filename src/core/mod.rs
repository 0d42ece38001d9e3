//! # Core Module
//!
//! The UI-agnostic sorting engine.
//!
//! ## Modules
//! - `scanner` - Discovers files and tells images from non-images
//! - `metadata` - Reads and writes the EXIF capture date
//! - `date` - Resolves a capture date through a chain of strategies
//! - `fingerprint` - Exact-content fingerprints and the duplicate index
//! - `organize` - Naming patterns, collision policies and file moves
//! - `pipeline` - Drives a full sort run

pub mod date;
pub mod fingerprint;
pub mod metadata;
pub mod organize;
pub mod pipeline;
pub mod scanner;

// Re-export commonly used types
pub use date::{DateSource, ResolvedDate, ResolverChain};
pub use fingerprint::{Fingerprint, FingerprintIndex};
pub use organize::{CollisionPolicy, FileOutcome, FileReport, NamingPattern};
pub use pipeline::{SortConfig, SortResult, SortSummary, Sorter, SorterBuilder};
pub use scanner::{FileKind, ImageFormat, ScannedFile};
