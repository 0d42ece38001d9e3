//! # Photo Sorter
//!
//! Sorts a directory of photos into a date-based layout.
//!
//! ## What a Run Does
//! - **Dates every photo** - embedded EXIF first, then a date in the file
//!   name, then the file's modification time
//! - **Renames by date** - a configurable naming pattern decides the
//!   destination path
//! - **Removes exact duplicates** - byte-identical copies of a photo already
//!   seen in the run are deleted; the first one in walk order survives
//! - **Never loses content** - a name taken by different content is handled
//!   by the collision policy, never silently replaced
//!
//! ## Architecture
//! The library is split into a core engine (UI-agnostic) and presentation layers:
//! - `core` - The sorting engine
//! - `events` - Event-driven progress reporting
//! - `error` - Error types
//! - `cli` - Command-line interface (binary only)

pub mod core;
pub mod error;
pub mod events;

// Re-export commonly used types at the crate root
pub use error::{Result, SorterError};

/// Initialize tracing for the library
///
/// `RUST_LOG` takes precedence; otherwise `default_level` applies. Output
/// goes to stderr so it never mixes with JSON on stdout. Calling this more
/// than once is harmless.
pub fn init_tracing(default_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
