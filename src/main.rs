//! # sort-images CLI
//!
//! Command-line interface for the photo sorter.
//!
//! ## Usage
//! ```bash
//! sort-images ~/Photos --dry-run
//! sort-images ~/Camera --dest ~/Photos --on-collision skip --output json
//! ```

mod cli;

use std::process::ExitCode;

fn main() -> ExitCode {
    cli::run()
}
