//! # irra CLI
//!
//! Command-line interface for the Iterative Reflective Retrieval Assistant.
//!
//! This binary provides human-friendly access to `irra-core` functionality.
//! Run `irra --help` for usage information.

mod cli;
pub mod ui;

use std::process::ExitCode;

fn main() -> ExitCode {
    cli::run()
}
