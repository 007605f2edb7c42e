//! # deskmate CLI
//!
//! Command-line interface for the Deskmate engine.
//!
//! This binary provides human-friendly access to `deskmate-core`
//! functionality. Run `deskmate --help` for usage information.

mod cli;

use std::process::ExitCode;

fn main() -> ExitCode {
    cli::run()
}
