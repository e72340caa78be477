//! extsnap - extension-filtered timestamped backups
//!
//! Main binary entry point for the command-line interface.

use clap::Parser;
use extsnap::cli::{execute, Cli};
use extsnap::report::EXIT_FAILURE;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    match execute(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(EXIT_FAILURE)
        }
    }
}
