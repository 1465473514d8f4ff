//! Tempo - schedule-aware task tracking for the command line

use std::process::ExitCode;

fn main() -> ExitCode {
    if let Err(e) = tempo_cli::cli::run() {
        eprintln!("Error: {:#}", e);
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
