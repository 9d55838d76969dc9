//! Command-line wrapper for `codeclone`.

use std::process::ExitCode;

use codeclone::entry_point;

fn main() -> ExitCode {
    // Avoid std::process::exit() so destructors (progress bars, buffered
    // writers) run before the process ends.
    match entry_point::run_with_args(std::env::args().skip(1).collect()) {
        Ok(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
