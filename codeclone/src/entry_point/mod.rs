//! Shared driver entry point used by both binaries, so CLI behavior is
//! identical regardless of which wrapper invoked it.

mod args;
mod run;
mod summary;

pub use args::Cli;

use anyhow::Result;
use clap::Parser;

use crate::contracts::ExitCode;

/// Runs the analyzer with the given arguments using stdout as the writer.
///
/// # Errors
///
/// Returns an error only when writing to the output stream fails; every
/// analysis failure is converted to an exit code.
pub fn run_with_args(args: Vec<String>) -> Result<i32> {
    run_with_args_to(args, &mut std::io::stdout())
}

/// Testable variant of [`run_with_args`] that allows output capture.
///
/// # Errors
///
/// Returns an error only when writing to `writer` fails.
pub fn run_with_args_to<W: std::io::Write>(args: Vec<String>, writer: &mut W) -> Result<i32> {
    let mut program_args = vec!["codeclone".to_owned()];
    program_args.extend(args);

    let cli = match Cli::try_parse_from(program_args) {
        Ok(cli) => cli,
        Err(e) => {
            match e.kind() {
                clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                    write!(writer, "{e}")?;
                    writer.flush()?;
                    return Ok(ExitCode::Success.code());
                }
                _ => {
                    eprint!("{e}");
                    return Ok(ExitCode::ContractError.code());
                }
            }
        }
    };

    let debug = cli.debug || std::env::var("CODECLONE_DEBUG").as_deref() == Ok("1");

    match run::execute(&cli, writer) {
        Ok(code) => Ok(code),
        Err(e) => {
            // The stable marker line for uncaught driver failures; the
            // backtrace-style chain only appears in debug mode.
            eprintln!("INTERNAL ERROR: {e}");
            if debug {
                eprintln!("{e:?}");
            }
            Ok(ExitCode::InternalError.code())
        }
    }
}
