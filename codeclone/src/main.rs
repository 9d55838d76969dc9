//! Main binary entry point for the `codeclone` clone detector.
//!
//! Delegates to the shared `entry_point::run_with_args()` so behavior is
//! identical across all entry points.

use anyhow::Result;

fn main() -> Result<()> {
    let code = codeclone::entry_point::run_with_args(std::env::args().skip(1).collect())?;
    std::process::exit(code);
}
