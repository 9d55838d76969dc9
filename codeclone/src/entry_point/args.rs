use clap::Parser;
use std::path::PathBuf;

/// Command line interface configuration using `clap`.
#[derive(Parser, Debug)]
#[command(
    name = "codeclone",
    version,
    about = "AST and CFG based structural clone detector for Python source trees."
)]
#[allow(clippy::struct_excessive_bools)] // CLI flags are legitimately booleans
pub struct Cli {
    /// Project root directory to scan.
    #[arg(default_value = ".")]
    pub root: PathBuf,

    /// Minimum lines of code for a function to be considered.
    #[arg(long, default_value_t = 15)]
    pub min_loc: usize,

    /// Minimum top-level statements for a function to be considered.
    #[arg(long, default_value_t = 6)]
    pub min_stmt: usize,

    /// Number of parallel worker threads.
    #[arg(long, default_value_t = 4)]
    pub processes: usize,

    /// Path to the incremental cache file
    /// (default: `<root>/.cache/codeclone/cache.json`).
    #[arg(long, value_name = "FILE")]
    pub cache_path: Option<PathBuf>,

    /// Caches above this size are ignored.
    #[arg(long, value_name = "MB", default_value_t = 50)]
    pub max_cache_size_mb: u64,

    /// Path to the baseline file (stored in the repo).
    #[arg(long, default_value = "./codeclone.baseline.json")]
    pub baseline: PathBuf,

    /// Baselines above this size are untrusted.
    #[arg(long, value_name = "MB", default_value_t = 5)]
    pub max_baseline_size_mb: u64,

    /// Overwrite the baseline file with the current results.
    #[arg(long)]
    pub update_baseline: bool,

    /// Exit with an error if clones not present in the baseline are found.
    #[arg(long)]
    pub fail_on_new: bool,

    /// Exit with an error if total clone groups exceed this number.
    #[arg(long, value_name = "MAX_CLONES")]
    pub fail_threshold: Option<usize>,

    /// CI mode: equivalent to --fail-on-new --no-color --quiet.
    #[arg(long)]
    pub ci: bool,

    /// Write an HTML report to FILE (extension must be .html).
    #[arg(long, value_name = "FILE")]
    pub html: Option<PathBuf>,

    /// Write a JSON report to FILE (extension must be .json).
    #[arg(long, value_name = "FILE")]
    pub json: Option<PathBuf>,

    /// Write a text report to FILE (extension must be .txt).
    #[arg(long, value_name = "FILE")]
    pub text: Option<PathBuf>,

    /// Disable the progress bar (recommended for CI logs).
    #[arg(long)]
    pub no_progress: bool,

    /// Disable colored output.
    #[arg(long)]
    pub no_color: bool,

    /// Quiet mode: only the compact summary is printed.
    #[arg(long)]
    pub quiet: bool,

    /// Verbose diagnostics on stderr.
    #[arg(long)]
    pub verbose: bool,

    /// Include backtraces in internal error output
    /// (also honored via CODECLONE_DEBUG=1).
    #[arg(long)]
    pub debug: bool,
}
