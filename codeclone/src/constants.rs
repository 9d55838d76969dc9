//! Tuning knobs and resource ceilings.

use std::time::Duration;

/// Source files above this size are skipped with a typed reason.
pub const MAX_SOURCE_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Caches above this size are ignored (fail-open).
pub const MAX_CACHE_SIZE_BYTES: u64 = 50 * 1024 * 1024;

/// Baselines above this size are untrusted.
pub const MAX_BASELINE_SIZE_BYTES: u64 = 5 * 1024 * 1024;

/// Hard ceiling on discovered files per scan.
pub const MAX_SCAN_FILES: usize = 100_000;

/// Hard ceiling on directory nesting; deeper entries are not visited.
pub const MAX_SCAN_DEPTH: usize = 64;

/// A file whose parse exceeds this budget is classified as a parse failure.
pub const PARSE_TIME_BUDGET: Duration = Duration::from_secs(5);

/// Files dispatched to the worker pool per chunk.
pub const CHUNK_SIZE: usize = 128;

/// Sliding window length for block clones.
pub const BLOCK_SIZE: usize = 4;

/// Upper bound on block windows emitted per function.
pub const MAX_BLOCKS_PER_FUNCTION: usize = 15;

/// Functions below these thresholds emit no block windows.
pub const BLOCK_MIN_LOC: usize = 40;
pub const BLOCK_MIN_STMT: usize = 10;

/// Sliding window length for segment (in-function) clones.
pub const SEGMENT_WINDOW_SIZE: usize = 6;

/// Upper bound on segment windows emitted per function.
pub const MAX_SEGMENTS_PER_FUNCTION: usize = 60;

/// Functions below these thresholds emit no segment windows.
pub const SEGMENT_MIN_LOC: usize = 30;
pub const SEGMENT_MIN_STMT: usize = 12;

/// A segment report group needs this many distinct statement kinds unless it
/// contains control flow.
pub const SEGMENT_MIN_UNIQUE_STMT_KINDS: usize = 2;

/// Width of the coarse LOC bucket paired with the fingerprint.
pub const LOC_BUCKET_WIDTH: usize = 20;

/// Directory names never descended into.
pub const DEFAULT_EXCLUDES: &[&str] = &[
    ".git",
    ".venv",
    "venv",
    "__pycache__",
    "site-packages",
    "migrations",
    "alembic",
    "dist",
    "build",
    ".tox",
];

/// Roots that are refused outright unless the scan runs under the system
/// temp directory (test sandboxes).
pub const SENSITIVE_DIRS: &[&str] = &[
    "/etc",
    "/sys",
    "/proc",
    "/dev",
    "/root",
    "/boot",
    "/var",
    "/private/var",
    "/usr/bin",
    "/usr/sbin",
    "/private/etc",
];
