//! Stable version tags and exit codes shared by the baseline, cache, and
//! report contracts.

/// Schema version written into baseline `meta.schema_version`.
pub const BASELINE_SCHEMA_VERSION: &str = "1.0";

/// Bumping this invalidates every existing baseline and cache. There is no
/// migration path; both must be regenerated.
pub const FINGERPRINT_VERSION: &str = "1";

/// Cache document schema version (`v` field).
pub const CACHE_VERSION: &str = "1.1";

/// Report document schema version (`meta.report_schema_version`).
pub const REPORT_SCHEMA_VERSION: &str = "1.1";

/// Canonical generator tag checked during baseline trust classification.
pub const GENERATOR_NAME: &str = "codeclone";

/// Opaque parser-flavor tag. This build parses with ruff's Python 3.13
/// grammar; any environmental factor that could shift AST shape is captured
/// by this tag and gated on load.
pub const PYTHON_TAG: &str = "rpy313";

/// Stable process exit codes. Contract errors override gating failures when
/// both would apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Run completed without gating failures.
    Success = 0,
    /// Invalid arguments, bad output path, untrusted baseline or unreadable
    /// source in gating mode, atomic write failure.
    ContractError = 2,
    /// New clones under `--fail-on-new`, or `--fail-threshold` exceeded.
    GatingFailure = 3,
    /// Unexpected uncaught error in the driver.
    InternalError = 5,
}

impl ExitCode {
    /// Numeric process exit code.
    #[must_use]
    pub const fn code(self) -> i32 {
        self as i32
    }
}
