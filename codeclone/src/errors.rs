//! Typed failure reasons recorded on files and surfaced by the loaders.

/// Why a file was parsed but could not be analyzed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseFailure {
    /// The parser rejected the source.
    Syntax(String),
    /// Parsing exceeded the per-file time budget.
    Timeout,
}

impl std::fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Syntax(msg) => write!(f, "parse error: {msg}"),
            Self::Timeout => write!(f, "parse time budget exceeded"),
        }
    }
}

impl std::error::Error for ParseFailure {}

/// Why a discovered file was skipped. Parse failures are always non-fatal;
/// source-read failures become contract errors in gating mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileSkipReason {
    /// Read or decode failure.
    SourceIo(String),
    /// File exceeds the per-file size ceiling.
    Oversize(u64),
    /// Parser rejected the file or ran past the time budget.
    Parse(ParseFailure),
}

impl FileSkipReason {
    /// True for the reasons counted as `files_skipped_source_io`.
    #[must_use]
    pub const fn is_source_io(&self) -> bool {
        matches!(self, Self::SourceIo(_) | Self::Oversize(_))
    }
}

impl std::fmt::Display for FileSkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SourceIo(msg) => write!(f, "source read failed: {msg}"),
            Self::Oversize(size) => write!(f, "file too large ({size} bytes)"),
            Self::Parse(e) => write!(f, "{e}"),
        }
    }
}

/// Scan-level failures. All of these are contract errors.
#[derive(Debug)]
pub enum ScanError {
    /// Root does not exist or is not a directory.
    InvalidRoot(String),
    /// Root is (or is under) a blocked system directory.
    SensitiveRoot(String),
    /// The tree exceeds the file-count ceiling.
    TooManyFiles(usize),
}

impl std::fmt::Display for ScanError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidRoot(msg) => write!(f, "invalid root path: {msg}"),
            Self::SensitiveRoot(path) => {
                write!(f, "cannot scan sensitive directory: {path}")
            }
            Self::TooManyFiles(limit) => {
                write!(f, "file count exceeds limit of {limit}; use a more specific root")
            }
        }
    }
}

impl std::error::Error for ScanError {}
