//! Deterministic source-tree traversal with containment and resource
//! guards.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::constants::{
    DEFAULT_EXCLUDES, MAX_SCAN_DEPTH, MAX_SCAN_FILES, MAX_SOURCE_FILE_SIZE, SENSITIVE_DIRS,
};
use crate::errors::{FileSkipReason, ScanError};

/// Resolves and vets the scan root: it must exist, be a directory, and not
/// be (or sit under) a blocked system directory. Roots under the system
/// temp directory are exempt from the blocklist so sandboxed runs work.
pub fn resolve_root(root: &Path) -> Result<PathBuf, ScanError> {
    let resolved = root
        .canonicalize()
        .map_err(|e| ScanError::InvalidRoot(format!("{}: {e}", root.display())))?;
    if !resolved.is_dir() {
        return Err(ScanError::InvalidRoot(format!(
            "root must be a directory: {}",
            resolved.display()
        )));
    }

    let temp_root = std::env::temp_dir()
        .canonicalize()
        .unwrap_or_else(|_| std::env::temp_dir());
    if !resolved.starts_with(&temp_root) {
        let root_str = resolved.to_string_lossy();
        for sensitive in SENSITIVE_DIRS {
            if root_str.as_ref() == *sensitive || root_str.starts_with(&format!("{sensitive}/")) {
                return Err(ScanError::SensitiveRoot(root_str.into_owned()));
            }
        }
    }

    Ok(resolved)
}

/// Walks `root` and returns every analyzable `.py` file, lexicographically
/// sorted. Excluded directory names are never descended into; paths that
/// resolve outside the root through symlinks are skipped silently.
pub fn iter_py_files(root: &Path) -> Result<Vec<PathBuf>, ScanError> {
    let mut files = Vec::new();

    let walker = WalkDir::new(root)
        .follow_links(false)
        .max_depth(MAX_SCAN_DEPTH)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            !(entry.file_type().is_dir() && is_excluded_dir(entry.file_name()))
        });

    for entry in walker {
        let Ok(entry) = entry else { continue };
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if path.extension().map_or(true, |ext| ext != "py") {
            continue;
        }
        // Containment check against symlinked escapes.
        match path.canonicalize() {
            Ok(resolved) if resolved.starts_with(root) => {}
            _ => continue,
        }
        files.push(path.to_path_buf());
        if files.len() > MAX_SCAN_FILES {
            return Err(ScanError::TooManyFiles(MAX_SCAN_FILES));
        }
    }

    files.sort();
    Ok(files)
}

fn is_excluded_dir(name: &std::ffi::OsStr) -> bool {
    DEFAULT_EXCLUDES
        .iter()
        .any(|excluded| name == std::ffi::OsStr::new(excluded))
}

/// Reads a source file within the size ceiling, classifying failures.
///
/// # Errors
///
/// Returns a typed [`FileSkipReason`] for oversized, unreadable, or
/// non-UTF-8 files.
pub fn read_source(path: &Path) -> Result<String, FileSkipReason> {
    let metadata =
        std::fs::metadata(path).map_err(|e| FileSkipReason::SourceIo(e.to_string()))?;
    if metadata.len() > MAX_SOURCE_FILE_SIZE {
        return Err(FileSkipReason::Oversize(metadata.len()));
    }
    let bytes = std::fs::read(path).map_err(|e| FileSkipReason::SourceIo(e.to_string()))?;
    String::from_utf8(bytes)
        .map_err(|_| FileSkipReason::SourceIo(format!("{}: invalid UTF-8", path.display())))
}
