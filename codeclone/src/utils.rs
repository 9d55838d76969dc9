use ruff_text_size::TextSize;
use std::io::Write;
use std::path::{Path, PathBuf};

/// A utility struct to convert byte offsets to line numbers.
///
/// The AST parser works with byte offsets, but units and windows are
/// reported with 1-indexed line numbers.
#[derive(Debug, Clone)]
pub struct LineIndex {
    /// Stores the byte index of the start of each line.
    line_starts: Vec<usize>,
}

impl LineIndex {
    /// Creates a new `LineIndex` by scanning the source code for newlines.
    #[must_use]
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        // Newlines are always single bytes in UTF-8.
        for (i, byte) in source.as_bytes().iter().enumerate() {
            if *byte == b'\n' {
                line_starts.push(i + 1);
            }
        }
        Self { line_starts }
    }

    /// Converts a `TextSize` (byte offset) to a 1-indexed line number.
    #[must_use]
    pub fn line_index(&self, offset: TextSize) -> usize {
        let offset = offset.to_usize();
        match self.line_starts.binary_search(&offset) {
            Ok(line) => line + 1,
            Err(line) => line,
        }
    }

    /// 1-indexed line of the last byte covered by `end` (an exclusive
    /// offset, as produced by AST ranges).
    #[must_use]
    pub fn end_line_index(&self, end: TextSize) -> usize {
        let offset = end.to_u32().saturating_sub(1);
        self.line_index(TextSize::from(offset))
    }
}

/// Derives the dotted module name of `filepath` relative to the scan root.
/// `pkg/mod.py` becomes `pkg.mod`; `pkg/__init__.py` becomes `pkg`.
#[must_use]
pub fn module_name_from_path(root: &Path, filepath: &Path) -> String {
    let rel: PathBuf = filepath
        .strip_prefix(root)
        .map_or_else(|_| filepath.to_path_buf(), Path::to_path_buf);
    let mut stem = rel.with_extension("");
    if stem.file_name().is_some_and(|name| name == "__init__") {
        stem = stem.parent().map(Path::to_path_buf).unwrap_or_default();
    }
    stem.components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(".")
}

/// Writes `contents` to `path` atomically: a sibling `.tmp` file on the same
/// filesystem is written first, then rename-replaced over the target.
pub fn write_atomic(path: &Path, contents: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let file_name = path
        .file_name()
        .map_or_else(|| "out".to_owned(), |n| n.to_string_lossy().into_owned());
    let tmp_path = path.with_file_name(format!("{file_name}.tmp"));
    {
        let mut tmp = std::fs::File::create(&tmp_path)?;
        tmp.write_all(contents.as_bytes())?;
        tmp.sync_all()?;
    }
    std::fs::rename(&tmp_path, path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_index_maps_offsets() {
        let index = LineIndex::new("a = 1\nb = 2\nc = 3\n");
        assert_eq!(index.line_index(TextSize::from(0)), 1);
        assert_eq!(index.line_index(TextSize::from(6)), 2);
        assert_eq!(index.line_index(TextSize::from(12)), 3);
        assert_eq!(index.end_line_index(TextSize::from(11)), 2);
    }

    #[test]
    fn test_module_name_from_path() {
        let root = Path::new("/proj");
        assert_eq!(
            module_name_from_path(root, Path::new("/proj/pkg/mod.py")),
            "pkg.mod"
        );
        assert_eq!(
            module_name_from_path(root, Path::new("/proj/pkg/__init__.py")),
            "pkg"
        );
        assert_eq!(module_name_from_path(root, Path::new("/proj/top.py")), "top");
    }

    #[test]
    fn test_write_atomic_replaces_existing() {
        let dir = std::env::temp_dir().join("codeclone-utils-test");
        std::fs::create_dir_all(&dir).unwrap();
        let target = dir.join("out.json");
        write_atomic(&target, "first").unwrap();
        write_atomic(&target, "second").unwrap();
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "second");
        std::fs::remove_dir_all(&dir).ok();
    }
}
