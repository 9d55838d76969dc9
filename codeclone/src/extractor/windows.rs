//! Sliding-window extraction over the top-level normalized statement
//! sequence of a function body.

use ruff_python_ast as ast;
use ruff_text_size::Ranged;

use crate::hashing::sha1_hex;
use crate::normalize::{skip_docstring, stmt_hash, NormalizeConfig};
use crate::utils::LineIndex;

/// A fixed-size window of consecutive normalized statements, reported
/// across functions by its order-sensitive hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockUnit {
    pub block_hash: String,
    pub filepath: String,
    pub qualname: String,
    pub start_line: usize,
    pub end_line: usize,
    pub size: usize,
}

/// A larger window reported only within the same function. Carries the
/// order-sensitive `segment_hash` for strict equivalence and the
/// order-insensitive `segment_sig` for candidate clustering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentUnit {
    pub segment_hash: String,
    pub segment_sig: String,
    pub filepath: String,
    pub qualname: String,
    pub start_line: usize,
    pub end_line: usize,
    pub size: usize,
}

#[allow(clippy::too_many_arguments)]
pub fn extract_blocks(
    func: &ast::StmtFunctionDef,
    line_index: &LineIndex,
    filepath: &str,
    qualname: &str,
    config: &NormalizeConfig,
    block_size: usize,
    max_blocks: usize,
) -> Vec<BlockUnit> {
    let body = skip_docstring(&func.body, config);
    if block_size == 0 || body.len() < block_size {
        return Vec::new();
    }

    let stmt_hashes: Vec<String> = body.iter().map(|s| stmt_hash(s, config)).collect();

    let mut blocks = Vec::new();
    let mut last_start: Option<usize> = None;
    // Allow some overlap (50%), but at least 3 lines apart.
    let min_line_distance = (block_size / 2).max(3);

    for i in 0..=(stmt_hashes.len() - block_size) {
        let start = line_index.line_index(body[i].range().start());
        let end = line_index.end_line_index(body[i + block_size - 1].range().end());

        if last_start.is_some_and(|last| start.saturating_sub(last) < min_line_distance) {
            continue;
        }

        let joined = stmt_hashes[i..i + block_size].join("|");

        blocks.push(BlockUnit {
            block_hash: sha1_hex(&joined),
            filepath: filepath.to_owned(),
            qualname: qualname.to_owned(),
            start_line: start,
            end_line: end,
            size: block_size,
        });

        last_start = Some(start);
        if blocks.len() >= max_blocks {
            break;
        }
    }

    blocks
}

#[allow(clippy::too_many_arguments)]
pub fn extract_segments(
    func: &ast::StmtFunctionDef,
    line_index: &LineIndex,
    filepath: &str,
    qualname: &str,
    config: &NormalizeConfig,
    window_size: usize,
    max_segments: usize,
) -> Vec<SegmentUnit> {
    let body = skip_docstring(&func.body, config);
    if window_size == 0 || body.len() < window_size {
        return Vec::new();
    }

    let stmt_hashes: Vec<String> = body.iter().map(|s| stmt_hash(s, config)).collect();

    let mut segments = Vec::new();

    for i in 0..=(stmt_hashes.len() - window_size) {
        let start = line_index.line_index(body[i].range().start());
        let end = line_index.end_line_index(body[i + window_size - 1].range().end());

        let window = &stmt_hashes[i..i + window_size];
        let segment_hash = sha1_hex(&window.join("|"));
        let mut sorted = window.to_vec();
        sorted.sort_unstable();
        let segment_sig = sha1_hex(&sorted.join("|"));

        segments.push(SegmentUnit {
            segment_hash,
            segment_sig,
            filepath: filepath.to_owned(),
            qualname: qualname.to_owned(),
            start_line: start,
            end_line: end,
            size: window_size,
        });

        if segments.len() >= max_segments {
            break;
        }
    }

    segments
}

#[cfg(test)]
mod tests {
    use super::*;
    use ruff_python_ast::Stmt;
    use ruff_python_parser::parse_module;

    fn fixture(source: &str) -> (ast::ModModule, LineIndex) {
        let module = parse_module(source).expect("fixture parses").into_syntax();
        let line_index = LineIndex::new(source);
        (module, line_index)
    }

    fn first_func(module: &ast::ModModule) -> &ast::StmtFunctionDef {
        match &module.body[0] {
            Stmt::FunctionDef(func) => func,
            _ => panic!("fixture must start with a function"),
        }
    }

    #[test]
    fn test_segment_windows_slide_over_body() {
        let (module, index) = fixture("def f():\n    a = 1\n    b = 2\n    c = 3\n");
        let segments = extract_segments(
            first_func(&module),
            &index,
            "x.py",
            "mod:f",
            &NormalizeConfig::default(),
            2,
            10,
        );
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].size, 2);
        assert_eq!(segments[0].start_line, 2);
    }

    #[test]
    fn test_short_function_yields_no_windows() {
        let (module, index) = fixture("def f():\n    a = 1\n");
        let segments = extract_segments(
            first_func(&module),
            &index,
            "x.py",
            "mod:f",
            &NormalizeConfig::default(),
            3,
            10,
        );
        assert!(segments.is_empty());
    }

    #[test]
    fn test_segment_sig_is_order_insensitive() {
        let raw = NormalizeConfig {
            normalize_names: false,
            normalize_attributes: false,
            normalize_constants: false,
            ..NormalizeConfig::default()
        };
        let (module_a, index_a) = fixture("def f():\n    a = 1\n    b = 2\n");
        let (module_b, index_b) = fixture("def f():\n    b = 2\n    a = 1\n");
        let seg_a = extract_segments(first_func(&module_a), &index_a, "x.py", "mod:f", &raw, 2, 10);
        let seg_b = extract_segments(first_func(&module_b), &index_b, "x.py", "mod:f", &raw, 2, 10);
        assert_eq!(seg_a[0].segment_sig, seg_b[0].segment_sig);
        assert_ne!(seg_a[0].segment_hash, seg_b[0].segment_hash);
    }

    #[test]
    fn test_block_windows_respect_min_distance_and_cap() {
        let body: String = (0..12).map(|i| format!("    v{i} = {i}\n")).collect();
        let source = format!("def f():\n{body}");
        let (module, index) = fixture(&source);
        let blocks = extract_blocks(
            first_func(&module),
            &index,
            "x.py",
            "mod:f",
            &NormalizeConfig::default(),
            4,
            2,
        );
        assert_eq!(blocks.len(), 2, "max_blocks caps the output");
        assert!(blocks[1].start_line - blocks[0].start_line >= 3);
    }

    #[test]
    fn test_block_hash_is_rename_invariant() {
        let (module_a, index_a) =
            fixture("def f():\n    a = 1\n    b = 2\n    c = 3\n    d = 4\n");
        let (module_b, index_b) =
            fixture("def g():\n    w = 9\n    x = 8\n    y = 7\n    z = 6\n");
        let config = NormalizeConfig::default();
        let blocks_a = extract_blocks(first_func(&module_a), &index_a, "a.py", "a:f", &config, 4, 5);
        let blocks_b = extract_blocks(first_func(&module_b), &index_b, "b.py", "b:g", &config, 4, 5);
        assert_eq!(blocks_a[0].block_hash, blocks_b[0].block_hash);
    }
}
