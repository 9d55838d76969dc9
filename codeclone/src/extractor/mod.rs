//! Per-file unit extraction: qualified names, thresholds, fingerprints, and
//! the block/segment windows derived from each function body.

mod windows;

pub use windows::{extract_blocks, extract_segments, BlockUnit, SegmentUnit};

use ruff_python_ast::{self as ast, Stmt};
use ruff_python_parser::parse_module;
use ruff_text_size::Ranged;
use std::time::Instant;

use crate::cfg::{bucket_loc, cfg_fingerprint};
use crate::constants::{
    BLOCK_MIN_LOC, BLOCK_MIN_STMT, BLOCK_SIZE, MAX_BLOCKS_PER_FUNCTION,
    MAX_SEGMENTS_PER_FUNCTION, PARSE_TIME_BUDGET, SEGMENT_MIN_LOC, SEGMENT_MIN_STMT,
    SEGMENT_WINDOW_SIZE,
};
use crate::errors::ParseFailure;
use crate::normalize::NormalizeConfig;
use crate::utils::LineIndex;

/// A function or method that passed the extraction thresholds. Units with
/// equal `(fingerprint, loc_bucket)` canonicalize to byte-identical CFGs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unit {
    pub qualname: String,
    pub filepath: String,
    pub start_line: usize,
    pub end_line: usize,
    pub loc: usize,
    pub stmt_count: usize,
    pub fingerprint: String,
    pub loc_bucket: String,
}

/// Everything extracted from one source file.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub units: Vec<Unit>,
    pub blocks: Vec<BlockUnit>,
    pub segments: Vec<SegmentUnit>,
}

/// Collects `(local_name, node)` pairs for every function and method.
/// Class nesting contributes dotted prefixes; function bodies are not
/// descended into, so closures do not surface as separate units.
struct QualnameCollector<'a> {
    stack: Vec<String>,
    units: Vec<(String, &'a ast::StmtFunctionDef)>,
}

impl<'a> QualnameCollector<'a> {
    fn new() -> Self {
        Self {
            stack: Vec::new(),
            units: Vec::new(),
        }
    }

    fn walk_body(&mut self, body: &'a [Stmt]) {
        for stmt in body {
            match stmt {
                Stmt::FunctionDef(func) => {
                    let name = if self.stack.is_empty() {
                        func.name.to_string()
                    } else {
                        format!("{}.{}", self.stack.join("."), func.name)
                    };
                    self.units.push((name, func));
                }
                Stmt::ClassDef(class) => {
                    self.stack.push(class.name.to_string());
                    self.walk_body(&class.body);
                    self.stack.pop();
                }
                Stmt::If(node) => {
                    self.walk_body(&node.body);
                    for clause in &node.elif_else_clauses {
                        self.walk_body(&clause.body);
                    }
                }
                Stmt::For(node) => {
                    self.walk_body(&node.body);
                    self.walk_body(&node.orelse);
                }
                Stmt::While(node) => {
                    self.walk_body(&node.body);
                    self.walk_body(&node.orelse);
                }
                Stmt::With(node) => self.walk_body(&node.body),
                Stmt::Try(node) => {
                    self.walk_body(&node.body);
                    for handler in &node.handlers {
                        let ast::ExceptHandler::ExceptHandler(handler) = handler;
                        self.walk_body(&handler.body);
                    }
                    self.walk_body(&node.orelse);
                    self.walk_body(&node.finalbody);
                }
                Stmt::Match(node) => {
                    for case in &node.cases {
                        self.walk_body(&case.body);
                    }
                }
                _ => {}
            }
        }
    }
}

/// Parses `source` and extracts units, block windows, and segment windows.
///
/// # Errors
///
/// Returns a [`ParseFailure`] when the parser rejects the source or the
/// parse runs past the per-file time budget.
pub fn extract_units_from_source(
    source: &str,
    filepath: &str,
    module_name: &str,
    config: &NormalizeConfig,
    min_loc: usize,
    min_stmt: usize,
) -> Result<Extraction, ParseFailure> {
    let started = Instant::now();
    let parsed = parse_module(source).map_err(|e| ParseFailure::Syntax(e.to_string()))?;
    if started.elapsed() > PARSE_TIME_BUDGET {
        return Err(ParseFailure::Timeout);
    }
    let module = parsed.into_syntax();
    let line_index = LineIndex::new(source);

    let mut collector = QualnameCollector::new();
    collector.walk_body(&module.body);

    let mut extraction = Extraction::default();

    for (local_name, func) in &collector.units {
        let start_line = line_index.line_index(func.range().start());
        let end_line = line_index.end_line_index(func.range().end());
        if end_line < start_line {
            continue;
        }

        let loc = end_line - start_line + 1;
        let stmt_count = func.body.len();
        if loc < min_loc || stmt_count < min_stmt {
            continue;
        }

        let qualname = format!("{module_name}:{local_name}");
        let fingerprint = cfg_fingerprint(&qualname, func, config);

        extraction.units.push(Unit {
            qualname: qualname.clone(),
            filepath: filepath.to_owned(),
            start_line,
            end_line,
            loc,
            stmt_count,
            fingerprint,
            loc_bucket: bucket_loc(loc),
        });

        // Constructors are wall-to-wall attribute assignments in most
        // codebases; their windows would drown the block channel.
        let is_constructor = local_name.ends_with("__init__");
        if !is_constructor && loc >= BLOCK_MIN_LOC && stmt_count >= BLOCK_MIN_STMT {
            extraction.blocks.extend(extract_blocks(
                func,
                &line_index,
                filepath,
                &qualname,
                config,
                BLOCK_SIZE,
                MAX_BLOCKS_PER_FUNCTION,
            ));
        }

        if loc >= SEGMENT_MIN_LOC && stmt_count >= SEGMENT_MIN_STMT {
            extraction.segments.extend(extract_segments(
                func,
                &line_index,
                filepath,
                &qualname,
                config,
                SEGMENT_WINDOW_SIZE,
                MAX_SEGMENTS_PER_FUNCTION,
            ));
        }
    }

    Ok(extraction)
}
