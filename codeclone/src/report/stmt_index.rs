//! Line-range statement lookup over re-parsed member files, shared by the
//! segment suppression pass and the block explainability facts.

use ruff_python_ast::{self as ast, Expr, Stmt};
use ruff_python_parser::parse_module;
use ruff_text_size::Ranged;
use rustc_hash::FxHashMap;

use crate::utils::LineIndex;

/// One statement with its line range and the classifications the report
/// layer cares about.
#[derive(Debug, Clone)]
pub(super) struct StmtInfo {
    pub kind: &'static str,
    pub start_line: usize,
    pub end_line: usize,
    pub is_control_flow: bool,
    pub is_assert_like: bool,
}

/// Flat statement index for one file.
#[derive(Debug, Default)]
pub(super) struct StmtIndex {
    entries: Vec<StmtInfo>,
}

impl StmtIndex {
    /// Statements fully contained in `[start_line, end_line]`.
    pub(super) fn stmts_in_range(
        &self,
        start_line: usize,
        end_line: usize,
    ) -> impl Iterator<Item = &StmtInfo> {
        self.entries
            .iter()
            .filter(move |info| info.start_line >= start_line && info.end_line <= end_line)
    }
}

/// Parses and indexes files on demand; a file that cannot be read or parsed
/// indexes to `None` and contributes nothing.
#[derive(Debug, Default)]
pub struct StmtIndexCache {
    files: FxHashMap<String, Option<StmtIndex>>,
}

impl StmtIndexCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(super) fn index_for(&mut self, filepath: &str) -> Option<&StmtIndex> {
        self.files
            .entry(filepath.to_owned())
            .or_insert_with(|| build_index(filepath))
            .as_ref()
    }
}

fn build_index(filepath: &str) -> Option<StmtIndex> {
    let source = std::fs::read_to_string(filepath).ok()?;
    let module = parse_module(&source).ok()?.into_syntax();
    let line_index = LineIndex::new(&source);
    let mut index = StmtIndex::default();
    collect_stmts(&module.body, &line_index, &mut index.entries);
    Some(index)
}

fn collect_stmts(body: &[Stmt], line_index: &LineIndex, out: &mut Vec<StmtInfo>) {
    for stmt in body {
        out.push(StmtInfo {
            kind: stmt_kind(stmt),
            start_line: line_index.line_index(stmt.range().start()),
            end_line: line_index.end_line_index(stmt.range().end()),
            is_control_flow: is_control_flow(stmt),
            is_assert_like: is_assert_like(stmt),
        });
        match stmt {
            Stmt::FunctionDef(node) => collect_stmts(&node.body, line_index, out),
            Stmt::ClassDef(node) => collect_stmts(&node.body, line_index, out),
            Stmt::If(node) => {
                collect_stmts(&node.body, line_index, out);
                for clause in &node.elif_else_clauses {
                    collect_stmts(&clause.body, line_index, out);
                }
            }
            Stmt::For(node) => {
                collect_stmts(&node.body, line_index, out);
                collect_stmts(&node.orelse, line_index, out);
            }
            Stmt::While(node) => {
                collect_stmts(&node.body, line_index, out);
                collect_stmts(&node.orelse, line_index, out);
            }
            Stmt::With(node) => collect_stmts(&node.body, line_index, out),
            Stmt::Try(node) => {
                collect_stmts(&node.body, line_index, out);
                for handler in &node.handlers {
                    let ast::ExceptHandler::ExceptHandler(handler) = handler;
                    collect_stmts(&handler.body, line_index, out);
                }
                collect_stmts(&node.orelse, line_index, out);
                collect_stmts(&node.finalbody, line_index, out);
            }
            Stmt::Match(node) => {
                for case in &node.cases {
                    collect_stmts(&case.body, line_index, out);
                }
            }
            _ => {}
        }
    }
}

const fn stmt_kind(stmt: &Stmt) -> &'static str {
    match stmt {
        Stmt::FunctionDef(_) => "FunctionDef",
        Stmt::ClassDef(_) => "ClassDef",
        Stmt::Return(_) => "Return",
        Stmt::Delete(_) => "Delete",
        Stmt::Assign(_) => "Assign",
        Stmt::AugAssign(_) => "AugAssign",
        Stmt::AnnAssign(_) => "AnnAssign",
        Stmt::TypeAlias(_) => "TypeAlias",
        Stmt::For(_) => "For",
        Stmt::While(_) => "While",
        Stmt::If(_) => "If",
        Stmt::With(_) => "With",
        Stmt::Match(_) => "Match",
        Stmt::Raise(_) => "Raise",
        Stmt::Try(_) => "Try",
        Stmt::Assert(_) => "Assert",
        Stmt::Import(_) => "Import",
        Stmt::ImportFrom(_) => "ImportFrom",
        Stmt::Global(_) => "Global",
        Stmt::Nonlocal(_) => "Nonlocal",
        Stmt::Expr(_) => "Expr",
        Stmt::Pass(_) => "Pass",
        Stmt::Break(_) => "Break",
        Stmt::Continue(_) => "Continue",
        Stmt::IpyEscapeCommand(_) => "IpyEscape",
    }
}

const fn is_control_flow(stmt: &Stmt) -> bool {
    matches!(
        stmt,
        Stmt::If(_)
            | Stmt::For(_)
            | Stmt::While(_)
            | Stmt::Try(_)
            | Stmt::With(_)
            | Stmt::Match(_)
            | Stmt::Return(_)
            | Stmt::Raise(_)
            | Stmt::Break(_)
            | Stmt::Continue(_)
    )
}

/// Assert statements, bare string expression statements, and calls whose
/// target name starts with "assert" (unittest-style helpers).
fn is_assert_like(stmt: &Stmt) -> bool {
    match stmt {
        Stmt::Assert(_) => true,
        Stmt::Expr(expr_stmt) => match expr_stmt.value.as_ref() {
            Expr::StringLiteral(_) => true,
            Expr::Call(call) => match call.func.as_ref() {
                Expr::Name(name) => name.id.as_str().to_lowercase().starts_with("assert"),
                Expr::Attribute(attribute) => {
                    attribute.attr.as_str().to_lowercase().starts_with("assert")
                }
                _ => false,
            },
            _ => false,
        },
        _ => false,
    }
}
