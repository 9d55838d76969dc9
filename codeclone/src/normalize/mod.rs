//! Canonical structural normalization.
//!
//! Surface noise (identifiers, constants, attribute names, annotations,
//! docstrings) is erased while structure and call targets are preserved.
//! Because ruff's AST is not built for in-place transformation, the rewrite
//! rules are applied while printing the tree to its canonical textual form;
//! two code shapes are structurally equivalent exactly when their canonical
//! dumps are byte-identical.

mod dump;
#[cfg(test)]
mod tests;

use ruff_python_ast::{Expr, Pattern, Stmt};

use crate::hashing::sha1_hex;

/// Synthetic CFG markers are namespaced with this prefix. It contains `:`
/// characters, so no identifier parsed from source can collide with it, and
/// the normalizer leaves names carrying it untouched.
pub const CFG_META_PREFIX: &str = "__CC_META__::";

/// Which erasure rules are active. The default enables all of them; tests
/// switch individual rules off to probe specific behaviors.
#[derive(Debug, Clone, Copy)]
pub struct NormalizeConfig {
    pub ignore_docstrings: bool,
    pub ignore_annotations: bool,
    pub normalize_names: bool,
    pub normalize_attributes: bool,
    pub normalize_constants: bool,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            ignore_docstrings: true,
            ignore_annotations: true,
            normalize_names: true,
            normalize_attributes: true,
            normalize_constants: true,
        }
    }
}

impl NormalizeConfig {
    /// A configuration with every rewrite disabled, used for raw structural
    /// dumps (handler type markers, match patterns).
    #[must_use]
    pub fn raw() -> Self {
        Self {
            ignore_docstrings: false,
            ignore_annotations: false,
            normalize_names: false,
            normalize_attributes: false,
            normalize_constants: false,
        }
    }
}

/// Canonical dump of a single statement, nested bodies included.
#[must_use]
pub fn dump_stmt(stmt: &Stmt, config: &NormalizeConfig) -> String {
    let mut dumper = dump::Dumper::new(config);
    dumper.stmt(stmt);
    dumper.finish()
}

/// Canonical dump of an expression.
#[must_use]
pub fn dump_expr(expr: &Expr, config: &NormalizeConfig) -> String {
    let mut dumper = dump::Dumper::new(config);
    dumper.expr(expr);
    dumper.finish()
}

/// Raw (unnormalized) dump of a match pattern, used for case-test markers.
#[must_use]
pub fn dump_pattern_raw(pattern: &Pattern) -> String {
    let raw = NormalizeConfig::raw();
    let mut dumper = dump::Dumper::new(&raw);
    dumper.pattern(pattern);
    dumper.finish()
}

/// Stable hash of one normalized statement.
#[must_use]
pub fn stmt_hash(stmt: &Stmt, config: &NormalizeConfig) -> String {
    sha1_hex(&dump_stmt(stmt, config))
}

/// Strips the leading docstring of a statement list when docstring removal
/// is active. Applied to every body walked by the CFG builder and the
/// window extractors.
#[must_use]
pub fn skip_docstring<'a>(body: &'a [Stmt], config: &NormalizeConfig) -> &'a [Stmt] {
    if config.ignore_docstrings && is_docstring(body.first()) {
        &body[1..]
    } else {
        body
    }
}

fn is_docstring(stmt: Option<&Stmt>) -> bool {
    match stmt {
        Some(Stmt::Expr(expr_stmt)) => {
            matches!(expr_stmt.value.as_ref(), Expr::StringLiteral(_))
        }
        _ => false,
    }
}
