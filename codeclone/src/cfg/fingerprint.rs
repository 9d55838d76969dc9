//! Canonical CFG printing and the stable fingerprint derived from it.

use ruff_python_ast as ast;

use super::builder::CfgBuilder;
use super::model::{BlockStmt, Cfg};
use crate::constants::LOC_BUCKET_WIDTH;
use crate::hashing::sha1_hex;
use crate::normalize::{dump_expr, dump_stmt, NormalizeConfig, CFG_META_PREFIX};

/// Coarse LOC classification paired with the fingerprint to form the
/// function group key, preventing identical shapes at very different sizes
/// from grouping.
#[must_use]
pub fn bucket_loc(loc: usize) -> String {
    format!("b{}", loc / LOC_BUCKET_WIDTH)
}

/// Serializes a CFG to its canonical string: blocks in id order, each with
/// its normalized statement dumps and sorted successor ids.
#[must_use]
pub fn canonical_cfg_dump(cfg: &Cfg<'_>, config: &NormalizeConfig) -> String {
    let mut parts: Vec<String> = Vec::with_capacity(cfg.blocks.len());
    for block in &cfg.blocks {
        let statements: Vec<String> = block
            .statements
            .iter()
            .map(|stmt| dump_block_stmt(stmt, config))
            .collect();
        let mut successors: Vec<usize> = block.successors.clone();
        successors.sort_unstable();
        let successor_ids = successors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");
        parts.push(format!(
            "BLOCK[{}]:{}|SUCCESSORS:{}",
            block.id,
            statements.join(";"),
            successor_ids
        ));
    }
    parts.join("|")
}

fn dump_block_stmt(stmt: &BlockStmt<'_>, config: &NormalizeConfig) -> String {
    match stmt {
        BlockStmt::Stmt(stmt) => dump_stmt(stmt, config),
        BlockStmt::Cond(expr) => format!("Expr(value={})", dump_expr(expr, config)),
        BlockStmt::Meta(marker) => {
            format!("Expr(value=Name(id='{CFG_META_PREFIX}{marker}'))")
        }
    }
}

/// Structural fingerprint of a function: build the CFG, print it
/// canonically, hash with SHA-1. Functions with identical control flow and
/// normalized statements produce the same 40-char hex fingerprint even when
/// they differ in names, constants, or annotations.
#[must_use]
pub fn cfg_fingerprint(
    qualname: &str,
    func: &ast::StmtFunctionDef,
    config: &NormalizeConfig,
) -> String {
    let cfg = CfgBuilder::new(qualname, config).build(func);
    sha1_hex(&canonical_cfg_dump(&cfg, config))
}
