mod visits;

use ruff_python_ast::{self as ast, Expr, Stmt};

use super::model::{BlockStmt, Cfg};
use crate::normalize::{skip_docstring, NormalizeConfig};

/// Targets for `continue` and `break` inside the innermost enclosing loop.
#[derive(Debug, Clone, Copy)]
struct LoopContext {
    continue_target: usize,
    break_target: usize,
}

/// Builder for constructing a CFG from a function body.
///
/// The walk is source-order; every `create_block` call hands out the next
/// sequential id, so structurally identical functions produce identical
/// block id assignments.
pub struct CfgBuilder<'a, 'c> {
    cfg: Cfg<'a>,
    current: usize,
    loop_stack: Vec<LoopContext>,
    config: &'c NormalizeConfig,
}

impl<'a, 'c> CfgBuilder<'a, 'c> {
    #[must_use]
    pub fn new(qualname: &str, config: &'c NormalizeConfig) -> Self {
        Self {
            cfg: Cfg::new(qualname),
            current: Cfg::ENTRY,
            loop_stack: Vec::new(),
            config,
        }
    }

    /// Builds the graph for `func` and returns it.
    #[must_use]
    pub fn build(mut self, func: &'a ast::StmtFunctionDef) -> Cfg<'a> {
        self.visit_statements(&func.body);
        if !self.cfg.blocks[self.current].terminated {
            let exit = self.cfg.exit();
            self.cfg.blocks[self.current].add_successor(exit);
        }
        self.cfg
    }

    // ---------- Internals shared with visits ----------

    pub(super) fn visit_statements(&mut self, stmts: &'a [Stmt]) {
        let stmts = skip_docstring(stmts, self.config);
        for stmt in stmts {
            if self.cfg.blocks[self.current].terminated {
                break;
            }
            self.visit_stmt(stmt);
        }
    }

    pub(super) fn push_stmt(&mut self, stmt: &'a Stmt) {
        self.cfg.blocks[self.current]
            .statements
            .push(BlockStmt::Stmt(stmt));
    }

    pub(super) fn push_cond(&mut self, expr: &'a Expr) {
        self.cfg.blocks[self.current]
            .statements
            .push(BlockStmt::Cond(expr));
    }

    pub(super) fn push_cond_to(&mut self, block: usize, expr: &'a Expr) {
        self.cfg.blocks[block].statements.push(BlockStmt::Cond(expr));
    }

    pub(super) fn config(&self) -> &'c NormalizeConfig {
        self.config
    }

    pub(super) fn push_meta(&mut self, block: usize, marker: String) {
        self.cfg.blocks[block].statements.push(BlockStmt::Meta(marker));
    }

    pub(super) fn new_block(&mut self) -> usize {
        self.cfg.create_block()
    }

    pub(super) fn add_edge(&mut self, from: usize, to: usize) {
        self.cfg.blocks[from].add_successor(to);
    }

    pub(super) fn terminate(&mut self, successor: usize) {
        self.cfg.blocks[self.current].terminated = true;
        self.cfg.blocks[self.current].add_successor(successor);
    }

    pub(super) fn is_current_terminated(&self) -> bool {
        self.cfg.blocks[self.current].terminated
    }

    pub(super) fn set_current(&mut self, block: usize) {
        self.current = block;
    }

    pub(super) fn current(&self) -> usize {
        self.current
    }

    pub(super) fn exit_block(&self) -> usize {
        self.cfg.exit()
    }

    pub(super) fn push_loop(&mut self, continue_target: usize, break_target: usize) {
        self.loop_stack.push(LoopContext {
            continue_target,
            break_target,
        });
    }

    pub(super) fn pop_loop(&mut self) {
        self.loop_stack.pop();
    }

    pub(super) fn innermost_loop(&self) -> Option<(usize, usize)> {
        self.loop_stack
            .last()
            .map(|ctx| (ctx.continue_target, ctx.break_target))
    }
}
