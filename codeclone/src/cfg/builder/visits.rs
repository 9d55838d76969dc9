use ruff_python_ast::visitor::{self, Visitor};
use ruff_python_ast::{self as ast, Expr, Stmt};

use super::CfgBuilder;
use crate::normalize::{dump_expr, dump_pattern_raw, skip_docstring, NormalizeConfig};

impl<'a> CfgBuilder<'a, '_> {
    pub(super) fn visit_stmt(&mut self, stmt: &'a Stmt) {
        match stmt {
            Stmt::Return(_) | Stmt::Raise(_) => {
                self.push_stmt(stmt);
                let exit = self.exit_block();
                self.terminate(exit);
            }
            Stmt::Break(_) => self.visit_break(stmt),
            Stmt::Continue(_) => self.visit_continue(stmt),
            Stmt::If(node) => self.visit_if(node),
            Stmt::While(node) => self.visit_while(node),
            // Async for-loops share the node and the structure.
            Stmt::For(node) => self.visit_for(node),
            Stmt::Try(node) => self.visit_try(node),
            Stmt::With(node) => self.visit_with(node),
            Stmt::Match(node) => self.visit_match(node),
            // Everything else, including constructs the builder does not
            // model specially, lands in the current block as an opaque
            // statement; forward progress is always guaranteed.
            _ => self.push_stmt(stmt),
        }
    }

    // ---------- Control flow ----------

    fn visit_if(&mut self, node: &'a ast::StmtIf) {
        self.visit_if_chain(&node.test, &node.body, &node.elif_else_clauses);
    }

    /// `elif` chains are laid out like nested `if` statements in the else
    /// branch: each clause gets its own condition/then/else/merge diamond.
    fn visit_if_chain(
        &mut self,
        test: &'a Expr,
        body: &'a [Stmt],
        clauses: &'a [ast::ElifElseClause],
    ) {
        let then_block = self.new_block();
        let else_block = self.new_block();
        let after_block = self.new_block();

        self.emit_condition(test, then_block, else_block);

        self.set_current(then_block);
        self.visit_statements(body);
        if !self.is_current_terminated() {
            self.add_edge(self.current(), after_block);
        }

        self.set_current(else_block);
        if let Some((clause, rest)) = clauses.split_first() {
            match &clause.test {
                Some(elif_test) => self.visit_if_chain(elif_test, &clause.body, rest),
                None => self.visit_statements(&clause.body),
            }
        }
        if !self.is_current_terminated() {
            self.add_edge(self.current(), after_block);
        }

        self.set_current(after_block);
    }

    fn visit_while(&mut self, node: &'a ast::StmtWhile) {
        let cond_block = self.new_block();
        let body_block = self.new_block();
        let else_block = if node.orelse.is_empty() {
            None
        } else {
            Some(self.new_block())
        };
        let after_block = self.new_block();

        self.add_edge(self.current(), cond_block);
        self.set_current(cond_block);
        let false_target = else_block.unwrap_or(after_block);
        self.emit_condition(&node.test, body_block, false_target);

        self.push_loop(cond_block, after_block);
        self.set_current(body_block);
        self.visit_statements(&node.body);
        if !self.is_current_terminated() {
            self.add_edge(self.current(), cond_block);
        }
        self.pop_loop();

        // Loop-else is reachable only through the condition's false edge,
        // never via break.
        if let Some(else_block) = else_block {
            self.set_current(else_block);
            self.visit_statements(&node.orelse);
            if !self.is_current_terminated() {
                self.add_edge(self.current(), after_block);
            }
        }

        self.set_current(after_block);
    }

    fn visit_for(&mut self, node: &'a ast::StmtFor) {
        let iter_block = self.new_block();
        let body_block = self.new_block();
        let else_block = if node.orelse.is_empty() {
            None
        } else {
            Some(self.new_block())
        };
        let after_block = self.new_block();

        self.add_edge(self.current(), iter_block);
        self.set_current(iter_block);
        self.push_cond(&node.iter);
        self.add_edge(iter_block, body_block);
        self.add_edge(iter_block, else_block.unwrap_or(after_block));

        self.push_loop(iter_block, after_block);
        self.set_current(body_block);
        self.visit_statements(&node.body);
        if !self.is_current_terminated() {
            self.add_edge(self.current(), iter_block);
        }
        self.pop_loop();

        if let Some(else_block) = else_block {
            self.set_current(else_block);
            self.visit_statements(&node.orelse);
            if !self.is_current_terminated() {
                self.add_edge(self.current(), after_block);
            }
        }

        self.set_current(after_block);
    }

    /// WITH is linear flow (enter, body, exit) with the context expressions
    /// recorded in the entering block. No exception-flow edges are
    /// synthesized beyond the may-raise rule of enclosing try bodies.
    fn visit_with(&mut self, node: &'a ast::StmtWith) {
        let body_block = self.new_block();
        let after_block = self.new_block();

        for item in &node.items {
            self.push_cond(&item.context_expr);
        }
        self.add_edge(self.current(), body_block);

        self.set_current(body_block);
        self.visit_statements(&node.body);
        if !self.is_current_terminated() {
            self.add_edge(self.current(), after_block);
        }

        self.set_current(after_block);
    }

    fn visit_try(&mut self, node: &'a ast::StmtTry) {
        let try_entry = self.new_block();
        self.add_edge(self.current(), try_entry);
        self.set_current(try_entry);

        let handler_tests: Vec<usize> = node.handlers.iter().map(|_| self.new_block()).collect();
        let handler_bodies: Vec<usize> = node.handlers.iter().map(|_| self.new_block()).collect();
        let else_block = if node.orelse.is_empty() {
            None
        } else {
            Some(self.new_block())
        };
        let final_block = self.new_block();

        // Ordered handler chain: each test block either enters its body or
        // falls through to the next test; the last test falls through to the
        // finally block (standing in for the enclosing exception context).
        for (idx, handler) in node.handlers.iter().enumerate() {
            let test_block = handler_tests[idx];
            self.push_meta(test_block, format!("TRY_HANDLER_INDEX:{idx}"));
            let ast::ExceptHandler::ExceptHandler(handler) = handler;
            match &handler.type_ {
                Some(type_expr) => {
                    let type_repr = dump_expr(type_expr, &NormalizeConfig::raw());
                    self.push_meta(test_block, format!("TRY_HANDLER_TYPE:{type_repr}"));
                }
                None => self.push_meta(test_block, "TRY_HANDLER_TYPE:BARE".to_owned()),
            }
            self.add_edge(test_block, handler_bodies[idx]);
            if idx + 1 < handler_tests.len() {
                self.add_edge(test_block, handler_tests[idx + 1]);
            } else {
                self.add_edge(test_block, final_block);
            }
        }

        // Only try-body statements that may raise get an edge into the
        // handler chain; a bare name load cannot reach a handler.
        let body = skip_docstring(&node.body, self.config());
        for stmt in body {
            if self.is_current_terminated() {
                break;
            }
            if !handler_tests.is_empty() && stmt_can_raise(stmt) {
                self.add_edge(self.current(), handler_tests[0]);
            }
            self.visit_stmt(stmt);
        }

        if !self.is_current_terminated() {
            self.add_edge(self.current(), else_block.unwrap_or(final_block));
        }

        for (handler, body_block) in node.handlers.iter().zip(&handler_bodies) {
            let ast::ExceptHandler::ExceptHandler(handler) = handler;
            self.set_current(*body_block);
            self.visit_statements(&handler.body);
            if !self.is_current_terminated() {
                self.add_edge(self.current(), final_block);
            }
        }

        if let Some(else_block) = else_block {
            self.set_current(else_block);
            self.visit_statements(&node.orelse);
            if !self.is_current_terminated() {
                self.add_edge(self.current(), final_block);
            }
        }

        // The finally body executes on every exit path; laying it out in the
        // convergence block reproduces that structurally.
        self.set_current(final_block);
        if !node.finalbody.is_empty() {
            self.visit_statements(&node.finalbody);
        }
    }

    fn visit_match(&mut self, node: &'a ast::StmtMatch) {
        self.push_cond(&node.subject);

        let after_block = self.new_block();
        let mut previous_test: Option<usize> = None;

        for (idx, case) in node.cases.iter().enumerate() {
            let test_block = self.new_block();
            let body_block = self.new_block();

            match previous_test {
                None => self.add_edge(self.current(), test_block),
                Some(previous) => self.add_edge(previous, test_block),
            }

            self.push_meta(test_block, format!("MATCH_CASE_INDEX:{idx}"));
            let pattern_repr = dump_pattern_raw(&case.pattern);
            self.push_meta(test_block, format!("MATCH_PATTERN:{pattern_repr}"));
            if let Some(guard) = &case.guard {
                self.push_cond_to(test_block, guard);
            }

            self.add_edge(test_block, body_block);
            self.set_current(body_block);
            self.visit_statements(&case.body);
            if !self.is_current_terminated() {
                self.add_edge(self.current(), after_block);
            }

            previous_test = Some(test_block);
        }

        if let Some(previous) = previous_test {
            self.add_edge(previous, after_block);
        }
        self.set_current(after_block);
    }

    // ---------- Conditions ----------

    fn emit_condition(&mut self, test: &'a Expr, true_block: usize, false_block: usize) {
        if let Expr::BoolOp(bool_op) = test {
            self.emit_boolop(bool_op, true_block, false_block);
            return;
        }
        self.push_cond(test);
        self.add_edge(self.current(), true_block);
        self.add_edge(self.current(), false_block);
    }

    /// Short-circuit expansion: one block per operand. `and` exits to the
    /// false target after each failing operand; `or` exits to the true
    /// target after each succeeding one.
    fn emit_boolop(&mut self, node: &'a ast::ExprBoolOp, true_block: usize, false_block: usize) {
        let values = &node.values;
        let mut current = self.current();

        for (idx, value) in values.iter().enumerate() {
            self.push_cond_to(current, value);
            let is_last = idx == values.len() - 1;

            if is_last {
                self.add_edge(current, true_block);
                self.add_edge(current, false_block);
            } else if matches!(node.op, ast::BoolOp::And) {
                let next_block = self.new_block();
                self.add_edge(current, next_block);
                self.add_edge(current, false_block);
                current = next_block;
            } else {
                let next_block = self.new_block();
                self.add_edge(current, true_block);
                self.add_edge(current, next_block);
                current = next_block;
            }
        }

        self.set_current(current);
    }

    // ---------- Loop jumps ----------

    fn visit_break(&mut self, stmt: &'a Stmt) {
        self.push_stmt(stmt);
        let target = self
            .innermost_loop()
            .map_or_else(|| self.exit_block(), |(_, break_target)| break_target);
        self.terminate(target);
    }

    fn visit_continue(&mut self, stmt: &'a Stmt) {
        self.push_stmt(stmt);
        let target = self
            .innermost_loop()
            .map_or_else(|| self.exit_block(), |(continue_target, _)| continue_target);
        self.terminate(target);
    }
}

/// A statement may raise when it contains a call, an attribute access, a
/// subscript, a suspension point, or an explicit raise.
pub(super) fn stmt_can_raise(stmt: &Stmt) -> bool {
    if matches!(stmt, Stmt::Raise(_)) {
        return true;
    }
    let mut probe = RaiseProbe { found: false };
    probe.visit_stmt(stmt);
    probe.found
}

struct RaiseProbe {
    found: bool,
}

impl<'a> Visitor<'a> for RaiseProbe {
    fn visit_stmt(&mut self, stmt: &'a Stmt) {
        if self.found {
            return;
        }
        if matches!(stmt, Stmt::Raise(_)) {
            self.found = true;
            return;
        }
        visitor::walk_stmt(self, stmt);
    }

    fn visit_expr(&mut self, expr: &'a Expr) {
        if self.found {
            return;
        }
        match expr {
            Expr::Call(_)
            | Expr::Attribute(_)
            | Expr::Subscript(_)
            | Expr::Await(_)
            | Expr::YieldFrom(_) => {
                self.found = true;
            }
            _ => visitor::walk_expr(self, expr),
        }
    }
}
