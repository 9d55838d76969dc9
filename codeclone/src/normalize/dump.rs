//! The canonical dump walker. One method per syntactic shape; rewrite rules
//! are applied at the point where the affected node is printed.

use ruff_python_ast::{self as ast, Expr, Pattern, Stmt};

use super::{skip_docstring, NormalizeConfig, CFG_META_PREFIX};

const VAR_SENTINEL: &str = "_VAR_";
const ATTR_SENTINEL: &str = "_ATTR_";
const CONST_SENTINEL: &str = "_CONST_";

pub(super) struct Dumper<'c> {
    config: &'c NormalizeConfig,
    out: String,
}

impl<'c> Dumper<'c> {
    pub(super) fn new(config: &'c NormalizeConfig) -> Self {
        Self {
            config,
            out: String::new(),
        }
    }

    pub(super) fn finish(self) -> String {
        self.out
    }

    fn push(&mut self, text: &str) {
        self.out.push_str(text);
    }

    /// Dump of a sub-expression into a fresh buffer, used where operand
    /// ordering depends on the printed form.
    fn sub_expr(&self, expr: &Expr) -> String {
        let mut dumper = Dumper::new(self.config);
        dumper.expr(expr);
        dumper.finish()
    }

    fn body(&mut self, body: &[Stmt]) {
        let body = skip_docstring(body, self.config);
        self.push("[");
        for (i, stmt) in body.iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            self.stmt(stmt);
        }
        self.push("]");
    }

    fn expr_list(&mut self, exprs: &[Expr]) {
        self.push("[");
        for (i, expr) in exprs.iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            self.expr(expr);
        }
        self.push("]");
    }

    fn opt_expr(&mut self, expr: Option<&Expr>) {
        match expr {
            Some(expr) => self.expr(expr),
            None => self.push("None"),
        }
    }

    // ---------- Statements ----------

    #[allow(clippy::too_many_lines)]
    pub(super) fn stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::FunctionDef(node) => self.function_def(node),
            Stmt::ClassDef(node) => self.class_def(node),
            Stmt::Return(node) => {
                self.push("Return(value=");
                self.opt_expr(node.value.as_deref());
                self.push(")");
            }
            Stmt::Delete(node) => {
                self.push("Delete(targets=");
                self.expr_list(&node.targets);
                self.push(")");
            }
            Stmt::Assign(node) => {
                self.push("Assign(targets=");
                self.expr_list(&node.targets);
                self.push(", value=");
                self.expr(&node.value);
                self.push(")");
            }
            Stmt::AugAssign(node) => self.aug_assign(node),
            Stmt::AnnAssign(node) => self.ann_assign(node),
            Stmt::TypeAlias(node) => {
                self.push("TypeAlias(name=");
                self.expr(&node.name);
                self.push(", value=");
                self.expr(&node.value);
                self.push(")");
            }
            Stmt::For(node) => {
                self.push(if node.is_async { "AsyncFor(" } else { "For(" });
                self.push("target=");
                self.expr(&node.target);
                self.push(", iter=");
                self.expr(&node.iter);
                self.push(", body=");
                self.body(&node.body);
                if !node.orelse.is_empty() {
                    self.push(", orelse=");
                    self.body(&node.orelse);
                }
                self.push(")");
            }
            Stmt::While(node) => {
                self.push("While(test=");
                self.expr(&node.test);
                self.push(", body=");
                self.body(&node.body);
                if !node.orelse.is_empty() {
                    self.push(", orelse=");
                    self.body(&node.orelse);
                }
                self.push(")");
            }
            Stmt::If(node) => self.if_stmt(node),
            Stmt::With(node) => {
                self.push(if node.is_async { "AsyncWith(" } else { "With(" });
                self.push("items=[");
                for (i, item) in node.items.iter().enumerate() {
                    if i > 0 {
                        self.push(", ");
                    }
                    self.push("withitem(context_expr=");
                    self.expr(&item.context_expr);
                    if let Some(optional_vars) = &item.optional_vars {
                        self.push(", optional_vars=");
                        self.expr(optional_vars);
                    }
                    self.push(")");
                }
                self.push("], body=");
                self.body(&node.body);
                self.push(")");
            }
            Stmt::Match(node) => self.match_stmt(node),
            Stmt::Raise(node) => {
                self.push("Raise(");
                self.push("exc=");
                self.opt_expr(node.exc.as_deref());
                if let Some(cause) = &node.cause {
                    self.push(", cause=");
                    self.expr(cause);
                }
                self.push(")");
            }
            Stmt::Try(node) => self.try_stmt(node),
            Stmt::Assert(node) => {
                self.push("Assert(test=");
                self.expr(&node.test);
                if let Some(msg) = &node.msg {
                    self.push(", msg=");
                    self.expr(msg);
                }
                self.push(")");
            }
            Stmt::Import(node) => {
                self.push("Import(names=[");
                for (i, alias) in node.names.iter().enumerate() {
                    if i > 0 {
                        self.push(", ");
                    }
                    self.alias(alias);
                }
                self.push("])");
            }
            Stmt::ImportFrom(node) => {
                self.push("ImportFrom(module=");
                match &node.module {
                    Some(module) => {
                        self.push(&format!("'{}'", module.as_str()));
                    }
                    None => self.push("None"),
                }
                self.push(", names=[");
                for (i, alias) in node.names.iter().enumerate() {
                    if i > 0 {
                        self.push(", ");
                    }
                    self.alias(alias);
                }
                self.push(&format!("], level={})", node.level));
            }
            Stmt::Global(node) => {
                self.push("Global(names=[");
                for (i, name) in node.names.iter().enumerate() {
                    if i > 0 {
                        self.push(", ");
                    }
                    self.push(&format!("'{}'", name.as_str()));
                }
                self.push("])");
            }
            Stmt::Nonlocal(node) => {
                self.push("Nonlocal(names=[");
                for (i, name) in node.names.iter().enumerate() {
                    if i > 0 {
                        self.push(", ");
                    }
                    self.push(&format!("'{}'", name.as_str()));
                }
                self.push("])");
            }
            Stmt::Expr(node) => {
                self.push("Expr(value=");
                self.expr(&node.value);
                self.push(")");
            }
            Stmt::Pass(_) => self.push("Pass()"),
            Stmt::Break(_) => self.push("Break()"),
            Stmt::Continue(_) => self.push("Continue()"),
            Stmt::IpyEscapeCommand(_) => self.push("IpyEscape()"),
        }
    }

    fn function_def(&mut self, node: &ast::StmtFunctionDef) {
        self.push(if node.is_async {
            "AsyncFunctionDef(name='"
        } else {
            "FunctionDef(name='"
        });
        self.push(node.name.as_str());
        self.push("', params=");
        self.parameters(&node.parameters);
        self.push(", body=");
        self.body(&node.body);
        if !node.decorator_list.is_empty() {
            self.push(", decorators=[");
            for (i, decorator) in node.decorator_list.iter().enumerate() {
                if i > 0 {
                    self.push(", ");
                }
                self.expr(&decorator.expression);
            }
            self.push("]");
        }
        if !self.config.ignore_annotations {
            if let Some(returns) = &node.returns {
                self.push(", returns=");
                self.expr(returns);
            }
        }
        self.push(")");
    }

    fn class_def(&mut self, node: &ast::StmtClassDef) {
        self.push("ClassDef(name='");
        self.push(node.name.as_str());
        self.push("'");
        if let Some(arguments) = &node.arguments {
            self.push(", bases=");
            self.expr_list(&arguments.args);
            if !arguments.keywords.is_empty() {
                self.push(", keywords=[");
                for (i, keyword) in arguments.keywords.iter().enumerate() {
                    if i > 0 {
                        self.push(", ");
                    }
                    self.keyword(keyword);
                }
                self.push("]");
            }
        }
        self.push(", body=");
        self.body(&node.body);
        if !node.decorator_list.is_empty() {
            self.push(", decorators=[");
            for (i, decorator) in node.decorator_list.iter().enumerate() {
                if i > 0 {
                    self.push(", ");
                }
                self.expr(&decorator.expression);
            }
            self.push("]");
        }
        self.push(")");
    }

    /// `x op= y` prints as `x = x op y` so the two spellings collapse.
    fn aug_assign(&mut self, node: &ast::StmtAugAssign) {
        let target = self.sub_expr(&node.target);
        let value = self.sub_expr(&node.value);
        let (left, right) = self.ordered_operands(
            node.op,
            &node.target,
            &node.value,
            target.clone(),
            value,
        );
        self.push("Assign(targets=[");
        self.push(&target);
        self.push("], value=BinOp(left=");
        self.push(&left);
        self.push(&format!(", op={}(), right=", operator_name(node.op)));
        self.push(&right);
        self.push("))");
    }

    /// With annotation erasure, `x: T = v` prints as a plain assignment and
    /// a bare declaration keeps only its target.
    fn ann_assign(&mut self, node: &ast::StmtAnnAssign) {
        if self.config.ignore_annotations {
            if let Some(value) = &node.value {
                self.push("Assign(targets=[");
                self.expr(&node.target);
                self.push("], value=");
                self.expr(value);
                self.push(")");
            } else {
                self.push("AnnAssign(target=");
                self.expr(&node.target);
                self.push(")");
            }
        } else {
            self.push("AnnAssign(target=");
            self.expr(&node.target);
            self.push(", annotation=");
            self.expr(&node.annotation);
            self.push(", value=");
            self.opt_expr(node.value.as_deref());
            self.push(")");
        }
    }

    fn if_stmt(&mut self, node: &ast::StmtIf) {
        self.push("If(test=");
        self.expr(&node.test);
        self.push(", body=");
        self.body(&node.body);
        for clause in &node.elif_else_clauses {
            match &clause.test {
                Some(test) => {
                    self.push(", Elif(test=");
                    self.expr(test);
                    self.push(", body=");
                    self.body(&clause.body);
                    self.push(")");
                }
                None => {
                    self.push(", Else(body=");
                    self.body(&clause.body);
                    self.push(")");
                }
            }
        }
        self.push(")");
    }

    fn match_stmt(&mut self, node: &ast::StmtMatch) {
        self.push("Match(subject=");
        self.expr(&node.subject);
        self.push(", cases=[");
        for (i, case) in node.cases.iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            self.push("match_case(pattern=");
            self.pattern(&case.pattern);
            if let Some(guard) = &case.guard {
                self.push(", guard=");
                self.expr(guard);
            }
            self.push(", body=");
            self.body(&case.body);
            self.push(")");
        }
        self.push("])");
    }

    fn try_stmt(&mut self, node: &ast::StmtTry) {
        self.push(if node.is_star { "TryStar(body=" } else { "Try(body=" });
        self.body(&node.body);
        self.push(", handlers=[");
        for (i, handler) in node.handlers.iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            let ast::ExceptHandler::ExceptHandler(handler) = handler;
            self.push("ExceptHandler(type=");
            self.opt_expr(handler.type_.as_deref());
            if let Some(name) = &handler.name {
                self.push(&format!(", name='{}'", name.as_str()));
            }
            self.push(", body=");
            self.body(&handler.body);
            self.push(")");
        }
        self.push("]");
        if !node.orelse.is_empty() {
            self.push(", orelse=");
            self.body(&node.orelse);
        }
        if !node.finalbody.is_empty() {
            self.push(", finalbody=");
            self.body(&node.finalbody);
        }
        self.push(")");
    }

    fn alias(&mut self, alias: &ast::Alias) {
        self.push(&format!("alias(name='{}'", alias.name.as_str()));
        if let Some(asname) = &alias.asname {
            self.push(&format!(", asname='{}'", asname.as_str()));
        }
        self.push(")");
    }

    fn keyword(&mut self, keyword: &ast::Keyword) {
        self.push("keyword(arg=");
        match &keyword.arg {
            Some(arg) => self.push(&format!("'{}'", arg.as_str())),
            None => self.push("None"),
        }
        self.push(", value=");
        self.expr(&keyword.value);
        self.push(")");
    }

    fn parameters(&mut self, parameters: &ast::Parameters) {
        self.push("arguments(");
        let mut first = true;
        let mut section = |dumper: &mut Self, label: &str| {
            if !first {
                dumper.push(", ");
            }
            first = false;
            dumper.push(label);
        };
        if !parameters.posonlyargs.is_empty() {
            section(self, "posonly=[");
            for (i, parameter) in parameters.posonlyargs.iter().enumerate() {
                if i > 0 {
                    self.push(", ");
                }
                self.parameter_with_default(parameter);
            }
            self.push("]");
        }
        section(self, "args=[");
        for (i, parameter) in parameters.args.iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            self.parameter_with_default(parameter);
        }
        self.push("]");
        if let Some(vararg) = &parameters.vararg {
            section(self, "vararg=");
            self.parameter(vararg);
        }
        if !parameters.kwonlyargs.is_empty() {
            section(self, "kwonly=[");
            for (i, parameter) in parameters.kwonlyargs.iter().enumerate() {
                if i > 0 {
                    self.push(", ");
                }
                self.parameter_with_default(parameter);
            }
            self.push("]");
        }
        if let Some(kwarg) = &parameters.kwarg {
            section(self, "kwarg=");
            self.parameter(kwarg);
        }
        self.push(")");
    }

    fn parameter_with_default(&mut self, parameter: &ast::ParameterWithDefault) {
        self.push(&format!("arg('{}'", parameter.parameter.name.as_str()));
        if !self.config.ignore_annotations {
            if let Some(annotation) = &parameter.parameter.annotation {
                self.push(", annotation=");
                self.expr(annotation);
            }
        }
        if let Some(default) = &parameter.default {
            self.push(", default=");
            self.expr(default);
        }
        self.push(")");
    }

    fn parameter(&mut self, parameter: &ast::Parameter) {
        self.push(&format!("arg('{}'", parameter.name.as_str()));
        if !self.config.ignore_annotations {
            if let Some(annotation) = &parameter.annotation {
                self.push(", annotation=");
                self.expr(annotation);
            }
        }
        self.push(")");
    }

    // ---------- Expressions ----------

    #[allow(clippy::too_many_lines)]
    pub(super) fn expr(&mut self, expr: &Expr) {
        match expr {
            Expr::BoolOp(node) => {
                self.push(&format!("BoolOp(op={}(), values=", bool_op_name(node.op)));
                self.expr_list(&node.values);
                self.push(")");
            }
            Expr::Named(node) => {
                self.push("Named(target=");
                self.expr(&node.target);
                self.push(", value=");
                self.expr(&node.value);
                self.push(")");
            }
            Expr::BinOp(node) => self.bin_op(node),
            Expr::UnaryOp(node) => self.unary_op(node),
            Expr::Lambda(node) => {
                self.push("Lambda(params=");
                match &node.parameters {
                    Some(parameters) => self.parameters(parameters),
                    None => self.push("arguments()"),
                }
                self.push(", body=");
                self.expr(&node.body);
                self.push(")");
            }
            Expr::If(node) => {
                self.push("IfExp(test=");
                self.expr(&node.test);
                self.push(", body=");
                self.expr(&node.body);
                self.push(", orelse=");
                self.expr(&node.orelse);
                self.push(")");
            }
            Expr::Dict(node) => {
                self.push("Dict(keys=[");
                for (i, item) in node.items.iter().enumerate() {
                    if i > 0 {
                        self.push(", ");
                    }
                    self.opt_expr(item.key.as_ref());
                }
                self.push("], values=[");
                for (i, item) in node.items.iter().enumerate() {
                    if i > 0 {
                        self.push(", ");
                    }
                    self.expr(&item.value);
                }
                self.push("])");
            }
            Expr::Set(node) => {
                self.push("Set(elts=");
                self.expr_list(&node.elts);
                self.push(")");
            }
            Expr::ListComp(node) => {
                self.push("ListComp(elt=");
                self.expr(&node.elt);
                self.push(", generators=");
                self.generators(&node.generators);
                self.push(")");
            }
            Expr::SetComp(node) => {
                self.push("SetComp(elt=");
                self.expr(&node.elt);
                self.push(", generators=");
                self.generators(&node.generators);
                self.push(")");
            }
            Expr::DictComp(node) => {
                self.push("DictComp(key=");
                self.expr(&node.key);
                self.push(", value=");
                self.expr(&node.value);
                self.push(", generators=");
                self.generators(&node.generators);
                self.push(")");
            }
            Expr::Generator(node) => {
                self.push("GeneratorExp(elt=");
                self.expr(&node.elt);
                self.push(", generators=");
                self.generators(&node.generators);
                self.push(")");
            }
            Expr::Await(node) => {
                self.push("Await(value=");
                self.expr(&node.value);
                self.push(")");
            }
            Expr::Yield(node) => {
                self.push("Yield(value=");
                self.opt_expr(node.value.as_deref());
                self.push(")");
            }
            Expr::YieldFrom(node) => {
                self.push("YieldFrom(value=");
                self.expr(&node.value);
                self.push(")");
            }
            Expr::Compare(node) => {
                self.compare(node.left.as_ref(), &node.ops, &node.comparators);
            }
            Expr::Call(node) => self.call(node),
            Expr::FString(node) => self.fstring(node),
            Expr::StringLiteral(node) => {
                if self.config.normalize_constants {
                    self.constant_sentinel();
                } else {
                    self.push(&format!("Constant(value={:?})", node.value.to_string()));
                }
            }
            Expr::BytesLiteral(node) => {
                if self.config.normalize_constants {
                    self.constant_sentinel();
                } else {
                    self.push(&format!("Constant(value={:?})", node.value));
                }
            }
            Expr::NumberLiteral(node) => {
                if self.config.normalize_constants {
                    self.constant_sentinel();
                } else {
                    self.push(&format!("Constant(value={:?})", node.value));
                }
            }
            Expr::BooleanLiteral(node) => {
                if self.config.normalize_constants {
                    self.constant_sentinel();
                } else {
                    self.push(if node.value {
                        "Constant(value=True)"
                    } else {
                        "Constant(value=False)"
                    });
                }
            }
            Expr::NoneLiteral(_) => {
                if self.config.normalize_constants {
                    self.constant_sentinel();
                } else {
                    self.push("Constant(value=None)");
                }
            }
            Expr::EllipsisLiteral(_) => {
                if self.config.normalize_constants {
                    self.constant_sentinel();
                } else {
                    self.push("Constant(value=Ellipsis)");
                }
            }
            Expr::Attribute(node) => self.attribute(node),
            Expr::Subscript(node) => {
                self.push("Subscript(value=");
                self.expr(&node.value);
                self.push(", slice=");
                self.expr(&node.slice);
                self.push(")");
            }
            Expr::Starred(node) => {
                self.push("Starred(value=");
                self.expr(&node.value);
                self.push(")");
            }
            Expr::Name(node) => self.name(node.id.as_str()),
            Expr::List(node) => {
                self.push("List(elts=");
                self.expr_list(&node.elts);
                self.push(")");
            }
            Expr::Tuple(node) => {
                self.push("Tuple(elts=");
                self.expr_list(&node.elts);
                self.push(")");
            }
            Expr::Slice(node) => {
                self.push("Slice(lower=");
                self.opt_expr(node.lower.as_deref());
                self.push(", upper=");
                self.opt_expr(node.upper.as_deref());
                self.push(", step=");
                self.opt_expr(node.step.as_deref());
                self.push(")");
            }
            Expr::TString(_) => self.push("TString()"),
            Expr::IpyEscapeCommand(_) => self.push("IpyEscape()"),
        }
    }

    fn constant_sentinel(&mut self) {
        self.push(&format!("Constant(value='{CONST_SENTINEL}')"));
    }

    fn name(&mut self, id: &str) {
        // Synthetic markers bypass erasure; their prefix cannot occur in
        // parsed identifiers.
        if id.starts_with(CFG_META_PREFIX) || !self.config.normalize_names {
            self.push(&format!("Name(id='{id}')"));
        } else {
            self.push(&format!("Name(id='{VAR_SENTINEL}')"));
        }
    }

    fn attribute(&mut self, node: &ast::ExprAttribute) {
        self.push("Attribute(value=");
        self.expr(&node.value);
        if self.config.normalize_attributes {
            self.push(&format!(", attr='{ATTR_SENTINEL}')"));
        } else {
            self.push(&format!(", attr='{}')", node.attr.as_str()));
        }
    }

    /// The callee's tail identifier survives erasure so that calls to
    /// different targets do not collapse into the same shape.
    fn call(&mut self, node: &ast::ExprCall) {
        self.push("Call(func=");
        match node.func.as_ref() {
            Expr::Name(name) if self.config.normalize_names => {
                self.push(&format!("Name(id='_CALL_{}_')", name.id.as_str()));
            }
            Expr::Attribute(attribute)
                if self.config.normalize_attributes && is_dotted_name(&node.func) =>
            {
                self.push("Attribute(value=");
                self.expr(&attribute.value);
                self.push(&format!(", attr='_CALL_{}_')", attribute.attr.as_str()));
            }
            other => self.expr(other),
        }
        self.push(", args=");
        self.expr_list(&node.arguments.args);
        if !node.arguments.keywords.is_empty() {
            self.push(", keywords=[");
            for (i, keyword) in node.arguments.keywords.iter().enumerate() {
                if i > 0 {
                    self.push(", ");
                }
                self.keyword(keyword);
            }
            self.push("]");
        }
        self.push(")");
    }

    fn bin_op(&mut self, node: &ast::ExprBinOp) {
        let left = self.sub_expr(&node.left);
        let right = self.sub_expr(&node.right);
        let (left, right) = self.ordered_operands(node.op, &node.left, &node.right, left, right);
        self.push("BinOp(left=");
        self.push(&left);
        self.push(&format!(", op={}(), right=", operator_name(node.op)));
        self.push(&right);
        self.push(")");
    }

    /// Commutative canonicalization: operands of a whitelisted operator are
    /// ordered lexicographically by their printed form, but only when both
    /// are syntactically side-effect-free.
    fn ordered_operands(
        &self,
        op: ast::Operator,
        left_expr: &Expr,
        right_expr: &Expr,
        left: String,
        right: String,
    ) -> (String, String) {
        if is_commutative(op)
            && is_side_effect_free(left_expr)
            && is_side_effect_free(right_expr)
            && left > right
        {
            (right, left)
        } else {
            (left, right)
        }
    }

    fn unary_op(&mut self, node: &ast::ExprUnaryOp) {
        if matches!(node.op, ast::UnaryOp::Not) {
            if let Expr::Compare(compare) = node.operand.as_ref() {
                if compare.ops.len() == 1 && compare.comparators.len() == 1 {
                    // `not (x in y)` and `not (x is y)` fold into the
                    // negated comparison operators.
                    let folded = match compare.ops[0] {
                        ast::CmpOp::In => Some(ast::CmpOp::NotIn),
                        ast::CmpOp::Is => Some(ast::CmpOp::IsNot),
                        _ => None,
                    };
                    if let Some(op) = folded {
                        self.compare(compare.left.as_ref(), &[op], &compare.comparators);
                        return;
                    }
                }
            }
        }
        self.push(&format!("UnaryOp(op={}(), operand=", unary_op_name(node.op)));
        self.expr(&node.operand);
        self.push(")");
    }

    fn compare(&mut self, left: &Expr, ops: &[ast::CmpOp], comparators: &[Expr]) {
        self.push("Compare(left=");
        self.expr(left);
        self.push(", ops=[");
        for (i, op) in ops.iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            self.push(&format!("{}()", cmp_op_name(*op)));
        }
        self.push("], comparators=");
        self.expr_list(comparators);
        self.push(")");
    }

    fn generators(&mut self, generators: &[ast::Comprehension]) {
        self.push("[");
        for (i, generator) in generators.iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            self.push("comprehension(target=");
            self.expr(&generator.target);
            self.push(", iter=");
            self.expr(&generator.iter);
            self.push(", ifs=");
            self.expr_list(&generator.ifs);
            self.push(&format!(", is_async={})", u8::from(generator.is_async)));
        }
        self.push("]");
    }

    fn fstring(&mut self, node: &ast::ExprFString) {
        self.push("FString(parts=[");
        let mut first = true;
        let mut sep = |dumper: &mut Self| {
            if !first {
                dumper.push(", ");
            }
            first = false;
        };
        for part in &node.value {
            match part {
                ast::FStringPart::Literal(literal) => {
                    sep(self);
                    if self.config.normalize_constants {
                        self.constant_sentinel();
                    } else {
                        self.push(&format!("Constant(value={:?})", &*literal.value));
                    }
                }
                ast::FStringPart::FString(fstring) => {
                    for element in &fstring.elements {
                        match element {
                            ast::InterpolatedStringElement::Literal(_) => {
                                sep(self);
                                if self.config.normalize_constants {
                                    self.constant_sentinel();
                                } else {
                                    self.push("Constant(value=<literal>)");
                                }
                            }
                            ast::InterpolatedStringElement::Interpolation(interpolation) => {
                                sep(self);
                                self.push("Formatted(value=");
                                self.expr(&interpolation.expression);
                                self.push(")");
                            }
                        }
                    }
                }
            }
        }
        self.push("])");
    }

    // ---------- Patterns ----------

    pub(super) fn pattern(&mut self, pattern: &Pattern) {
        match pattern {
            Pattern::MatchValue(node) => {
                self.push("MatchValue(value=");
                self.expr(&node.value);
                self.push(")");
            }
            Pattern::MatchSingleton(node) => {
                self.push(&format!("MatchSingleton(value={:?})", node.value));
            }
            Pattern::MatchSequence(node) => {
                self.push("MatchSequence(patterns=[");
                for (i, sub) in node.patterns.iter().enumerate() {
                    if i > 0 {
                        self.push(", ");
                    }
                    self.pattern(sub);
                }
                self.push("])");
            }
            Pattern::MatchMapping(node) => {
                self.push("MatchMapping(keys=");
                self.expr_list(&node.keys);
                self.push(", patterns=[");
                for (i, sub) in node.patterns.iter().enumerate() {
                    if i > 0 {
                        self.push(", ");
                    }
                    self.pattern(sub);
                }
                self.push("]");
                if let Some(rest) = &node.rest {
                    self.push(&format!(", rest='{}'", rest.as_str()));
                }
                self.push(")");
            }
            Pattern::MatchClass(node) => {
                self.push("MatchClass(cls=");
                self.expr(&node.cls);
                self.push(", patterns=[");
                for (i, sub) in node.arguments.patterns.iter().enumerate() {
                    if i > 0 {
                        self.push(", ");
                    }
                    self.pattern(sub);
                }
                self.push("], kwd=[");
                for (i, keyword) in node.arguments.keywords.iter().enumerate() {
                    if i > 0 {
                        self.push(", ");
                    }
                    self.push(&format!("('{}', ", keyword.attr.as_str()));
                    self.pattern(&keyword.pattern);
                    self.push(")");
                }
                self.push("])");
            }
            Pattern::MatchStar(node) => match &node.name {
                Some(name) => self.push(&format!("MatchStar(name='{}')", name.as_str())),
                None => self.push("MatchStar()"),
            },
            Pattern::MatchAs(node) => {
                self.push("MatchAs(");
                if let Some(sub) = &node.pattern {
                    self.push("pattern=");
                    self.pattern(sub);
                }
                if let Some(name) = &node.name {
                    if node.pattern.is_some() {
                        self.push(", ");
                    }
                    self.push(&format!("name='{}'", name.as_str()));
                }
                self.push(")");
            }
            Pattern::MatchOr(node) => {
                self.push("MatchOr(patterns=[");
                for (i, sub) in node.patterns.iter().enumerate() {
                    if i > 0 {
                        self.push(", ");
                    }
                    self.pattern(sub);
                }
                self.push("])");
            }
        }
    }
}

/// Operand reordering is allowed only for operators where evaluation order
/// cannot be observed through side effects.
const fn is_commutative(op: ast::Operator) -> bool {
    matches!(
        op,
        ast::Operator::Add
            | ast::Operator::Mult
            | ast::Operator::BitOr
            | ast::Operator::BitAnd
            | ast::Operator::BitXor
    )
}

/// Literals, bare names, and attribute chains over them. Calls, subscripts,
/// and anything that can run user code inhibit reordering.
fn is_side_effect_free(expr: &Expr) -> bool {
    match expr {
        Expr::Name(_)
        | Expr::StringLiteral(_)
        | Expr::BytesLiteral(_)
        | Expr::NumberLiteral(_)
        | Expr::BooleanLiteral(_)
        | Expr::NoneLiteral(_)
        | Expr::EllipsisLiteral(_) => true,
        Expr::Attribute(node) => is_side_effect_free(&node.value),
        _ => false,
    }
}

/// A bare name or a dotted chain of attribute accesses over one.
fn is_dotted_name(expr: &Expr) -> bool {
    match expr {
        Expr::Name(_) => true,
        Expr::Attribute(node) => is_dotted_name(&node.value),
        _ => false,
    }
}

const fn operator_name(op: ast::Operator) -> &'static str {
    match op {
        ast::Operator::Add => "Add",
        ast::Operator::Sub => "Sub",
        ast::Operator::Mult => "Mult",
        ast::Operator::MatMult => "MatMult",
        ast::Operator::Div => "Div",
        ast::Operator::Mod => "Mod",
        ast::Operator::Pow => "Pow",
        ast::Operator::LShift => "LShift",
        ast::Operator::RShift => "RShift",
        ast::Operator::BitOr => "BitOr",
        ast::Operator::BitXor => "BitXor",
        ast::Operator::BitAnd => "BitAnd",
        ast::Operator::FloorDiv => "FloorDiv",
    }
}

const fn bool_op_name(op: ast::BoolOp) -> &'static str {
    match op {
        ast::BoolOp::And => "And",
        ast::BoolOp::Or => "Or",
    }
}

const fn unary_op_name(op: ast::UnaryOp) -> &'static str {
    match op {
        ast::UnaryOp::Invert => "Invert",
        ast::UnaryOp::Not => "Not",
        ast::UnaryOp::UAdd => "UAdd",
        ast::UnaryOp::USub => "USub",
    }
}

const fn cmp_op_name(op: ast::CmpOp) -> &'static str {
    match op {
        ast::CmpOp::Eq => "Eq",
        ast::CmpOp::NotEq => "NotEq",
        ast::CmpOp::Lt => "Lt",
        ast::CmpOp::LtE => "LtE",
        ast::CmpOp::Gt => "Gt",
        ast::CmpOp::GtE => "GtE",
        ast::CmpOp::Is => "Is",
        ast::CmpOp::IsNot => "IsNot",
        ast::CmpOp::In => "In",
        ast::CmpOp::NotIn => "NotIn",
    }
}
