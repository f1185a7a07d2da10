//! Lowers the authoring AST into IR statements and expressions.
//!
//! The lowering resolves names against the POU's declarations, maps
//! the authored syntax onto the IR, and expands sentinel call sites
//! into synthesized function block instances. Errors are collected per
//! POU and reported together.
use log::debug;

use plx_dsl::common::{EnumeratedValue as IrEnumValue, PouKind, TypeRef, VarDecl, VarRole};
use plx_dsl::core::{FileId, Id, SourceSpan};
use plx_dsl::diagnostic::{Diagnostic, Label};
use plx_dsl::textual::{
    Assignment, BinaryOp, Case, CaseArm, CaseSelector, CompareOp, ExprKind, FbCall, For, If,
    IfBranch, LogicOp, NamedInput, ReturnStmt, StmtKind, UnaryOp, VariablePath, While,
};
use plx_parser::ast::{
    Assign, BinOpKind, BoolOpKind, CompareOpKind, Expr, ExprStmt, ForStmt, IfStmt, MatchArm,
    MatchStmt, Pattern, ReturnStmt as AstReturn, Stmt, Suite, UnaryOpKind, WhileStmt,
};
use plx_parser::parse_logic;
use plx_problems::Problem;

use crate::environment::{StandardFb, TypeEnvironment, STANDARD_FUNCTIONS};
use crate::sentinels::is_sentinel;
use crate::typecheck::{conversion_target, infer, Scope};

/// The result of lowering a logic body: the IR statements plus the
/// variables synthesized during lowering. Sentinel instances land in
/// the static block; loop control variables land in the temp block.
#[derive(Debug, Clone, PartialEq)]
pub struct LoweredBody {
    pub statements: Vec<StmtKind>,
    pub synthesized_statics: Vec<VarDecl>,
    pub synthesized_temps: Vec<VarDecl>,
}

/// Lowers the verbatim source of a logic body into IR.
pub fn lower_logic(
    source: &str,
    file_id: &FileId,
    scope: Scope,
    env: &TypeEnvironment,
    pou_kind: PouKind,
    pou_name: &Id,
    has_parent: bool,
) -> Result<LoweredBody, Vec<Diagnostic>> {
    let suite = parse_logic(source, file_id)?;
    debug!("lowering {} statement(s) of {}", suite.len(), pou_name);

    let mut lowerer = Lowerer::new(scope, env, pou_kind, pou_name.clone(), has_parent);
    let statements = lowerer.lower_suite(&suite);
    lowerer.finish(statements)
}

/// Carries the state of one POU's lowering.
pub struct Lowerer<'a> {
    pub(crate) scope: Scope,
    pub(crate) env: &'a TypeEnvironment<'a>,
    pou_kind: PouKind,
    pou_name: Id,
    has_parent: bool,
    /// Invocations synthesized for sentinel call sites, emitted ahead
    /// of the statement whose expressions produced them.
    pub(crate) pending: Vec<StmtKind>,
    synthesized_statics: Vec<VarDecl>,
    synthesized_temps: Vec<VarDecl>,
    auto_counter: usize,
    pub(crate) diagnostics: Vec<Diagnostic>,
}

impl<'a> Lowerer<'a> {
    pub fn new(
        scope: Scope,
        env: &'a TypeEnvironment<'a>,
        pou_kind: PouKind,
        pou_name: Id,
        has_parent: bool,
    ) -> Self {
        Self {
            scope,
            env,
            pou_kind,
            pou_name,
            has_parent,
            pending: Vec::new(),
            synthesized_statics: Vec::new(),
            synthesized_temps: Vec::new(),
            auto_counter: 0,
            diagnostics: Vec::new(),
        }
    }

    pub fn finish(self, statements: Vec<StmtKind>) -> Result<LoweredBody, Vec<Diagnostic>> {
        if self.diagnostics.is_empty() {
            Ok(LoweredBody {
                statements,
                synthesized_statics: self.synthesized_statics,
                synthesized_temps: self.synthesized_temps,
            })
        } else {
            Err(self.diagnostics)
        }
    }

    /// Drains the lowering results without consuming the lowerer, for
    /// callers that lower several bodies with one instance (charts).
    pub(crate) fn drain_synthesized(&mut self) -> (Vec<VarDecl>, Vec<VarDecl>) {
        (
            std::mem::take(&mut self.synthesized_statics),
            std::mem::take(&mut self.synthesized_temps),
        )
    }

    pub(crate) fn push_pending(&mut self, statement: StmtKind) {
        self.pending.push(statement);
    }

    pub(crate) fn next_auto_index(&mut self) -> usize {
        let index = self.auto_counter;
        self.auto_counter += 1;
        index
    }

    pub(crate) fn declare_synthesized(&mut self, decl: VarDecl) {
        self.scope
            .insert(decl.name.clone(), VarRole::Static, decl.type_ref.clone());
        self.synthesized_statics.push(decl);
    }

    fn error(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn lower_suite(&mut self, suite: &Suite) -> Vec<StmtKind> {
        let mut statements = Vec::new();
        for stmt in suite {
            statements.extend(self.lower_statement(stmt));
        }
        statements
    }

    /// Lowers one statement, prefixed with any invocations its
    /// expressions synthesized.
    fn lower_statement(&mut self, stmt: &Stmt) -> Vec<StmtKind> {
        let lowered = match stmt {
            Stmt::Assign(assign) => self.lower_assign(assign),
            Stmt::If(if_stmt) => self.lower_if(if_stmt),
            Stmt::While(while_stmt) => self.lower_while(while_stmt),
            Stmt::For(for_stmt) => self.lower_for(for_stmt),
            Stmt::Match(match_stmt) => self.lower_match(match_stmt),
            Stmt::Return(return_stmt) => self.lower_return(return_stmt),
            Stmt::Break(_) => Ok(StmtKind::Exit),
            Stmt::Pass(_) => Ok(StmtKind::Empty),
            Stmt::Expr(expr_stmt) => self.lower_expr_statement(expr_stmt),
        };

        let mut result: Vec<StmtKind> = std::mem::take(&mut self.pending);
        match lowered {
            Ok(statement) => result.push(statement),
            Err(diagnostic) => {
                self.error(diagnostic);
                result.push(StmtKind::Empty);
            }
        }
        result
    }

    fn lower_assign(&mut self, assign: &Assign) -> Result<StmtKind, Diagnostic> {
        let target = self.lower_target(&assign.target)?;
        let value = self.lower_expression(&assign.value)?;
        Ok(StmtKind::Assignment(Assignment { target, value }))
    }

    fn lower_if(&mut self, if_stmt: &IfStmt) -> Result<StmtKind, Diagnostic> {
        // Conditions lower first so that their synthesized invocations
        // execute on every scan, whichever branch runs.
        let mut conditions = Vec::new();
        for (condition, _) in &if_stmt.branches {
            conditions.push(self.lower_expression(condition)?);
        }

        let mut branches = Vec::new();
        for (condition, (_, body)) in conditions.into_iter().zip(&if_stmt.branches) {
            branches.push(IfBranch {
                condition,
                body: self.lower_suite(body),
            });
        }

        Ok(StmtKind::If(If {
            branches,
            else_body: self.lower_suite(&if_stmt.orelse),
        }))
    }

    fn lower_while(&mut self, while_stmt: &WhileStmt) -> Result<StmtKind, Diagnostic> {
        let condition = self.lower_expression(&while_stmt.condition)?;
        Ok(StmtKind::While(While {
            condition,
            body: self.lower_suite(&while_stmt.body),
        }))
    }

    fn lower_for(&mut self, for_stmt: &ForStmt) -> Result<StmtKind, Diagnostic> {
        let (args, kwargs) = match &for_stmt.iterable {
            Expr::Call { func, args, kwargs, .. } => match func.as_ref() {
                Expr::Name { id, .. } if id == "range" => (args, kwargs),
                _ => return Err(self.unsupported(&for_stmt.span, "for loops iterate over range() only")),
            },
            _ => return Err(self.unsupported(&for_stmt.span, "for loops iterate over range() only")),
        };
        if !kwargs.is_empty() || args.is_empty() || args.len() > 3 {
            return Err(self.unsupported(&for_stmt.span, "range() takes 1 to 3 positional arguments"));
        }

        // range(hi) counts from zero; range(lo, hi) and
        // range(lo, hi, step) map to inclusive IR bounds, so the upper
        // bound is hi - 1.
        let (from, to, step) = match args.len() {
            1 => (
                ExprKind::const_integer(0),
                self.exclusive_bound(&args[0])?,
                None,
            ),
            2 => (
                self.lower_expression(&args[0])?,
                self.exclusive_bound(&args[1])?,
                None,
            ),
            _ => (
                self.lower_expression(&args[0])?,
                self.exclusive_bound(&args[1])?,
                Some(self.lower_expression(&args[2])?),
            ),
        };

        let control = Id::from(&for_stmt.var);
        if self.scope.lookup(&control).is_none() {
            let decl = VarDecl::new(&for_stmt.var, TypeRef::DINT);
            self.scope
                .insert(control.clone(), VarRole::Temp, TypeRef::DINT);
            self.synthesized_temps.push(decl);
        }

        Ok(StmtKind::For(For {
            control,
            from,
            to,
            step,
            body: self.lower_suite(&for_stmt.body),
        }))
    }

    /// Lowers a range() upper bound, folding `literal - 1` when the
    /// bound is a constant.
    fn exclusive_bound(&mut self, bound: &Expr) -> Result<ExprKind, Diagnostic> {
        if let Expr::Int { value, .. } = bound {
            return Ok(ExprKind::const_integer(value - 1));
        }
        let lowered = self.lower_expression(bound)?;
        Ok(ExprKind::binary(
            BinaryOp::Sub,
            lowered,
            ExprKind::const_integer(1),
        ))
    }

    fn lower_match(&mut self, match_stmt: &MatchStmt) -> Result<StmtKind, Diagnostic> {
        let selector = self.lower_expression(&match_stmt.subject)?;

        let mut arms: Vec<CaseArm> = Vec::new();
        let mut else_body: Vec<StmtKind> = Vec::new();
        let arm_count = match_stmt.arms.len();

        for (position, arm) in match_stmt.arms.iter().enumerate() {
            if arm.patterns.iter().any(|p| matches!(p, Pattern::Wildcard)) {
                if arm.patterns.len() != 1 || position + 1 != arm_count {
                    return Err(self.unsupported(
                        &arm.span,
                        "the wildcard pattern must be the only pattern of the final arm",
                    ));
                }
                else_body = self.lower_suite(&arm.body);
                continue;
            }
            arms.push(self.lower_case_arm(arm)?);
        }

        Case::new(selector, arms, else_body).map(StmtKind::Case)
    }

    fn lower_case_arm(&mut self, arm: &MatchArm) -> Result<CaseArm, Diagnostic> {
        let mut selectors = Vec::new();
        for pattern in &arm.patterns {
            match pattern {
                Pattern::Int(value) => selectors.push(CaseSelector::Value(*value as i64)),
                Pattern::Variant { enum_name, variant } => {
                    let enum_id = Id::from(enum_name);
                    let definition = self.env.enumeration(&enum_id).ok_or_else(|| {
                        Diagnostic::problem(
                            Problem::NameUnresolved,
                            Label::span(arm.span.clone(), "Case pattern"),
                        )
                        .with_context("enumeration", enum_name)
                    })?;
                    let variant_id = Id::from(variant);
                    if definition.value_of(&variant_id).is_none() {
                        return Err(Diagnostic::problem(
                            Problem::NameUnresolved,
                            Label::span(arm.span.clone(), "Case pattern"),
                        )
                        .with_context("enumeration", enum_name)
                        .with_context("variant", variant));
                    }
                    selectors.push(CaseSelector::Enumerated(IrEnumValue::qualified(
                        enum_name, variant,
                    )));
                }
                Pattern::Wildcard => unreachable!("wildcard arms handled by lower_match"),
            }
        }
        Ok(CaseArm {
            selectors,
            body: self.lower_suite(&arm.body),
        })
    }

    fn lower_return(&mut self, return_stmt: &AstReturn) -> Result<StmtKind, Diagnostic> {
        if self.pou_kind != PouKind::Function {
            return Err(Diagnostic::problem(
                Problem::ReturnOutsideFunction,
                Label::span(return_stmt.span.clone(), "Return"),
            ));
        }
        match &return_stmt.value {
            // The function's own name is the result variable; `return
            // expr` assigns it and leaves the body.
            Some(value) => {
                let value = self.lower_expression(value)?;
                self.push_pending(StmtKind::Assignment(Assignment {
                    target: VariablePath::named(self.pou_name.original()),
                    value,
                }));
                Ok(StmtKind::Return(ReturnStmt { value: None }))
            }
            None => Ok(StmtKind::Return(ReturnStmt { value: None })),
        }
    }

    fn lower_expr_statement(&mut self, expr_stmt: &ExprStmt) -> Result<StmtKind, Diagnostic> {
        match &expr_stmt.value {
            Expr::SuperLogic { span } => {
                if !self.has_parent {
                    return Err(Diagnostic::problem(
                        Problem::NameUnresolved,
                        Label::span(span.clone(), "super().logic()"),
                    )
                    .with_context("reason", "the function block has no parent"));
                }
                Ok(StmtKind::SuperCall)
            }
            Expr::Call { func, args, kwargs, span } => {
                self.lower_invocation(func, args, kwargs, span)
            }
            other => Err(self.unsupported(&other.span(), "expression statements have no effect")),
        }
    }

    /// Lowers a statement-position call: an invocation of a function
    /// block instance variable.
    fn lower_invocation(
        &mut self,
        func: &Expr,
        args: &[Expr],
        kwargs: &[(String, Expr)],
        span: &SourceSpan,
    ) -> Result<StmtKind, Diagnostic> {
        let instance = match self.try_lower_path(func) {
            Some(Ok(path)) => path,
            Some(Err(diagnostic)) => return Err(diagnostic),
            None => {
                return Err(self.unsupported(
                    span,
                    "only function block instances may be invoked as statements",
                ))
            }
        };
        if !args.is_empty() {
            return Err(self.unsupported(span, "invocation inputs must be named"));
        }
        let mut inputs = Vec::new();
        for (name, value) in kwargs {
            let value = self.lower_expression(value)?;
            inputs.push(NamedInput {
                name: Id::from(name),
                value,
            });
        }
        Ok(StmtKind::FbCall(FbCall { instance, inputs }))
    }

    fn lower_target(&mut self, target: &Expr) -> Result<VariablePath, Diagnostic> {
        match self.try_lower_path(target) {
            Some(result) => result,
            None => match target {
                Expr::Name { id, span } => Err(self.undeclared(span, id)),
                other => Err(self.unsupported(
                    &other.span(),
                    "assignment targets must be variables",
                )),
            },
        }
    }

    /// Attempts to lower an attribute/subscript chain rooted at `self`
    /// or at a bare declared name into a variable path. Returns `None`
    /// when the expression is not shaped like a path.
    fn try_lower_path(&mut self, expr: &Expr) -> Option<Result<VariablePath, Diagnostic>> {
        match expr {
            Expr::Attribute { value, attr, span } => match value.as_ref() {
                Expr::SelfRef { .. } => {
                    let id = Id::from(attr);
                    if self.scope.lookup(&id).is_none() {
                        return Some(Err(self.undeclared(span, attr)));
                    }
                    Some(Ok(VariablePath::named(attr).with_span(span.clone())))
                }
                _ => {
                    let base = match self.try_lower_path(value)? {
                        Ok(base) => base,
                        Err(diagnostic) => return Some(Err(diagnostic)),
                    };
                    Some(Ok(base.field(attr).with_span(span.clone())))
                }
            },
            Expr::Subscript { value, indices, span } => {
                let base = match self.try_lower_path(value)? {
                    Ok(base) => base,
                    Err(diagnostic) => return Some(Err(diagnostic)),
                };
                let mut subscripts = Vec::new();
                for index in indices {
                    match self.lower_expression(index) {
                        Ok(lowered) => subscripts.push(lowered),
                        Err(diagnostic) => return Some(Err(diagnostic)),
                    }
                }
                Some(Ok(base.index(subscripts).with_span(span.clone())))
            }
            Expr::Name { id, span } => {
                let name = Id::from(id);
                if self.scope.lookup(&name).is_none() {
                    return None;
                }
                Some(Ok(VariablePath::named(id).with_span(span.clone())))
            }
            _ => None,
        }
    }

    pub(crate) fn lower_expression(&mut self, expr: &Expr) -> Result<ExprKind, Diagnostic> {
        match expr {
            Expr::Int { value, .. } => Ok(ExprKind::const_integer(*value)),
            Expr::Float { value, .. } => Ok(ExprKind::Const(
                plx_dsl::common::ConstantKind::real(*value),
            )),
            Expr::Bool { value, .. } => Ok(ExprKind::const_bool(*value)),
            Expr::Str { value, .. } => Ok(ExprKind::Const(
                plx_dsl::common::ConstantKind::character_string(value),
            )),
            Expr::SelfRef { span } => {
                Err(self.unsupported(span, "'self' is not a value"))
            }
            Expr::SuperLogic { span } => Err(self.unsupported(
                span,
                "super().logic() is a statement, not an expression",
            )),
            Expr::Name { id, span } => {
                let name = Id::from(id);
                if self.scope.lookup(&name).is_some() {
                    Ok(ExprKind::Variable(
                        VariablePath::named(id).with_span(span.clone()),
                    ))
                } else {
                    Err(self.undeclared(span, id))
                }
            }
            Expr::Attribute { value, attr, span } => {
                // An attribute on an enumeration name is a variant
                // reference; anything else must be a variable path.
                if let Expr::Name { id, .. } = value.as_ref() {
                    let enum_id = Id::from(id);
                    if let Some(definition) = self.env.enumeration(&enum_id) {
                        let variant = Id::from(attr);
                        if definition.value_of(&variant).is_none() {
                            return Err(Diagnostic::problem(
                                Problem::NameUnresolved,
                                Label::span(span.clone(), "Enumeration variant"),
                            )
                            .with_context("enumeration", id)
                            .with_context("variant", attr));
                        }
                        return Ok(ExprKind::Const(
                            plx_dsl::common::ConstantKind::enumerated(id, attr),
                        ));
                    }
                }
                match self.try_lower_path(expr) {
                    Some(result) => result.map(ExprKind::Variable),
                    None => Err(self.unsupported(span, "unsupported attribute access")),
                }
            }
            Expr::Subscript { span, .. } => match self.try_lower_path(expr) {
                Some(result) => result.map(ExprKind::Variable),
                None => Err(self.unsupported(span, "unsupported subscript access")),
            },
            Expr::Call { func, args, kwargs, span } => {
                self.lower_call(func, args, kwargs, span)
            }
            Expr::UnaryOp { op, operand, span } => {
                let term = self.lower_expression(operand)?;
                let op = match op {
                    UnaryOpKind::Neg => UnaryOp::Neg,
                    UnaryOpKind::Not => UnaryOp::Not,
                    UnaryOpKind::Invert => UnaryOp::BitNot,
                };
                let _ = span;
                Ok(ExprKind::unary(op, term))
            }
            Expr::BinOp { op, left, right, span } => self.lower_binop(*op, left, right, span),
            Expr::Compare { op, left, right, .. } => {
                let left = self.lower_expression(left)?;
                let right = self.lower_expression(right)?;
                let op = match op {
                    CompareOpKind::Eq => CompareOp::Eq,
                    CompareOpKind::Ne => CompareOp::Ne,
                    CompareOpKind::Lt => CompareOp::Lt,
                    CompareOpKind::Gt => CompareOp::Gt,
                    CompareOpKind::Le => CompareOp::LtEq,
                    CompareOpKind::Ge => CompareOp::GtEq,
                };
                Ok(ExprKind::compare(op, left, right))
            }
            Expr::BoolOp { op, left, right, .. } => {
                let left = self.lower_expression(left)?;
                let right = self.lower_expression(right)?;
                let op = match op {
                    BoolOpKind::And => LogicOp::And,
                    BoolOpKind::Or => LogicOp::Or,
                };
                Ok(ExprKind::logic(op, left, right))
            }
            Expr::IfExp { condition, then, orelse, .. } => {
                let condition = self.lower_expression(condition)?;
                let when_true = self.lower_expression(then)?;
                let when_false = self.lower_expression(orelse)?;
                Ok(ExprKind::conditional(condition, when_true, when_false))
            }
        }
    }

    fn lower_binop(
        &mut self,
        op: BinOpKind,
        left: &Expr,
        right: &Expr,
        span: &SourceSpan,
    ) -> Result<ExprKind, Diagnostic> {
        let left_ir = self.lower_expression(left)?;
        let right_ir = self.lower_expression(right)?;

        let op = match op {
            BinOpKind::Add => BinaryOp::Add,
            BinOpKind::Sub => BinaryOp::Sub,
            BinOpKind::Mul => BinaryOp::Mul,
            BinOpKind::Div => BinaryOp::Div,
            BinOpKind::FloorDiv => {
                // Integer division is only defined on integers; floats
                // require explicit conversion.
                for operand in [&left_ir, &right_ir] {
                    if let Ok(found) = infer(operand, &self.scope, self.env) {
                        let is_float = self
                            .env
                            .canonical(&found)
                            .as_elementary()
                            .is_some_and(|k| k.is_float());
                        if is_float {
                            return Err(self.unsupported(
                                span,
                                "integer division on floating point operands",
                            ));
                        }
                    }
                }
                BinaryOp::Div
            }
            BinOpKind::Mod => BinaryOp::Mod,
            BinOpKind::Pow => BinaryOp::Pow,
            BinOpKind::BitAnd => BinaryOp::BitAnd,
            BinOpKind::BitOr => BinaryOp::BitOr,
            BinOpKind::BitXor => BinaryOp::BitXor,
            BinOpKind::Shl => BinaryOp::Shl,
            BinOpKind::Shr => BinaryOp::Shr,
        };
        Ok(ExprKind::binary(op, left_ir, right_ir))
    }

    fn lower_call(
        &mut self,
        func: &Expr,
        args: &[Expr],
        kwargs: &[(String, Expr)],
        span: &SourceSpan,
    ) -> Result<ExprKind, Diagnostic> {
        let name = match func {
            Expr::Name { id, .. } => id.clone(),
            _ => {
                return Err(self.unsupported(
                    span,
                    "only named functions may be called in expressions",
                ))
            }
        };

        if is_sentinel(&name) {
            return self.expand_sentinel(&name, args, kwargs, span);
        }

        if name == "range" {
            return Err(self.unsupported(span, "range() is only valid in a for loop"));
        }

        // The first-scan system flag reads as a nullary helper.
        if name == "first_scan" {
            if !args.is_empty() || !kwargs.is_empty() {
                return Err(self.unsupported(span, "first_scan() takes no arguments"));
            }
            return Ok(ExprKind::Call(plx_dsl::textual::FunctionCall {
                name: Id::from("__FIRST_SCAN"),
                args: vec![],
            }));
        }

        // Host-language spellings of standard functions.
        let mapped = match name.as_str() {
            "abs" => "ABS",
            "min" => "MIN",
            "max" => "MAX",
            other => other,
        };

        let known = STANDARD_FUNCTIONS.contains(mapped)
            || conversion_target(mapped).is_some()
            || self.env.pou(&Id::from(mapped)).is_some();
        if !known {
            return Err(self.undeclared(span, &name));
        }

        let mut call_args = Vec::new();
        for arg in args {
            call_args.push(plx_dsl::textual::CallArg::positional(
                self.lower_expression(arg)?,
            ));
        }
        for (keyword, value) in kwargs {
            let value = self.lower_expression(value)?;
            call_args.push(plx_dsl::textual::CallArg::named(keyword, value));
        }

        Ok(ExprKind::Call(plx_dsl::textual::FunctionCall {
            name: Id::from(mapped),
            args: call_args,
        }))
    }

    fn unsupported(&self, span: &SourceSpan, reason: &str) -> Diagnostic {
        Diagnostic::problem(
            Problem::SyntaxUnsupported,
            Label::span(span.clone(), "Authored construct"),
        )
        .with_context("reason", reason)
    }

    fn undeclared(&self, span: &SourceSpan, name: &str) -> Diagnostic {
        Diagnostic::problem(
            Problem::NameUnresolved,
            Label::span(span.clone(), "Reference"),
        )
        .with_context("name", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plx_dsl::common::{ConstantKind, Interface};

    fn motor_scope() -> Scope {
        let mut interface = Interface::new();
        interface.inputs.push(VarDecl::bool("cmd"));
        interface.outputs.push(VarDecl::bool("running"));
        interface.statics.push(VarDecl::int("count"));
        interface.statics.push(VarDecl::real("level"));
        Scope::from_interface(&interface)
    }

    fn lower(source: &str) -> LoweredBody {
        let env = TypeEnvironment::new();
        lower_logic(
            source,
            &FileId::default(),
            motor_scope(),
            &env,
            PouKind::FunctionBlock,
            &Id::from("Motor"),
            false,
        )
        .expect("source lowers")
    }

    fn lower_err(source: &str) -> Vec<Diagnostic> {
        let env = TypeEnvironment::new();
        lower_logic(
            source,
            &FileId::default(),
            motor_scope(),
            &env,
            PouKind::FunctionBlock,
            &Id::from("Motor"),
            false,
        )
        .expect_err("source is rejected")
    }

    #[test]
    fn lower_when_self_assignment_then_assignment() {
        let body = lower("self.running = self.cmd\n");
        assert_eq!(
            body.statements,
            vec![StmtKind::simple_assignment(
                "running",
                ExprKind::named_variable("cmd"),
            )]
        );
        assert!(body.synthesized_statics.is_empty());
    }

    #[test]
    fn lower_when_undeclared_variable_then_name_unresolved() {
        let errors = lower_err("self.missing = True\n");
        assert!(errors[0].is_problem(Problem::NameUnresolved));
    }

    #[test]
    fn lower_when_delayed_sentinel_then_ton_synthesized() {
        let body = lower("self.running = delayed(self.cmd, seconds=5)\n");

        assert_eq!(body.synthesized_statics, vec![VarDecl::instance("__ton_0", "TON")]);
        assert_eq!(body.statements.len(), 2);

        // The invocation precedes the assignment.
        match &body.statements[0] {
            StmtKind::FbCall(call) => {
                assert_eq!(call.instance, VariablePath::named("__ton_0"));
                assert_eq!(call.inputs.len(), 2);
                assert_eq!(call.inputs[0].name, Id::from("IN"));
                assert_eq!(
                    call.inputs[1].value,
                    ExprKind::Const(ConstantKind::duration(
                        plx_dsl::time::DurationLiteral::seconds(5)
                    ))
                );
            }
            other => panic!("unexpected statement {:?}", other),
        }
        match &body.statements[1] {
            StmtKind::Assignment(assignment) => {
                assert_eq!(
                    assignment.value,
                    ExprKind::Variable(VariablePath::named("__ton_0").field("Q"))
                );
            }
            other => panic!("unexpected statement {:?}", other),
        }
    }

    #[test]
    fn lower_when_same_source_twice_then_identical_ir() {
        let source = "self.running = delayed(self.cmd, seconds=5) or rising(self.cmd)\nif rising(self.running):\n    self.count = self.count + 1\n";
        let first = lower(source);
        let second = lower(source);
        assert_eq!(first, second);
        assert_eq!(
            second.synthesized_statics,
            vec![
                VarDecl::instance("__ton_0", "TON"),
                VarDecl::instance("__r_trig_1", "R_TRIG"),
                VarDecl::instance("__r_trig_2", "R_TRIG"),
            ]
        );
    }

    #[test]
    fn lower_when_sentinel_in_condition_then_invocation_before_if() {
        let body = lower("if delayed(self.cmd, ms=500):\n    self.running = True\n");
        assert!(matches!(body.statements[0], StmtKind::FbCall(_)));
        assert!(matches!(body.statements[1], StmtKind::If(_)));
    }

    #[test]
    fn lower_when_counter_sentinel_then_preset_required() {
        let errors = lower_err("self.running = count_up(self.cmd)\n");
        assert!(errors[0].is_problem(Problem::SyntaxUnsupported));
    }

    #[test]
    fn lower_when_counter_sentinel_then_ctu_with_reset() {
        let body =
            lower("self.running = count_up(self.cmd, reset=self.running, preset=3)\n");
        assert_eq!(body.synthesized_statics, vec![VarDecl::instance("__ctu_0", "CTU")]);
        match &body.statements[0] {
            StmtKind::FbCall(call) => {
                let names: Vec<_> = call.inputs.iter().map(|i| i.name.original()).collect();
                assert_eq!(names, vec!["CU", "PV", "R"]);
            }
            other => panic!("unexpected statement {:?}", other),
        }
    }

    #[test]
    fn lower_when_range_loop_then_inclusive_bounds() {
        let body = lower("for i in range(0, 10):\n    self.count = self.count + i\n");
        match &body.statements[0] {
            StmtKind::For(for_stmt) => {
                assert_eq!(for_stmt.from, ExprKind::const_integer(0));
                assert_eq!(for_stmt.to, ExprKind::const_integer(9));
                assert!(for_stmt.step.is_none());
            }
            other => panic!("unexpected statement {:?}", other),
        }
        // The loop variable is synthesized as a temp.
        assert_eq!(body.synthesized_temps, vec![VarDecl::new("i", TypeRef::DINT)]);
    }

    #[test]
    fn lower_when_iterating_non_range_then_rejected() {
        let errors = lower_err("for i in self.count:\n    pass\n");
        assert!(errors[0].is_problem(Problem::SyntaxUnsupported));
    }

    #[test]
    fn lower_when_floor_division_on_floats_then_rejected() {
        let errors = lower_err("self.level = self.level // 2\n");
        assert!(errors[0].is_problem(Problem::SyntaxUnsupported));
    }

    #[test]
    fn lower_when_floor_division_on_ints_then_division() {
        let body = lower("self.count = self.count // 2\n");
        match &body.statements[0] {
            StmtKind::Assignment(assignment) => match &assignment.value {
                ExprKind::Binary(binary) => assert_eq!(binary.op, BinaryOp::Div),
                other => panic!("unexpected value {:?}", other),
            },
            other => panic!("unexpected statement {:?}", other),
        }
    }

    #[test]
    fn lower_when_return_in_function_block_then_rejected() {
        let errors = lower_err("return\n");
        assert!(errors[0].is_problem(Problem::ReturnOutsideFunction));
    }

    #[test]
    fn lower_when_super_without_parent_then_rejected() {
        let errors = lower_err("super().logic()\n");
        assert!(errors[0].is_problem(Problem::NameUnresolved));
    }

    #[test]
    fn lower_when_match_then_case_with_else() {
        let env = TypeEnvironment::new();
        let source = "match self.count:\n    case 0:\n        self.running = False\n    case 1 | 2:\n        self.running = True\n    case _:\n        self.running = False\n";
        let body = lower_logic(
            source,
            &FileId::default(),
            motor_scope(),
            &env,
            PouKind::FunctionBlock,
            &Id::from("Motor"),
            false,
        )
        .unwrap();

        match &body.statements[0] {
            StmtKind::Case(case) => {
                assert_eq!(case.arms.len(), 2);
                assert_eq!(case.arms[1].selectors.len(), 2);
                assert_eq!(case.else_body.len(), 1);
            }
            other => panic!("unexpected statement {:?}", other),
        }
    }

    #[test]
    fn lower_when_match_overlapping_then_case_overlap() {
        let errors = lower_err(
            "match self.count:\n    case 1:\n        pass\n    case 1:\n        pass\n",
        );
        assert!(errors[0].is_problem(Problem::CaseOverlap));
    }

    #[test]
    fn lower_when_break_in_loop_then_exit() {
        let body = lower(
            "while self.cmd:\n    self.count = self.count + 1\n    if self.count > 10:\n        break\n",
        );
        match &body.statements[0] {
            StmtKind::While(while_stmt) => match &while_stmt.body[1] {
                StmtKind::If(if_stmt) => {
                    assert_eq!(if_stmt.branches[0].body, vec![StmtKind::Exit]);
                }
                other => panic!("unexpected statement {:?}", other),
            },
            other => panic!("unexpected statement {:?}", other),
        }
    }

    #[test]
    fn lower_when_first_scan_then_system_flag_call() {
        let body = lower("if first_scan():\n    self.count = 0\n");
        match &body.statements[0] {
            StmtKind::If(if_stmt) => match &if_stmt.branches[0].condition {
                ExprKind::Call(call) => assert_eq!(call.name, Id::from("__FIRST_SCAN")),
                other => panic!("unexpected condition {:?}", other),
            },
            other => panic!("unexpected statement {:?}", other),
        }
    }

    #[test]
    fn lower_when_abs_then_standard_function() {
        let body = lower("self.count = abs(self.count)\n");
        match &body.statements[0] {
            StmtKind::Assignment(assignment) => match &assignment.value {
                ExprKind::Call(call) => assert_eq!(call.name, Id::from("ABS")),
                other => panic!("unexpected value {:?}", other),
            },
            other => panic!("unexpected statement {:?}", other),
        }
    }

    #[test]
    fn lower_when_multiple_errors_then_all_reported() {
        let errors = lower_err("self.missing = True\nself.also_missing = False\n");
        assert_eq!(errors.len(), 2);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Lowering the same source twice yields structurally
            /// identical IR with identical synthesized names.
            #[test]
            fn lowering_is_deterministic(seconds in 1i64..3600i64, step in 1i64..50i64) {
                let source = format!(
                    "self.running = delayed(self.cmd, seconds={})\nif rising(self.running):\n    self.count = self.count + {}\n",
                    seconds, step,
                );
                let first = lower(&source);
                let second = lower(&source);
                prop_assert_eq!(first, second);
            }

            /// Sentinel instance names follow source order regardless
            /// of the helper mix.
            #[test]
            fn sentinel_names_follow_source_order(ms in 1i64..10_000i64) {
                let source = format!(
                    "self.running = rising(self.cmd) or delayed(self.cmd, ms={})\n",
                    ms,
                );
                let body = lower(&source);
                let names: Vec<String> = body
                    .synthesized_statics
                    .iter()
                    .map(|d| d.name.original().to_owned())
                    .collect();
                prop_assert_eq!(names, vec!["__r_trig_0".to_owned(), "__ton_1".to_owned()]);
            }
        }
    }
}
