//! Expression and statement type checking.
//!
//! Every IR expression has a result type computed against a scope (the
//! enclosing POU's interface) and the project type environment.
//! Assignments require assignable-from compatibility and Boolean
//! contexts never implicitly consume a non-Boolean value.
use std::collections::HashMap;

use plx_dsl::common::{
    ConstantKind, ElementaryKind, Interface, PouKind, TypeDefinitionKind, TypeRef, VarRole,
};
use plx_dsl::core::{Id, Located, SourceSpan};
use plx_dsl::diagnostic::{Diagnostic, Label};
use plx_dsl::textual::*;
use plx_problems::Problem;

use crate::environment::{assignable, writable, Resolved, TypeEnvironment, STANDARD_FUNCTIONS};

/// The type of a constant, when it is known without the environment.
/// Enumerated constants resolve through the environment instead.
pub fn constant_type(constant: &ConstantKind) -> Option<TypeRef> {
    match constant {
        ConstantKind::Bool(_) => Some(TypeRef::BOOL),
        ConstantKind::Integer(literal) => Some(TypeRef::Elementary(
            literal.type_hint.unwrap_or(ElementaryKind::DINT),
        )),
        ConstantKind::Real(literal) => Some(TypeRef::Elementary(
            literal.type_hint.unwrap_or(ElementaryKind::REAL),
        )),
        ConstantKind::BitString(literal) => Some(TypeRef::Elementary(
            literal.type_hint.unwrap_or(ElementaryKind::DWORD),
        )),
        ConstantKind::CharacterString(literal) => Some(if literal.wide {
            TypeRef::wide_string(None)
        } else {
            TypeRef::string(None)
        }),
        ConstantKind::Duration(_) => Some(TypeRef::TIME),
        ConstantKind::Date(_) => Some(TypeRef::Elementary(ElementaryKind::DATE)),
        ConstantKind::TimeOfDay(_) => Some(TypeRef::Elementary(ElementaryKind::TOD)),
        ConstantKind::DateAndTime(_) => Some(TypeRef::Elementary(ElementaryKind::DT)),
        ConstantKind::Enumerated(_) => None,
    }
}

/// Variables visible to a statement list.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    vars: HashMap<Id, (VarRole, TypeRef)>,
}

impl Scope {
    pub fn from_interface(interface: &Interface) -> Self {
        let mut vars = HashMap::new();
        for (role, decl) in interface.iter() {
            vars.insert(decl.name.clone(), (role, decl.type_ref.clone()));
        }
        Self { vars }
    }

    /// A scope for a function body: the function's own name is the
    /// implicit, writable result variable.
    pub fn for_function(interface: &Interface, name: &Id, return_type: &TypeRef) -> Self {
        let mut scope = Scope::from_interface(interface);
        scope
            .vars
            .insert(name.clone(), (VarRole::Output, return_type.clone()));
        scope
    }

    pub fn insert(&mut self, name: Id, role: VarRole, type_ref: TypeRef) {
        self.vars.insert(name, (role, type_ref));
    }

    pub fn lookup(&self, name: &Id) -> Option<&(VarRole, TypeRef)> {
        self.vars.get(name)
    }

    pub fn contains(&self, name: &Id) -> bool {
        self.vars.contains_key(name)
    }
}

fn mismatch(span: SourceSpan, expected: &str, found: &TypeRef) -> Diagnostic {
    Diagnostic::problem(Problem::TypeMismatch, Label::span(span, "Expression"))
        .with_context("expected", expected)
        .with_context("found", &found.to_string())
}

fn unresolved(span: SourceSpan, what: &str, name: &str) -> Diagnostic {
    Diagnostic::problem(Problem::NameUnresolved, Label::span(span, what)).with_context("name", name)
}

/// True when the expression is an integer constant, which adapts to
/// any numeric context it fits.
fn is_integer_literal(expr: &ExprKind) -> bool {
    matches!(expr, ExprKind::Const(ConstantKind::Integer(_)))
}

/// Computes the common type of two operands, allowing integer
/// literals to adapt to the other operand's numeric type.
fn unify(
    left: &TypeRef,
    right: &TypeRef,
    left_expr: &ExprKind,
    right_expr: &ExprKind,
) -> Option<TypeRef> {
    if left == right {
        return Some(left.clone());
    }
    if assignable(left, right) {
        return Some(right.clone());
    }
    if assignable(right, left) {
        return Some(left.clone());
    }
    let left_kind = left.as_elementary();
    let right_kind = right.as_elementary();
    match (left_kind, right_kind) {
        (Some(l), Some(r)) => {
            if is_integer_literal(left_expr) && l.is_integer() && r.is_numeric() {
                return Some(right.clone());
            }
            if is_integer_literal(right_expr) && r.is_integer() && l.is_numeric() {
                return Some(left.clone());
            }
            None
        }
        _ => None,
    }
}

/// Tests value-to-variable compatibility, allowing integer literals
/// to bind to any numeric target.
pub fn value_assignable(value_type: &TypeRef, value: &ExprKind, target: &TypeRef) -> bool {
    if assignable(value_type, target) {
        return true;
    }
    if let (Some(value_kind), Some(target_kind)) =
        (value_type.as_elementary(), target.as_elementary())
    {
        return is_integer_literal(value) && value_kind.is_integer() && target_kind.is_numeric();
    }
    false
}

/// Infers the result type of an expression.
pub fn infer(expr: &ExprKind, scope: &Scope, env: &TypeEnvironment) -> Result<TypeRef, Diagnostic> {
    match expr {
        ExprKind::Const(constant) => match constant {
            ConstantKind::Enumerated(value) => {
                let type_name = value.type_name.as_ref().ok_or_else(|| {
                    unresolved(value.span(), "Enumeration value", &value.variant.to_string())
                })?;
                let definition = env.enumeration(&type_name.name).ok_or_else(|| {
                    unresolved(type_name.span(), "Enumeration", &type_name.to_string())
                })?;
                definition.value_of(&value.variant).ok_or_else(|| {
                    unresolved(value.span(), "Enumeration variant", &value.variant.to_string())
                })?;
                Ok(TypeRef::Named(type_name.clone()))
            }
            other => constant_type(other).ok_or_else(|| {
                Diagnostic::problem(
                    Problem::InternalInvariant,
                    Label::span(SourceSpan::default(), "Constant without a type"),
                )
            }),
        },
        ExprKind::Variable(path) => infer_path(path, scope, env),
        ExprKind::Unary(unary) => {
            let term = infer(&unary.term, scope, env)?;
            let canonical = env.canonical(&term);
            match unary.op {
                UnaryOp::Not => {
                    if canonical.is_boolean() {
                        Ok(TypeRef::BOOL)
                    } else {
                        Err(mismatch(SourceSpan::default(), "BOOL", &term))
                    }
                }
                UnaryOp::Neg => match canonical.as_elementary() {
                    Some(kind) if kind.is_numeric() || kind.is_duration() => Ok(term),
                    _ => Err(mismatch(SourceSpan::default(), "numeric", &term)),
                },
                UnaryOp::BitNot => match canonical.as_elementary() {
                    Some(kind) if kind.is_integer() || kind.is_bit_string() => Ok(term),
                    _ => Err(mismatch(SourceSpan::default(), "integer", &term)),
                },
            }
        }
        ExprKind::Binary(binary) => infer_binary(binary, scope, env),
        ExprKind::Compare(compare) => {
            let left = infer(&compare.left, scope, env)?;
            let right = infer(&compare.right, scope, env)?;
            unify(
                &env.canonical(&left),
                &env.canonical(&right),
                &compare.left,
                &compare.right,
            )
            .ok_or_else(|| mismatch(SourceSpan::default(), &left.to_string(), &right))?;
            Ok(TypeRef::BOOL)
        }
        ExprKind::Logic(logic) => {
            for operand in [&logic.left, &logic.right] {
                let operand_type = infer(operand, scope, env)?;
                if !env.canonical(&operand_type).is_boolean() {
                    return Err(mismatch(SourceSpan::default(), "BOOL", &operand_type));
                }
            }
            Ok(TypeRef::BOOL)
        }
        ExprKind::Conditional(conditional) => {
            let condition = infer(&conditional.condition, scope, env)?;
            if !env.canonical(&condition).is_boolean() {
                return Err(mismatch(SourceSpan::default(), "BOOL", &condition));
            }
            let when_true = infer(&conditional.when_true, scope, env)?;
            let when_false = infer(&conditional.when_false, scope, env)?;
            unify(
                &env.canonical(&when_true),
                &env.canonical(&when_false),
                &conditional.when_true,
                &conditional.when_false,
            )
            .ok_or_else(|| mismatch(SourceSpan::default(), &when_true.to_string(), &when_false))
        }
        ExprKind::Call(call) => infer_call(call, scope, env),
    }
}

fn infer_binary(
    binary: &BinaryExpr,
    scope: &Scope,
    env: &TypeEnvironment,
) -> Result<TypeRef, Diagnostic> {
    let left = env.canonical(&infer(&binary.left, scope, env)?);
    let right = env.canonical(&infer(&binary.right, scope, env)?);

    match binary.op {
        BinaryOp::Add | BinaryOp::Sub => {
            // Duration arithmetic stays in the duration domain.
            if left.as_elementary().is_some_and(|k| k.is_duration())
                && right.as_elementary().is_some_and(|k| k.is_duration())
            {
                return Ok(left);
            }
            numeric_binary(&left, &right, binary)
        }
        BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod | BinaryOp::Pow => {
            numeric_binary(&left, &right, binary)
        }
        BinaryOp::BitAnd | BinaryOp::BitOr | BinaryOp::BitXor => {
            let both_bits = |t: &TypeRef| {
                t.is_boolean()
                    || t.as_elementary()
                        .is_some_and(|k| k.is_integer() || k.is_bit_string())
            };
            if both_bits(&left) && both_bits(&right) {
                unify(&left, &right, &binary.left, &binary.right)
                    .ok_or_else(|| mismatch(SourceSpan::default(), &left.to_string(), &right))
            } else {
                Err(mismatch(SourceSpan::default(), "integer", &right))
            }
        }
        BinaryOp::Shl | BinaryOp::Shr => {
            let shiftable = left
                .as_elementary()
                .is_some_and(|k| k.is_integer() || k.is_bit_string());
            let count_ok = right.as_elementary().is_some_and(|k| k.is_integer());
            if shiftable && count_ok {
                Ok(left)
            } else {
                Err(mismatch(SourceSpan::default(), "integer", &right))
            }
        }
    }
}

fn numeric_binary(
    left: &TypeRef,
    right: &TypeRef,
    binary: &BinaryExpr,
) -> Result<TypeRef, Diagnostic> {
    let numeric = |t: &TypeRef| t.as_elementary().is_some_and(|k| k.is_numeric());
    if !numeric(left) {
        return Err(mismatch(SourceSpan::default(), "numeric", left));
    }
    if !numeric(right) {
        return Err(mismatch(SourceSpan::default(), "numeric", right));
    }
    unify(left, right, &binary.left, &binary.right)
        .ok_or_else(|| mismatch(SourceSpan::default(), &left.to_string(), right))
}

fn infer_path(
    path: &VariablePath,
    scope: &Scope,
    env: &TypeEnvironment,
) -> Result<TypeRef, Diagnostic> {
    let root = path
        .root()
        .ok_or_else(|| unresolved(path.span(), "Variable", &path.to_string()))?;
    let (_, mut current) = scope
        .lookup(root)
        .cloned()
        .ok_or_else(|| unresolved(path.span(), "Variable", &root.to_string()))?;

    for segment in &path.segments[1..] {
        current = env.canonical(&current);
        match segment {
            PathSegment::Field(field) => {
                current = field_type(&current, field, env)
                    .ok_or_else(|| unresolved(field.span(), "Field", &field.to_string()))?;
            }
            PathSegment::Index(index) => match &current {
                TypeRef::Array(spec) => {
                    if index.subscripts.len() != spec.dimensions.len() {
                        return Err(Diagnostic::problem(
                            Problem::TypeMismatch,
                            Label::span(path.span(), "Array access"),
                        )
                        .with_context("dimensions", &spec.dimensions.len().to_string())
                        .with_context("subscripts", &index.subscripts.len().to_string()));
                    }
                    for subscript in &index.subscripts {
                        let subscript_type = infer(subscript, scope, env)?;
                        let integer = env
                            .canonical(&subscript_type)
                            .as_elementary()
                            .is_some_and(|k| k.is_integer());
                        if !integer {
                            return Err(mismatch(path.span(), "integer", &subscript_type));
                        }
                    }
                    current = spec.element.as_ref().clone();
                }
                other => return Err(mismatch(path.span(), "array", other)),
            },
            PathSegment::Deref => match &current {
                TypeRef::Pointer(target) | TypeRef::Reference(target) => {
                    current = target.as_ref().clone();
                }
                other => return Err(mismatch(path.span(), "pointer", other)),
            },
        }
    }
    Ok(current)
}

/// The type of a named field of a composite type: a structure member
/// or a function block interface variable.
fn field_type(parent: &TypeRef, field: &Id, env: &TypeEnvironment) -> Option<TypeRef> {
    let name = parent.as_named()?;
    match env.resolve(name)? {
        Resolved::DataType(TypeDefinitionKind::Structure(def)) => def
            .members
            .iter()
            .find(|m| &m.name == field)
            .map(|m| m.type_ref.clone()),
        Resolved::DataType(_) => None,
        Resolved::UserPou(pou) => pou
            .interface
            .find(field)
            .map(|(_, decl)| decl.type_ref.clone()),
        Resolved::StandardFb(fb) => {
            let interface = {
                let mut interface = Interface::new();
                interface.inputs = fb.inputs();
                interface.outputs = fb.outputs();
                interface
            };
            interface.find(field).map(|(_, decl)| decl.type_ref.clone())
        }
    }
}

fn infer_call(
    call: &FunctionCall,
    scope: &Scope,
    env: &TypeEnvironment,
) -> Result<TypeRef, Diagnostic> {
    let name = call.name.original().to_uppercase();

    // The first-scan system flag.
    if name == "__FIRST_SCAN" {
        return Ok(TypeRef::BOOL);
    }

    let mut arg_types = Vec::new();
    for arg in &call.args {
        arg_types.push(infer(&arg.value, scope, env)?);
    }

    if STANDARD_FUNCTIONS.contains(name.as_str()) {
        return standard_function_type(&name, &arg_types, call);
    }

    // Explicit conversions have the form SOURCE_TO_TARGET.
    if let Some(target) = conversion_target(&name) {
        if arg_types.len() == 1 {
            return Ok(TypeRef::Elementary(target));
        }
    }

    // A user function.
    if let Some(pou) = env.pou(&call.name) {
        if pou.kind == PouKind::Function {
            if let Some(return_type) = &pou.return_type {
                return Ok(return_type.clone());
            }
        }
    }

    Err(unresolved(call.name.span(), "Callable", &name))
}

fn standard_function_type(
    name: &str,
    arg_types: &[TypeRef],
    call: &FunctionCall,
) -> Result<TypeRef, Diagnostic> {
    let first = arg_types.first().cloned();
    let arity_error = || {
        Diagnostic::problem(
            Problem::TypeMismatch,
            Label::span(call.name.span(), "Call"),
        )
        .with_context("function", name)
        .with_context("arguments", &arg_types.len().to_string())
    };

    match name {
        "ABS" | "MIN" | "MAX" | "LIMIT" | "SHL" | "SHR" => first.ok_or_else(arity_error),
        "SQRT" | "LN" | "LOG" | "EXP" | "EXPT" | "SIN" | "COS" | "TAN" | "ASIN" | "ACOS"
        | "ATAN" => Ok(first
            .filter(|t| t.as_elementary().is_some_and(|k| k.is_float()))
            .unwrap_or(TypeRef::LREAL)),
        "TRUNC" | "ROUND" => Ok(TypeRef::DINT),
        "SEL" => arg_types.get(1).cloned().ok_or_else(arity_error),
        "MUX" => arg_types.get(1).cloned().ok_or_else(arity_error),
        _ => Err(arity_error()),
    }
}

/// Parses a conversion function name into its target type.
pub fn conversion_target(name: &str) -> Option<ElementaryKind> {
    let (_, target) = name.split_once("_TO_")?;
    let kind = match target {
        "BOOL" => ElementaryKind::BOOL,
        "SINT" => ElementaryKind::SINT,
        "INT" => ElementaryKind::INT,
        "DINT" => ElementaryKind::DINT,
        "LINT" => ElementaryKind::LINT,
        "USINT" => ElementaryKind::USINT,
        "UINT" => ElementaryKind::UINT,
        "UDINT" => ElementaryKind::UDINT,
        "ULINT" => ElementaryKind::ULINT,
        "REAL" => ElementaryKind::REAL,
        "LREAL" => ElementaryKind::LREAL,
        "TIME" => ElementaryKind::TIME,
        "BYTE" => ElementaryKind::BYTE,
        "WORD" => ElementaryKind::WORD,
        "DWORD" => ElementaryKind::DWORD,
        "LWORD" => ElementaryKind::LWORD,
        _ => return None,
    };
    Some(kind)
}

/// Checks the statements of a body against a scope, appending
/// diagnostics. Statements execute in program order, so the check
/// walks in program order too.
pub struct StatementChecker<'a> {
    pub scope: Scope,
    pub env: &'a TypeEnvironment<'a>,
    pub pou_kind: PouKind,
    pub diagnostics: Vec<Diagnostic>,
}

impl<'a> StatementChecker<'a> {
    pub fn new(scope: Scope, env: &'a TypeEnvironment<'a>, pou_kind: PouKind) -> Self {
        Self {
            scope,
            env,
            pou_kind,
            diagnostics: Vec::new(),
        }
    }

    pub fn check_body(&mut self, body: &[StmtKind]) {
        for statement in body {
            self.check_statement(statement);
        }
    }

    /// Checks a chart transition condition, which must be Boolean.
    pub fn expect_transition(&mut self, condition: &ExprKind) {
        self.expect_boolean(condition, "transition condition");
    }

    fn expect_boolean(&mut self, expr: &ExprKind, context: &str) {
        match infer(expr, &self.scope, self.env) {
            Ok(found) => {
                if !self.env.canonical(&found).is_boolean() {
                    self.diagnostics.push(
                        mismatch(SourceSpan::default(), "BOOL", &found)
                            .with_context("context", context),
                    );
                }
            }
            Err(diagnostic) => self.diagnostics.push(diagnostic),
        }
    }

    fn check_statement(&mut self, statement: &StmtKind) {
        match statement {
            StmtKind::Assignment(assignment) => self.check_assignment(assignment),
            StmtKind::If(if_stmt) => {
                for branch in &if_stmt.branches {
                    self.expect_boolean(&branch.condition, "if condition");
                    self.check_body(&branch.body);
                }
                self.check_body(&if_stmt.else_body);
            }
            StmtKind::Case(case) => self.check_case(case),
            StmtKind::For(for_stmt) => {
                for bound in [&for_stmt.from, &for_stmt.to]
                    .into_iter()
                    .chain(for_stmt.step.iter())
                {
                    match infer(bound, &self.scope, self.env) {
                        Ok(found) => {
                            let integer = self
                                .env
                                .canonical(&found)
                                .as_elementary()
                                .is_some_and(|k| k.is_integer());
                            if !integer {
                                self.diagnostics
                                    .push(mismatch(SourceSpan::default(), "integer", &found));
                            }
                        }
                        Err(diagnostic) => self.diagnostics.push(diagnostic),
                    }
                }
                self.check_body(&for_stmt.body);
            }
            StmtKind::While(while_stmt) => {
                self.expect_boolean(&while_stmt.condition, "while condition");
                self.check_body(&while_stmt.body);
            }
            StmtKind::Repeat(repeat) => {
                self.check_body(&repeat.body);
                self.expect_boolean(&repeat.until, "until condition");
            }
            StmtKind::FbCall(fb_call) => self.check_fb_call(fb_call),
            StmtKind::Return(return_stmt) => {
                if self.pou_kind != PouKind::Function {
                    self.diagnostics.push(Diagnostic::problem(
                        Problem::ReturnOutsideFunction,
                        Label::span(SourceSpan::default(), "Return"),
                    ));
                }
                if let Some(value) = &return_stmt.value {
                    if let Err(diagnostic) = infer(value, &self.scope, self.env) {
                        self.diagnostics.push(diagnostic);
                    }
                }
            }
            StmtKind::SuperCall | StmtKind::Exit | StmtKind::Empty => {}
        }
    }

    fn check_assignment(&mut self, assignment: &Assignment) {
        if let Some(root) = assignment.target.root() {
            if let Some((role, _)) = self.scope.lookup(root) {
                if assignment.target.is_simple() && !writable(*role) {
                    self.diagnostics.push(
                        Diagnostic::problem(
                            Problem::TypeMismatch,
                            Label::span(assignment.target.span(), "Assignment target"),
                        )
                        .with_context("variable", &root.to_string())
                        .with_context("role", &role.to_string()),
                    );
                    return;
                }
            }
        }

        let target_type = match infer_path(&assignment.target, &self.scope, self.env) {
            Ok(found) => found,
            Err(diagnostic) => {
                self.diagnostics.push(diagnostic);
                return;
            }
        };
        let value_type = match infer(&assignment.value, &self.scope, self.env) {
            Ok(found) => found,
            Err(diagnostic) => {
                self.diagnostics.push(diagnostic);
                return;
            }
        };

        let target_canonical = self.env.canonical(&target_type);
        let value_canonical = self.env.canonical(&value_type);
        let compatible = value_assignable(&value_canonical, &assignment.value, &target_canonical)
            // Enumerated values keep their nominal type.
            || value_type == target_type;
        if !compatible {
            self.diagnostics.push(
                Diagnostic::problem(
                    Problem::TypeMismatch,
                    Label::span(assignment.target.span(), "Assignment"),
                )
                .with_context("target", &target_type.to_string())
                .with_context("value", &value_type.to_string()),
            );
        }
    }

    fn check_case(&mut self, case: &Case) {
        let selector_type = match infer(&case.selector, &self.scope, self.env) {
            Ok(found) => found,
            Err(diagnostic) => {
                self.diagnostics.push(diagnostic);
                return;
            }
        };

        let canonical = self.env.canonical(&selector_type);
        let selector_enum = selector_type
            .as_named()
            .and_then(|name| self.env.enumeration(&name.name));
        let is_integer = canonical
            .as_elementary()
            .is_some_and(|k| k.is_integer());

        if !is_integer && selector_enum.is_none() {
            self.diagnostics
                .push(mismatch(SourceSpan::default(), "integer or enumeration", &selector_type));
            return;
        }

        let mut covered: Vec<Id> = Vec::new();
        for arm in &case.arms {
            for selector in &arm.selectors {
                match selector {
                    CaseSelector::Enumerated(value) => match selector_enum {
                        Some(definition) => {
                            if definition.value_of(&value.variant).is_none() {
                                self.diagnostics.push(unresolved(
                                    value.span(),
                                    "Enumeration variant",
                                    &value.variant.to_string(),
                                ));
                            } else {
                                covered.push(value.variant.clone());
                            }
                        }
                        None => self.diagnostics.push(
                            mismatch(SourceSpan::default(), "integer", &selector_type)
                                .with_context("selector", &value.to_string()),
                        ),
                    },
                    CaseSelector::Value(_) | CaseSelector::Range(_) => {
                        if !is_integer {
                            self.diagnostics.push(mismatch(
                                SourceSpan::default(),
                                &selector_type.to_string(),
                                &TypeRef::DINT,
                            ));
                        }
                    }
                }
            }
            self.check_body(&arm.body);
        }
        self.check_body(&case.else_body);

        // A case over an enumeration should cover every variant unless
        // it has a default arm.
        if let Some(definition) = selector_enum {
            if case.else_body.is_empty() {
                let missing: Vec<String> = definition
                    .variants
                    .iter()
                    .filter(|v| !covered.contains(&v.name))
                    .map(|v| v.name.original().to_owned())
                    .collect();
                if !missing.is_empty() {
                    self.diagnostics.push(
                        Diagnostic::warning(
                            Problem::CaseNotExhaustive,
                            Label::span(SourceSpan::default(), "Case"),
                        )
                        .with_context("missing", &missing.join(", ")),
                    );
                }
            }
        }
    }

    fn check_fb_call(&mut self, fb_call: &FbCall) {
        let instance_type = match infer_path(&fb_call.instance, &self.scope, self.env) {
            Ok(found) => found,
            Err(diagnostic) => {
                self.diagnostics.push(diagnostic);
                return;
            }
        };
        let interface = instance_type
            .as_named()
            .and_then(|name| self.env.fb_interface(name));
        let interface = match interface {
            Some(interface) => interface,
            None => {
                self.diagnostics.push(mismatch(
                    fb_call.instance.span(),
                    "function block instance",
                    &instance_type,
                ));
                return;
            }
        };

        for input in &fb_call.inputs {
            match interface.find(&input.name) {
                Some((VarRole::Input, decl)) => {
                    match infer(&input.value, &self.scope, self.env) {
                        Ok(found) => {
                            let ok = value_assignable(
                                &self.env.canonical(&found),
                                &input.value,
                                &self.env.canonical(&decl.type_ref),
                            );
                            if !ok {
                                self.diagnostics.push(
                                    mismatch(input.name.span(), &decl.type_ref.to_string(), &found)
                                        .with_context_id("input", &input.name),
                                );
                            }
                        }
                        Err(diagnostic) => self.diagnostics.push(diagnostic),
                    }
                }
                Some((role, _)) => self.diagnostics.push(
                    Diagnostic::problem(
                        Problem::TypeMismatch,
                        Label::span(input.name.span(), "Invocation input"),
                    )
                    .with_context_id("name", &input.name)
                    .with_context("role", &role.to_string()),
                ),
                None => self.diagnostics.push(unresolved(
                    input.name.span(),
                    "Invocation input",
                    &input.name.to_string(),
                )),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plx_dsl::common::{EnumVariantDecl, EnumerationDefinition, Interface, VarDecl};

    fn scope() -> Scope {
        let mut interface = Interface::new();
        interface.inputs.push(VarDecl::bool("cmd"));
        interface.outputs.push(VarDecl::bool("running"));
        interface.statics.push(VarDecl::int("count"));
        interface.statics.push(VarDecl::real("level"));
        interface.statics.push(VarDecl::new("wide", TypeRef::LINT));
        Scope::from_interface(&interface)
    }

    #[test]
    fn infer_when_compare_then_boolean() {
        let env = TypeEnvironment::new();
        let expr = ExprKind::compare(
            CompareOp::Gt,
            ExprKind::named_variable("count"),
            ExprKind::const_integer(3),
        );
        assert_eq!(infer(&expr, &scope(), &env).unwrap(), TypeRef::BOOL);
    }

    #[test]
    fn infer_when_logic_on_integer_then_mismatch() {
        let env = TypeEnvironment::new();
        let expr = ExprKind::logic(
            LogicOp::And,
            ExprKind::named_variable("cmd"),
            ExprKind::named_variable("count"),
        );
        let err = infer(&expr, &scope(), &env).unwrap_err();
        assert!(err.is_problem(Problem::TypeMismatch));
    }

    #[test]
    fn check_when_widening_assignment_then_accepted() {
        let env = TypeEnvironment::new();
        let mut checker = StatementChecker::new(scope(), &env, PouKind::FunctionBlock);
        checker.check_body(&[StmtKind::simple_assignment(
            "wide",
            ExprKind::named_variable("count"),
        )]);
        assert!(checker.diagnostics.is_empty(), "{:?}", checker.diagnostics);
    }

    #[test]
    fn check_when_narrowing_assignment_then_mismatch() {
        let env = TypeEnvironment::new();
        let mut checker = StatementChecker::new(scope(), &env, PouKind::FunctionBlock);
        checker.check_body(&[StmtKind::simple_assignment(
            "count",
            ExprKind::named_variable("wide"),
        )]);
        assert!(checker.diagnostics[0].is_problem(Problem::TypeMismatch));
    }

    #[test]
    fn check_when_float_to_int_assignment_then_mismatch() {
        let env = TypeEnvironment::new();
        let mut checker = StatementChecker::new(scope(), &env, PouKind::FunctionBlock);
        checker.check_body(&[StmtKind::simple_assignment(
            "count",
            ExprKind::named_variable("level"),
        )]);
        assert!(checker.diagnostics[0].is_problem(Problem::TypeMismatch));
    }

    #[test]
    fn check_when_assigning_to_input_then_rejected() {
        let env = TypeEnvironment::new();
        let mut checker = StatementChecker::new(scope(), &env, PouKind::FunctionBlock);
        checker.check_body(&[StmtKind::simple_assignment(
            "cmd",
            ExprKind::const_bool(true),
        )]);
        assert!(!checker.diagnostics.is_empty());
    }

    #[test]
    fn check_when_if_condition_not_boolean_then_mismatch() {
        let env = TypeEnvironment::new();
        let mut checker = StatementChecker::new(scope(), &env, PouKind::FunctionBlock);
        checker.check_body(&[StmtKind::if_then(
            ExprKind::named_variable("count"),
            vec![],
        )]);
        assert!(checker.diagnostics[0].is_problem(Problem::TypeMismatch));
    }

    #[test]
    fn check_when_return_outside_function_then_error() {
        let env = TypeEnvironment::new();
        let mut checker = StatementChecker::new(scope(), &env, PouKind::FunctionBlock);
        checker.check_body(&[StmtKind::Return(ReturnStmt { value: None })]);
        assert!(checker.diagnostics[0].is_problem(Problem::ReturnOutsideFunction));
    }

    #[test]
    fn check_when_enum_case_not_exhaustive_then_warning() {
        let types = vec![TypeDefinitionKind::Enumeration(
            EnumerationDefinition::new(
                "Mode",
                vec![
                    EnumVariantDecl::new("Off", 0),
                    EnumVariantDecl::new("Manual", 1),
                    EnumVariantDecl::new("Auto", 2),
                ],
            )
            .unwrap(),
        )];
        let env = TypeEnvironment::new().with_data_types(&types);

        let mut interface = Interface::new();
        interface
            .statics
            .push(VarDecl::new("mode", TypeRef::named("Mode")));
        interface.statics.push(VarDecl::int("x"));
        let scope = Scope::from_interface(&interface);

        let case = Case::new(
            ExprKind::named_variable("mode"),
            vec![CaseArm {
                selectors: vec![CaseSelector::Enumerated(
                    plx_dsl::common::EnumeratedValue::qualified("Mode", "Off"),
                )],
                body: vec![StmtKind::simple_assignment("x", ExprKind::const_integer(0))],
            }],
            vec![],
        )
        .unwrap();

        let mut checker = StatementChecker::new(scope, &env, PouKind::FunctionBlock);
        checker.check_body(&[StmtKind::Case(case)]);

        let warning = checker
            .diagnostics
            .iter()
            .find(|d| d.is_problem(Problem::CaseNotExhaustive))
            .expect("exhaustiveness warning");
        assert!(warning.description().contains("Manual"));
    }

    #[test]
    fn check_when_fb_call_unknown_input_then_unresolved() {
        let mut interface = Interface::new();
        interface
            .statics
            .push(VarDecl::instance("starter", "TON"));
        let scope = Scope::from_interface(&interface);
        let env = TypeEnvironment::new();

        let call = StmtKind::fb_call(
            VariablePath::named("starter"),
            vec![NamedInput::new("NOPE", ExprKind::const_bool(true))],
        );
        let mut checker = StatementChecker::new(scope, &env, PouKind::FunctionBlock);
        checker.check_body(&[call]);
        assert!(checker.diagnostics[0].is_problem(Problem::NameUnresolved));
    }
}
