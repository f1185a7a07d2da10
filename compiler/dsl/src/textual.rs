//! Provides definitions of IR expressions and statements.
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use plx_dsl_derive::Traverse;
use plx_problems::Problem;

use crate::common::{ConstantKind, EnumeratedValue};
use crate::core::{Id, Located, SourceSpan};
use crate::diagnostic::{Diagnostic, Label};
use crate::fold::Fold;
use crate::visitor::Visitor;

/// One segment of a variable path.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize, Traverse)]
pub enum PathSegment {
    /// Access to a named field (or, as the first segment, the variable
    /// itself).
    Field(Id),
    /// Array subscript access with one expression per dimension.
    Index(IndexSegment),
    /// Pointer/reference dereference.
    Deref,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize, Traverse)]
pub struct IndexSegment {
    pub subscripts: Vec<ExprKind>,
}

/// A reference to a variable: one or more segments, each a field
/// access, an array index, or a dereference. The first segment is
/// always a field naming the root variable.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize, Traverse)]
pub struct VariablePath {
    pub segments: Vec<PathSegment>,
    #[traverse(skip)]
    #[serde(skip)]
    pub span: SourceSpan,
}

impl VariablePath {
    pub fn named(name: &str) -> Self {
        Self {
            segments: vec![PathSegment::Field(Id::from(name))],
            span: SourceSpan::default(),
        }
    }

    pub fn field(mut self, name: &str) -> Self {
        self.segments.push(PathSegment::Field(Id::from(name)));
        self
    }

    pub fn index(mut self, subscripts: Vec<ExprKind>) -> Self {
        self.segments
            .push(PathSegment::Index(IndexSegment { subscripts }));
        self
    }

    pub fn with_span(mut self, span: SourceSpan) -> Self {
        self.span = span;
        self
    }

    /// The root variable name of the path.
    pub fn root(&self) -> Option<&Id> {
        match self.segments.first() {
            Some(PathSegment::Field(name)) => Some(name),
            _ => None,
        }
    }

    /// True when the path is a single plain name.
    pub fn is_simple(&self) -> bool {
        self.segments.len() == 1 && matches!(self.segments[0], PathSegment::Field(_))
    }
}

impl Located for VariablePath {
    fn span(&self) -> SourceSpan {
        self.span.clone()
    }
}

impl fmt::Display for VariablePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (position, segment) in self.segments.iter().enumerate() {
            match segment {
                PathSegment::Field(name) => {
                    if position > 0 {
                        f.write_str(".")?;
                    }
                    write!(f, "{}", name)?;
                }
                PathSegment::Index(index) => {
                    write!(f, "[{} subscript(s)]", index.subscripts.len())?;
                }
                PathSegment::Deref => f.write_str("^")?,
            }
        }
        Ok(())
    }
}

/// Unary operators.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub enum UnaryOp {
    /// Arithmetic negation
    Neg,
    /// Boolean complement
    Not,
    /// Bitwise complement
    BitNot,
}

/// Arithmetic and bitwise binary operators.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
}

/// Comparison operators. These always produce a Boolean result.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Gt,
    LtEq,
    GtEq,
}

/// Short-circuit logical operators over Boolean operands.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub enum LogicOp {
    And,
    Or,
}

/// A unary expression that transforms its operand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Traverse)]
pub struct UnaryExpr {
    #[traverse(skip)]
    pub op: UnaryOp,
    pub term: ExprKind,
}

/// A binary arithmetic or bitwise expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Traverse)]
pub struct BinaryExpr {
    #[traverse(skip)]
    pub op: BinaryOp,
    pub left: ExprKind,
    pub right: ExprKind,
}

/// A binary expression that produces a Boolean result by comparing
/// its operands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Traverse)]
pub struct CompareExpr {
    #[traverse(skip)]
    pub op: CompareOp,
    pub left: ExprKind,
    pub right: ExprKind,
}

/// A short-circuit logical expression. The right operand is evaluated
/// only when the left operand does not decide the result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Traverse)]
pub struct LogicExpr {
    #[traverse(skip)]
    pub op: LogicOp,
    pub left: ExprKind,
    pub right: ExprKind,
}

/// A conditional (ternary) expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Traverse)]
pub struct Conditional {
    pub condition: ExprKind,
    pub when_true: ExprKind,
    pub when_false: ExprKind,
}

/// An argument in a function call: positional when `name` is absent,
/// named otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Traverse)]
pub struct CallArg {
    pub name: Option<Id>,
    pub value: ExprKind,
}

impl CallArg {
    pub fn positional(value: ExprKind) -> Self {
        Self { name: None, value }
    }

    pub fn named(name: &str, value: ExprKind) -> Self {
        Self {
            name: Some(Id::from(name)),
            value,
        }
    }
}

/// A call to a callable by name with positional and named arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Traverse)]
pub struct FunctionCall {
    pub name: Id,
    pub args: Vec<CallArg>,
}

/// Expression that yields a value derived from its inputs.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize, Traverse)]
pub enum ExprKind {
    Const(ConstantKind),
    Variable(VariablePath),
    Unary(Box<UnaryExpr>),
    Binary(Box<BinaryExpr>),
    Compare(Box<CompareExpr>),
    Logic(Box<LogicExpr>),
    Conditional(Box<Conditional>),
    Call(FunctionCall),
}

impl ExprKind {
    pub fn unary(op: UnaryOp, term: ExprKind) -> ExprKind {
        ExprKind::Unary(Box::new(UnaryExpr { op, term }))
    }

    pub fn binary(op: BinaryOp, left: ExprKind, right: ExprKind) -> ExprKind {
        ExprKind::Binary(Box::new(BinaryExpr { op, left, right }))
    }

    pub fn compare(op: CompareOp, left: ExprKind, right: ExprKind) -> ExprKind {
        ExprKind::Compare(Box::new(CompareExpr { op, left, right }))
    }

    pub fn logic(op: LogicOp, left: ExprKind, right: ExprKind) -> ExprKind {
        ExprKind::Logic(Box::new(LogicExpr { op, left, right }))
    }

    pub fn conditional(condition: ExprKind, when_true: ExprKind, when_false: ExprKind) -> ExprKind {
        ExprKind::Conditional(Box::new(Conditional {
            condition,
            when_true,
            when_false,
        }))
    }

    pub fn named_variable(name: &str) -> ExprKind {
        ExprKind::Variable(VariablePath::named(name))
    }

    pub fn const_bool(value: bool) -> ExprKind {
        ExprKind::Const(ConstantKind::bool(value))
    }

    pub fn const_integer(value: i128) -> ExprKind {
        ExprKind::Const(ConstantKind::integer(value))
    }

    pub fn enumerated(type_name: &str, variant: &str) -> ExprKind {
        ExprKind::Const(ConstantKind::Enumerated(EnumeratedValue::qualified(
            type_name, variant,
        )))
    }
}

/// A named input in a function block invocation.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize, Traverse)]
pub struct NamedInput {
    pub name: Id,
    pub value: ExprKind,
}

impl NamedInput {
    pub fn new(name: &str, value: ExprKind) -> Self {
        Self {
            name: Id::from(name),
            value,
        }
    }
}

/// Function block invocation.
///
/// The invocation assigns the named inputs and executes the instance;
/// it returns nothing. Outputs are read with a subsequent field access
/// on the instance.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize, Traverse)]
pub struct FbCall {
    pub instance: VariablePath,
    pub inputs: Vec<NamedInput>,
}

/// Assigns a variable to the result of evaluating an expression. The
/// target must resolve to a writable variable.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize, Traverse)]
pub struct Assignment {
    pub target: VariablePath,
    pub value: ExprKind,
}

/// One condition/body pair in an if chain.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize, Traverse)]
pub struct IfBranch {
    pub condition: ExprKind,
    pub body: Vec<StmtKind>,
}

/// If selection statement. The first branch is the `if`; the rest are
/// `elif` branches. Conditions must be Boolean.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize, Traverse)]
pub struct If {
    pub branches: Vec<IfBranch>,
    pub else_body: Vec<StmtKind>,
}

/// An inclusive integer range selecting a case arm.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub struct CaseRange {
    pub start: i64,
    pub end: i64,
}

/// A value set entry selecting a case arm.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize, Traverse)]
pub enum CaseSelector {
    #[traverse(skip)]
    Value(i64),
    #[traverse(skip)]
    Range(CaseRange),
    Enumerated(EnumeratedValue),
}

/// A group of statements selected by a value set within a case.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize, Traverse)]
pub struct CaseArm {
    pub selectors: Vec<CaseSelector>,
    pub body: Vec<StmtKind>,
}

/// Case selection statement: a selector expression, an ordered list of
/// mutually exclusive arms, and an optional default body.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize, Traverse)]
pub struct Case {
    pub selector: ExprKind,
    pub arms: Vec<CaseArm>,
    pub else_body: Vec<StmtKind>,
}

impl Case {
    /// Creates a case statement, rejecting overlapping arms.
    ///
    /// Integer selectors and ranges must be pairwise disjoint, and an
    /// enumerated variant may select at most one arm.
    pub fn new(
        selector: ExprKind,
        arms: Vec<CaseArm>,
        else_body: Vec<StmtKind>,
    ) -> Result<Self, Diagnostic> {
        let mut ranges: Vec<CaseRange> = Vec::new();
        let mut variants: HashSet<&EnumeratedValue> = HashSet::new();

        for arm in &arms {
            for case_selector in &arm.selectors {
                match case_selector {
                    CaseSelector::Value(value) => {
                        let range = CaseRange {
                            start: *value,
                            end: *value,
                        };
                        Case::check_disjoint(&ranges, &range)?;
                        ranges.push(range);
                    }
                    CaseSelector::Range(range) => {
                        Case::check_disjoint(&ranges, range)?;
                        ranges.push(*range);
                    }
                    CaseSelector::Enumerated(value) => {
                        if !variants.insert(value) {
                            return Err(Diagnostic::problem(
                                Problem::CaseOverlap,
                                Label::span(value.span(), "Case arm"),
                            )
                            .with_context("variant", &value.to_string()));
                        }
                    }
                }
            }
        }

        Ok(Self {
            selector,
            arms,
            else_body,
        })
    }

    fn check_disjoint(seen: &[CaseRange], candidate: &CaseRange) -> Result<(), Diagnostic> {
        for range in seen {
            if candidate.start <= range.end && range.start <= candidate.end {
                return Err(Diagnostic::problem(
                    Problem::CaseOverlap,
                    Label::span(SourceSpan::default(), "Case arm"),
                )
                .with_context(
                    "values",
                    &format!("{}..{}", candidate.start, candidate.end),
                ));
            }
        }
        Ok(())
    }
}

/// The counted loop statement with an integer induction variable and
/// inclusive bounds.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize, Traverse)]
pub struct For {
    /// The variable assigned the value of each iteration.
    pub control: Id,
    pub from: ExprKind,
    pub to: ExprKind,
    pub step: Option<ExprKind>,
    pub body: Vec<StmtKind>,
}

/// The while loop statement. Loop bodies may not suspend.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize, Traverse)]
pub struct While {
    pub condition: ExprKind,
    pub body: Vec<StmtKind>,
}

/// The repeat loop statement. The body executes at least once; the
/// loop finishes when the until condition becomes true.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize, Traverse)]
pub struct Repeat {
    pub body: Vec<StmtKind>,
    pub until: ExprKind,
}

/// Return from a function, optionally yielding the function result.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize, Traverse)]
pub struct ReturnStmt {
    pub value: Option<ExprKind>,
}

/// Statements.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize, Traverse)]
pub enum StmtKind {
    Assignment(Assignment),
    If(If),
    Case(Case),
    For(For),
    While(While),
    Repeat(Repeat),
    FbCall(FbCall),
    /// Marker standing for the parent POU's body. Produced when
    /// lowering `super().logic()`; replaced by the flattening pass.
    SuperCall,
    Return(ReturnStmt),
    Exit,
    Empty,
}

impl StmtKind {
    pub fn assignment(target: VariablePath, value: ExprKind) -> StmtKind {
        StmtKind::Assignment(Assignment { target, value })
    }

    pub fn simple_assignment(target: &str, value: ExprKind) -> StmtKind {
        StmtKind::assignment(VariablePath::named(target), value)
    }

    pub fn if_then(condition: ExprKind, body: Vec<StmtKind>) -> StmtKind {
        StmtKind::If(If {
            branches: vec![IfBranch { condition, body }],
            else_body: vec![],
        })
    }

    pub fn if_then_else(
        condition: ExprKind,
        body: Vec<StmtKind>,
        else_body: Vec<StmtKind>,
    ) -> StmtKind {
        StmtKind::If(If {
            branches: vec![IfBranch { condition, body }],
            else_body,
        })
    }

    pub fn fb_call(instance: VariablePath, inputs: Vec<NamedInput>) -> StmtKind {
        StmtKind::FbCall(FbCall { instance, inputs })
    }

    pub fn return_value(value: ExprKind) -> StmtKind {
        StmtKind::Return(ReturnStmt { value: Some(value) })
    }
}
