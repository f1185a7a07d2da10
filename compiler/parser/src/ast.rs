//! The authoring-language abstract syntax tree.
//!
//! The authored source is a small, Python-shaped statement subset. It
//! is parsed, never executed: the tree below is the input to lowering,
//! which maps it into the Universal IR. Nodes carry source spans for
//! diagnostics.
use plx_dsl::core::SourceSpan;

/// A block of statements.
pub type Suite = Vec<Stmt>;

/// Statements of the authored subset.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// `target = value`
    Assign(Assign),
    /// `if`/`elif`/`else` chain
    If(IfStmt),
    /// `while cond:`
    While(WhileStmt),
    /// `for var in range(...):`
    For(ForStmt),
    /// `match subject:` with `case` arms
    Match(MatchStmt),
    /// `return [expr]`
    Return(ReturnStmt),
    /// `break`, leaving the innermost loop
    Break(SourceSpan),
    /// `pass`
    Pass(SourceSpan),
    /// A bare expression evaluated for effect (an invocation)
    Expr(ExprStmt),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assign {
    pub target: Expr,
    pub value: Expr,
    pub span: SourceSpan,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfStmt {
    /// The `if` branch followed by any `elif` branches, in order.
    pub branches: Vec<(Expr, Suite)>,
    pub orelse: Suite,
    pub span: SourceSpan,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhileStmt {
    pub condition: Expr,
    pub body: Suite,
    pub span: SourceSpan,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForStmt {
    pub var: String,
    /// The iterable. Lowering accepts only a `range(...)` call here.
    pub iterable: Expr,
    pub body: Suite,
    pub span: SourceSpan,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchStmt {
    pub subject: Expr,
    pub arms: Vec<MatchArm>,
    pub span: SourceSpan,
}

/// One `case` arm. The patterns are or-joined alternatives; the
/// wildcard `_` must be the only pattern of the final arm.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchArm {
    pub patterns: Vec<Pattern>,
    pub body: Suite,
    pub span: SourceSpan,
}

/// Patterns accepted in a `case` arm.
#[derive(Debug, Clone, PartialEq)]
pub enum Pattern {
    /// An integer literal, possibly negated.
    Int(i128),
    /// A dotted name such as `Mode.Auto` referencing an enum variant.
    Variant { enum_name: String, variant: String },
    /// The wildcard `_`.
    Wildcard,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReturnStmt {
    pub value: Option<Expr>,
    pub span: SourceSpan,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExprStmt {
    pub value: Expr,
    pub span: SourceSpan,
}

/// Unary operators of the authored subset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOpKind {
    Neg,
    Not,
    Invert,
}

/// Binary operators of the authored subset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOpKind {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
}

/// Comparison operators of the authored subset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOpKind {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
}

/// Short-circuit Boolean operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolOpKind {
    And,
    Or,
}

/// Expressions of the authored subset.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Int {
        value: i128,
        span: SourceSpan,
    },
    Float {
        value: f64,
        span: SourceSpan,
    },
    Bool {
        value: bool,
        span: SourceSpan,
    },
    Str {
        value: String,
        span: SourceSpan,
    },
    /// A bare name.
    Name {
        id: String,
        span: SourceSpan,
    },
    /// The `self` keyword.
    SelfRef {
        span: SourceSpan,
    },
    /// The exact form `super().logic()`.
    SuperLogic {
        span: SourceSpan,
    },
    /// `value.attr`
    Attribute {
        value: Box<Expr>,
        attr: String,
        span: SourceSpan,
    },
    /// `value[a, b]` or `value[a][b]`
    Subscript {
        value: Box<Expr>,
        indices: Vec<Expr>,
        span: SourceSpan,
    },
    /// `func(args..., name=value...)`
    Call {
        func: Box<Expr>,
        args: Vec<Expr>,
        kwargs: Vec<(String, Expr)>,
        span: SourceSpan,
    },
    UnaryOp {
        op: UnaryOpKind,
        operand: Box<Expr>,
        span: SourceSpan,
    },
    BinOp {
        op: BinOpKind,
        left: Box<Expr>,
        right: Box<Expr>,
        span: SourceSpan,
    },
    Compare {
        op: CompareOpKind,
        left: Box<Expr>,
        right: Box<Expr>,
        span: SourceSpan,
    },
    BoolOp {
        op: BoolOpKind,
        left: Box<Expr>,
        right: Box<Expr>,
        span: SourceSpan,
    },
    /// `then if condition else orelse`
    IfExp {
        condition: Box<Expr>,
        then: Box<Expr>,
        orelse: Box<Expr>,
        span: SourceSpan,
    },
}

impl Expr {
    pub fn span(&self) -> SourceSpan {
        match self {
            Expr::Int { span, .. }
            | Expr::Float { span, .. }
            | Expr::Bool { span, .. }
            | Expr::Str { span, .. }
            | Expr::Name { span, .. }
            | Expr::SelfRef { span }
            | Expr::SuperLogic { span }
            | Expr::Attribute { span, .. }
            | Expr::Subscript { span, .. }
            | Expr::Call { span, .. }
            | Expr::UnaryOp { span, .. }
            | Expr::BinOp { span, .. }
            | Expr::Compare { span, .. }
            | Expr::BoolOp { span, .. }
            | Expr::IfExp { span, .. } => span.clone(),
        }
    }

    /// The called name, when this is a call of a bare name (such as a
    /// sentinel or builtin function call).
    pub fn call_name(&self) -> Option<&str> {
        match self {
            Expr::Call { func, .. } => match func.as_ref() {
                Expr::Name { id, .. } => Some(id),
                _ => None,
            },
            _ => None,
        }
    }
}

impl Stmt {
    pub fn span(&self) -> SourceSpan {
        match self {
            Stmt::Assign(s) => s.span.clone(),
            Stmt::If(s) => s.span.clone(),
            Stmt::While(s) => s.span.clone(),
            Stmt::For(s) => s.span.clone(),
            Stmt::Match(s) => s.span.clone(),
            Stmt::Return(s) => s.span.clone(),
            Stmt::Break(span) => span.clone(),
            Stmt::Pass(span) => span.clone(),
            Stmt::Expr(s) => s.span.clone(),
        }
    }
}
