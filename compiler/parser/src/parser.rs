//! Parser for the authoring language. The parser transforms the
//! block-structured token stream into the authoring AST.
//!
//! Rules map closely to the grammar of the accepted subset. The parser
//! assumes whitespace and comments were removed and block structure
//! was made explicit by the token transform.
extern crate peg;

use peg::{parser, Parse, ParseElem, RuleResult};

use plx_dsl::core::{FileId, SourceSpan};
use plx_dsl::diagnostic::{Diagnostic, Label, QualifiedPosition};
use plx_problems::Problem;

use crate::ast::*;
use crate::lexer::tokenize;
use crate::token::{Token, TokenType};
use crate::xform_tokens;

/// Parses the source text of a logic body into a statement suite.
pub fn parse_logic(source: &str, file_id: &FileId) -> Result<Suite, Vec<Diagnostic>> {
    let tokens = significant_tokens(source, file_id)?;
    authoring_parser::logic_body(&SliceByRef(&tokens[..]))
        .map_err(|e| vec![syntax_diagnostic(&tokens, e.location, &e.expected, file_id)])
}

/// Parses a single authored expression (a transition condition or a
/// step action guard).
pub fn parse_expression(source: &str, file_id: &FileId) -> Result<Expr, Vec<Diagnostic>> {
    let tokens = significant_tokens(source, file_id)?;
    authoring_parser::expression_line(&SliceByRef(&tokens[..]))
        .map_err(|e| vec![syntax_diagnostic(&tokens, e.location, &e.expected, file_id)])
}

fn significant_tokens(source: &str, file_id: &FileId) -> Result<Vec<Token>, Vec<Diagnostic>> {
    let (tokens, diagnostics) = tokenize(source, file_id);
    if !diagnostics.is_empty() {
        return Err(diagnostics);
    }
    xform_tokens::apply(tokens, file_id)
}

fn syntax_diagnostic(
    tokens: &[Token],
    location: usize,
    expected: &peg::error::ExpectedSet,
    file_id: &FileId,
) -> Diagnostic {
    let expected = Vec::from_iter(expected.tokens()).join(", ");
    match tokens.get(location) {
        Some(token) => Diagnostic::problem(
            Problem::SyntaxError,
            Label::qualified(
                file_id.clone(),
                QualifiedPosition::new(token.line + 1, token.col + 1, token.span.start),
                format!("Expected one of: {}. Found '{}'", expected, token),
            ),
        ),
        None => Diagnostic::problem(
            Problem::SyntaxError,
            Label::file(
                file_id.clone(),
                format!("Unexpected end of input. Expected one of: {}", expected),
            ),
        ),
    }
}

/// The default parsing traits for `[T]` expect `T` to be `Copy`. This
/// wrapper exposes the elements by `&T` reference, which is `Copy`.
pub struct SliceByRef<'a, T>(pub &'a [T]);

impl<'a, T> Parse for SliceByRef<'a, T> {
    type PositionRepr = usize;
    fn start(&self) -> usize {
        0
    }

    fn is_eof(&self, pos: usize) -> bool {
        pos >= self.0.len()
    }

    fn position_repr(&self, pos: usize) -> usize {
        pos
    }
}

impl<'a, T: 'a> ParseElem<'a> for SliceByRef<'a, T> {
    type Element = &'a T;

    fn parse_elem(&'a self, pos: usize) -> RuleResult<&'a T> {
        match self.0[pos..].first() {
            Some(c) => RuleResult::Matched(pos + 1, c),
            None => RuleResult::Failed,
        }
    }
}

/// Parses an integer literal, tolerating digit group underscores.
fn parse_int(text: &str) -> Result<i128, &'static str> {
    let digits: String = text.chars().filter(|c| c.is_ascii_digit()).collect();
    digits.parse::<i128>().map_err(|_| "integer literal")
}

/// Parses a float literal, tolerating digit group underscores.
fn parse_float(text: &str) -> Result<f64, &'static str> {
    let cleaned: String = text.chars().filter(|c| *c != '_').collect();
    cleaned.parse::<f64>().map_err(|_| "float literal")
}

/// An argument as parsed, before splitting into positional and named.
enum Argument {
    Positional(Expr),
    Named(String, Expr),
}

/// Splits arguments, rejecting positional arguments after named ones.
fn split_arguments(items: Vec<Argument>) -> Result<(Vec<Expr>, Vec<(String, Expr)>), &'static str> {
    let mut args = Vec::new();
    let mut kwargs = Vec::new();
    for item in items {
        match item {
            Argument::Positional(expr) => {
                if !kwargs.is_empty() {
                    return Err("positional argument after named argument");
                }
                args.push(expr);
            }
            Argument::Named(name, expr) => kwargs.push((name, expr)),
        }
    }
    Ok((args, kwargs))
}

/// A postfix trailer: attribute access, call, or subscript.
enum Trailer {
    Attribute(String, SourceSpan),
    Call(Vec<Argument>, SourceSpan),
    Subscript(Vec<Expr>, SourceSpan),
}

fn apply_trailers(mut expr: Expr, trailers: Vec<Trailer>) -> Result<Expr, &'static str> {
    for trailer in trailers {
        expr = match trailer {
            Trailer::Attribute(attr, span) => Expr::Attribute {
                span: SourceSpan::join(&expr.span(), &span),
                value: Box::new(expr),
                attr,
            },
            Trailer::Call(items, span) => {
                let (args, kwargs) = split_arguments(items)?;
                Expr::Call {
                    span: SourceSpan::join(&expr.span(), &span),
                    func: Box::new(expr),
                    args,
                    kwargs,
                }
            }
            Trailer::Subscript(indices, span) => Expr::Subscript {
                span: SourceSpan::join(&expr.span(), &span),
                value: Box::new(expr),
                indices,
            },
        };
    }
    Ok(expr)
}

parser! {
  grammar authoring_parser<'a>() for SliceByRef<'a, Token> {

    /// Helper rule to match a particular type of token.
    rule tok(ty: TokenType) -> &'input Token = token:[t if t.token_type == ty] { token }
    /// Helper rule to match an identifier with the specified text.
    rule id_eq(val: &str) -> &'input Token =
        token:[t if t.token_type == TokenType::Identifier && t.text.as_str() == val] { token }

    rule newline() -> () = tok(TokenType::Newline) ()
    rule comma() -> () = tok(TokenType::Comma) ()

    pub rule logic_body() -> Suite = s:statement()* ![_] { s }

    pub rule expression_line() -> Expr = e:expression() newline()? ![_] { e }

    rule statement() -> Stmt =
        if_stmt()
        / while_stmt()
        / for_stmt()
        / match_stmt()
        / simple_stmt()

    // An indented block following a colon.
    rule block() -> Suite =
        tok(TokenType::Colon) newline() tok(TokenType::Indent) s:statement()+ tok(TokenType::Dedent) { s }

    rule if_stmt() -> Stmt =
        kw:tok(TokenType::If) cond:expression() body:block()
        elifs:(t:tok(TokenType::Elif) c:expression() b:block() { (c, b) })*
        orelse:(tok(TokenType::Else) b:block() { b })? {
            let mut branches = vec![(cond, body)];
            branches.extend(elifs);
            Stmt::If(IfStmt {
                branches,
                orelse: orelse.unwrap_or_default(),
                span: kw.span.clone(),
            })
        }

    rule while_stmt() -> Stmt =
        kw:tok(TokenType::While) cond:expression() body:block() {
            Stmt::While(WhileStmt {
                condition: cond,
                body,
                span: kw.span.clone(),
            })
        }

    rule for_stmt() -> Stmt =
        kw:tok(TokenType::For) var:tok(TokenType::Identifier) tok(TokenType::In)
        iterable:expression() body:block() {
            Stmt::For(ForStmt {
                var: var.text.clone(),
                iterable,
                body,
                span: kw.span.clone(),
            })
        }

    rule match_stmt() -> Stmt =
        kw:tok(TokenType::Match) subject:expression() tok(TokenType::Colon) newline()
        tok(TokenType::Indent) arms:case_arm()+ tok(TokenType::Dedent) {
            Stmt::Match(MatchStmt {
                subject,
                arms,
                span: kw.span.clone(),
            })
        }

    rule case_arm() -> MatchArm =
        kw:tok(TokenType::Case) patterns:(pattern() ++ tok(TokenType::Pipe)) body:block() {
            MatchArm {
                patterns,
                body,
                span: kw.span.clone(),
            }
        }

    rule pattern() -> Pattern =
        tok(TokenType::Underscore) { Pattern::Wildcard }
        / enum_name:tok(TokenType::Identifier) tok(TokenType::Period) variant:tok(TokenType::Identifier) {
            Pattern::Variant {
                enum_name: enum_name.text.clone(),
                variant: variant.text.clone(),
            }
        }
        / tok(TokenType::Minus) digits:tok(TokenType::Digits) {?
            parse_int(&digits.text).map(|value| Pattern::Int(-value))
        }
        / digits:tok(TokenType::Digits) {?
            parse_int(&digits.text).map(Pattern::Int)
        }

    rule simple_stmt() -> Stmt =
        assignment()
        / return_stmt()
        / break_stmt()
        / pass_stmt()
        / expr_stmt()

    rule assignment() -> Stmt =
        target:postfix_expr() tok(TokenType::Assign) value:expression() newline() {
            Stmt::Assign(Assign {
                span: SourceSpan::join(&target.span(), &value.span()),
                target,
                value,
            })
        }

    rule return_stmt() -> Stmt =
        kw:tok(TokenType::Return) value:expression()? newline() {
            Stmt::Return(ReturnStmt {
                value,
                span: kw.span.clone(),
            })
        }

    rule break_stmt() -> Stmt =
        kw:tok(TokenType::Break) newline() { Stmt::Break(kw.span.clone()) }

    rule pass_stmt() -> Stmt =
        kw:tok(TokenType::Pass) newline() { Stmt::Pass(kw.span.clone()) }

    rule expr_stmt() -> Stmt =
        value:expression() newline() {
            Stmt::Expr(ExprStmt {
                span: value.span(),
                value,
            })
        }

    // Expression grammar, lowest precedence first.

    rule expression() -> Expr =
        then:or_test() rest:(tok(TokenType::If) c:or_test() tok(TokenType::Else) o:expression() { (c, o) })? {
            match rest {
                Some((condition, orelse)) => Expr::IfExp {
                    span: SourceSpan::join(&then.span(), &orelse.span()),
                    condition: Box::new(condition),
                    then: Box::new(then),
                    orelse: Box::new(orelse),
                },
                None => then,
            }
        }

    rule or_test() -> Expr =
        first:and_test() rest:(tok(TokenType::Or) e:and_test() { e })* {
            rest.into_iter().fold(first, |left, right| Expr::BoolOp {
                span: SourceSpan::join(&left.span(), &right.span()),
                op: BoolOpKind::Or,
                left: Box::new(left),
                right: Box::new(right),
            })
        }

    rule and_test() -> Expr =
        first:not_test() rest:(tok(TokenType::And) e:not_test() { e })* {
            rest.into_iter().fold(first, |left, right| Expr::BoolOp {
                span: SourceSpan::join(&left.span(), &right.span()),
                op: BoolOpKind::And,
                left: Box::new(left),
                right: Box::new(right),
            })
        }

    rule not_test() -> Expr =
        kw:tok(TokenType::Not) operand:not_test() {
            Expr::UnaryOp {
                span: SourceSpan::join(&kw.span, &operand.span()),
                op: UnaryOpKind::Not,
                operand: Box::new(operand),
            }
        }
        / comparison()

    // A single comparison; chained comparisons are not in the subset.
    rule comparison() -> Expr =
        left:bit_or() rest:(op:compare_op() right:bit_or() { (op, right) })? {
            match rest {
                Some((op, right)) => Expr::Compare {
                    span: SourceSpan::join(&left.span(), &right.span()),
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                None => left,
            }
        }

    rule compare_op() -> CompareOpKind =
        tok(TokenType::EqualEqual) { CompareOpKind::Eq }
        / tok(TokenType::NotEqual) { CompareOpKind::Ne }
        / tok(TokenType::LessEqual) { CompareOpKind::Le }
        / tok(TokenType::GreaterEqual) { CompareOpKind::Ge }
        / tok(TokenType::Less) { CompareOpKind::Lt }
        / tok(TokenType::Greater) { CompareOpKind::Gt }

    rule bit_or() -> Expr =
        first:bit_xor() rest:(tok(TokenType::Pipe) e:bit_xor() { e })* {
            fold_binary(first, rest, BinOpKind::BitOr)
        }

    rule bit_xor() -> Expr =
        first:bit_and() rest:(tok(TokenType::Caret) e:bit_and() { e })* {
            fold_binary(first, rest, BinOpKind::BitXor)
        }

    rule bit_and() -> Expr =
        first:shift() rest:(tok(TokenType::Ampersand) e:shift() { e })* {
            fold_binary(first, rest, BinOpKind::BitAnd)
        }

    rule shift() -> Expr =
        first:additive() rest:(op:shift_op() e:additive() { (op, e) })* {
            fold_binary_ops(first, rest)
        }

    rule shift_op() -> BinOpKind =
        tok(TokenType::ShiftLeft) { BinOpKind::Shl }
        / tok(TokenType::ShiftRight) { BinOpKind::Shr }

    rule additive() -> Expr =
        first:term() rest:(op:additive_op() e:term() { (op, e) })* {
            fold_binary_ops(first, rest)
        }

    rule additive_op() -> BinOpKind =
        tok(TokenType::Plus) { BinOpKind::Add }
        / tok(TokenType::Minus) { BinOpKind::Sub }

    rule term() -> Expr =
        first:factor() rest:(op:term_op() e:factor() { (op, e) })* {
            fold_binary_ops(first, rest)
        }

    rule term_op() -> BinOpKind =
        tok(TokenType::Star) { BinOpKind::Mul }
        / tok(TokenType::FloorDivide) { BinOpKind::FloorDiv }
        / tok(TokenType::Slash) { BinOpKind::Div }
        / tok(TokenType::Percent) { BinOpKind::Mod }

    rule factor() -> Expr =
        op_token:tok(TokenType::Minus) operand:factor() {
            Expr::UnaryOp {
                span: SourceSpan::join(&op_token.span, &operand.span()),
                op: UnaryOpKind::Neg,
                operand: Box::new(operand),
            }
        }
        / op_token:tok(TokenType::Tilde) operand:factor() {
            Expr::UnaryOp {
                span: SourceSpan::join(&op_token.span, &operand.span()),
                op: UnaryOpKind::Invert,
                operand: Box::new(operand),
            }
        }
        / power()

    rule power() -> Expr =
        base:postfix_expr() rest:(tok(TokenType::Power) e:factor() { e })? {
            match rest {
                Some(exponent) => Expr::BinOp {
                    span: SourceSpan::join(&base.span(), &exponent.span()),
                    op: BinOpKind::Pow,
                    left: Box::new(base),
                    right: Box::new(exponent),
                },
                None => base,
            }
        }

    rule postfix_expr() -> Expr =
        base:primary() trailers:trailer()* {?
            apply_trailers(base, trailers)
        }

    rule trailer() -> Trailer =
        tok(TokenType::Period) attr:tok(TokenType::Identifier) {
            Trailer::Attribute(attr.text.clone(), attr.span.clone())
        }
        / tok(TokenType::LeftParen) items:(argument() ** comma()) close:tok(TokenType::RightParen) {
            Trailer::Call(items, close.span.clone())
        }
        / tok(TokenType::LeftBracket) indices:(expression() ++ comma()) close:tok(TokenType::RightBracket) {
            Trailer::Subscript(indices, close.span.clone())
        }

    rule argument() -> Argument =
        name:tok(TokenType::Identifier) tok(TokenType::Assign) value:expression() {
            Argument::Named(name.text.clone(), value)
        }
        / value:expression() { Argument::Positional(value) }

    rule primary() -> Expr =
        super_logic()
        / token:tok(TokenType::SelfRef) { Expr::SelfRef { span: token.span.clone() } }
        / token:tok(TokenType::True) { Expr::Bool { value: true, span: token.span.clone() } }
        / token:tok(TokenType::False) { Expr::Bool { value: false, span: token.span.clone() } }
        / token:tok(TokenType::Float) {?
            parse_float(&token.text).map(|value| Expr::Float { value, span: token.span.clone() })
        }
        / token:tok(TokenType::Digits) {?
            parse_int(&token.text).map(|value| Expr::Int { value, span: token.span.clone() })
        }
        / token:tok(TokenType::StringLiteral) {
            Expr::Str {
                value: token.text[1..token.text.len() - 1].to_owned(),
                span: token.span.clone(),
            }
        }
        / token:tok(TokenType::Identifier) {
            Expr::Name { id: token.text.clone(), span: token.span.clone() }
        }
        / tok(TokenType::LeftParen) e:expression() tok(TokenType::RightParen) { e }

    // The only accepted use of `super` is the exact call chain
    // `super().logic()`.
    rule super_logic() -> Expr =
        kw:tok(TokenType::Super) tok(TokenType::LeftParen) tok(TokenType::RightParen)
        tok(TokenType::Period) id_eq("logic") tok(TokenType::LeftParen) close:tok(TokenType::RightParen) {
            Expr::SuperLogic { span: SourceSpan::join(&kw.span, &close.span) }
        }
  }
}

fn fold_binary(first: Expr, rest: Vec<Expr>, op: BinOpKind) -> Expr {
    rest.into_iter().fold(first, |left, right| Expr::BinOp {
        span: SourceSpan::join(&left.span(), &right.span()),
        op,
        left: Box::new(left),
        right: Box::new(right),
    })
}

fn fold_binary_ops(first: Expr, rest: Vec<(BinOpKind, Expr)>) -> Expr {
    rest.into_iter().fold(first, |left, (op, right)| Expr::BinOp {
        span: SourceSpan::join(&left.span(), &right.span()),
        op,
        left: Box::new(left),
        right: Box::new(right),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Suite {
        parse_logic(source, &FileId::default()).expect("source parses")
    }

    #[test]
    fn parse_when_self_assignment_then_assign_statement() {
        let suite = parse("self.running = self.cmd\n");
        assert_eq!(suite.len(), 1);
        match &suite[0] {
            Stmt::Assign(assign) => {
                assert!(matches!(assign.target, Expr::Attribute { .. }));
                assert!(matches!(assign.value, Expr::Attribute { .. }));
            }
            other => panic!("unexpected statement {:?}", other),
        }
    }

    #[test]
    fn parse_when_if_elif_else_then_branches_collected() {
        let suite = parse(
            "if self.a:\n    self.x = 1\nelif self.b:\n    self.x = 2\nelse:\n    self.x = 3\n",
        );
        match &suite[0] {
            Stmt::If(if_stmt) => {
                assert_eq!(if_stmt.branches.len(), 2);
                assert_eq!(if_stmt.orelse.len(), 1);
            }
            other => panic!("unexpected statement {:?}", other),
        }
    }

    #[test]
    fn parse_when_boolean_operators_then_short_circuit_tree() {
        let suite = parse("self.out = self.a and not self.b or self.c\n");
        match &suite[0] {
            Stmt::Assign(assign) => match &assign.value {
                // `or` binds loosest
                Expr::BoolOp { op, .. } => assert_eq!(*op, BoolOpKind::Or),
                other => panic!("unexpected value {:?}", other),
            },
            other => panic!("unexpected statement {:?}", other),
        }
    }

    #[test]
    fn parse_when_arithmetic_then_precedence_applied() {
        let suite = parse("self.x = 1 + 2 * 3\n");
        match &suite[0] {
            Stmt::Assign(assign) => match &assign.value {
                Expr::BinOp { op, right, .. } => {
                    assert_eq!(*op, BinOpKind::Add);
                    assert!(matches!(right.as_ref(), Expr::BinOp { op: BinOpKind::Mul, .. }));
                }
                other => panic!("unexpected value {:?}", other),
            },
            other => panic!("unexpected statement {:?}", other),
        }
    }

    #[test]
    fn parse_when_call_with_kwargs_then_split() {
        let suite = parse("self.running = delayed(self.cmd, seconds=5)\n");
        match &suite[0] {
            Stmt::Assign(assign) => match &assign.value {
                Expr::Call { args, kwargs, .. } => {
                    assert_eq!(args.len(), 1);
                    assert_eq!(kwargs.len(), 1);
                    assert_eq!(kwargs[0].0, "seconds");
                }
                other => panic!("unexpected value {:?}", other),
            },
            other => panic!("unexpected statement {:?}", other),
        }
    }

    #[test]
    fn parse_when_positional_after_keyword_then_rejected() {
        let result = parse_logic("self.x = f(a=1, 2)\n", &FileId::default());
        assert!(result.is_err());
    }

    #[test]
    fn parse_when_for_over_range_then_for_statement() {
        let suite = parse("for i in range(0, 10):\n    self.total = self.total + i\n");
        match &suite[0] {
            Stmt::For(for_stmt) => {
                assert_eq!(for_stmt.var, "i");
                assert_eq!(for_stmt.iterable.call_name(), Some("range"));
            }
            other => panic!("unexpected statement {:?}", other),
        }
    }

    #[test]
    fn parse_when_match_with_patterns_then_arms_collected() {
        let suite = parse(
            "match self.mode:\n    case 0:\n        self.x = 0\n    case 1 | 2:\n        self.x = 1\n    case Mode.Auto:\n        self.x = 2\n    case _:\n        self.x = 3\n",
        );
        match &suite[0] {
            Stmt::Match(match_stmt) => {
                assert_eq!(match_stmt.arms.len(), 4);
                assert_eq!(match_stmt.arms[1].patterns.len(), 2);
                assert!(matches!(
                    match_stmt.arms[2].patterns[0],
                    Pattern::Variant { .. }
                ));
                assert!(matches!(match_stmt.arms[3].patterns[0], Pattern::Wildcard));
            }
            other => panic!("unexpected statement {:?}", other),
        }
    }

    #[test]
    fn parse_when_super_logic_then_marker_expression() {
        let suite = parse("super().logic()\nself.extra = True\n");
        match &suite[0] {
            Stmt::Expr(expr_stmt) => {
                assert!(matches!(expr_stmt.value, Expr::SuperLogic { .. }))
            }
            other => panic!("unexpected statement {:?}", other),
        }
    }

    #[test]
    fn parse_when_super_used_otherwise_then_rejected() {
        assert!(parse_logic("super().reset()\n", &FileId::default()).is_err());
    }

    #[test]
    fn parse_when_ternary_then_if_expression() {
        let suite = parse("self.x = 1 if self.fast else 2\n");
        match &suite[0] {
            Stmt::Assign(assign) => assert!(matches!(assign.value, Expr::IfExp { .. })),
            other => panic!("unexpected statement {:?}", other),
        }
    }

    #[test]
    fn parse_when_subscript_chain_then_nested() {
        let suite = parse("self.grid[1, 2] = self.row[0]\n");
        match &suite[0] {
            Stmt::Assign(assign) => match &assign.target {
                Expr::Subscript { indices, .. } => assert_eq!(indices.len(), 2),
                other => panic!("unexpected target {:?}", other),
            },
            other => panic!("unexpected statement {:?}", other),
        }
    }

    #[test]
    fn parse_when_chained_comparison_then_rejected() {
        assert!(parse_logic("self.x = 1 < self.a < 10\n", &FileId::default()).is_err());
    }

    #[test]
    fn parse_when_expression_entry_then_single_expression() {
        let expr = parse_expression("self.level > 10.5", &FileId::default()).unwrap();
        assert!(matches!(expr, Expr::Compare { .. }));
    }

    #[test]
    fn parse_when_same_source_twice_then_equal_trees() {
        let source = "if self.cmd:\n    self.running = True\n";
        let first = parse_logic(source, &FileId::default()).unwrap();
        let second = parse_logic(source, &FileId::default()).unwrap();
        assert_eq!(first, second);
    }
}
