//! Provides definitions of tokens of the authoring language.
use core::fmt;
use std::fmt::Debug;

use logos::Logos;
use plx_dsl::core::SourceSpan;

/// The occurrence of a token in an input.
#[derive(Debug, Clone)]
pub struct Token {
    /// What this token represents.
    pub token_type: TokenType,
    /// The location in the source text where the token begins.
    pub span: SourceSpan,

    /// The line where the token begins (0-indexed).
    pub line: usize,

    /// The column where the token begins (0-indexed).
    pub col: usize,

    /// The text that this token matched.
    pub text: String,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.token_type {
            TokenType::Newline => f.write_str("\\n"),
            TokenType::Indent => f.write_str("<indent>"),
            TokenType::Dedent => f.write_str("<dedent>"),
            _ => f.write_str(&self.text),
        }
    }
}

#[derive(Clone, Logos, Debug, PartialEq, Eq)]
pub enum TokenType {
    #[regex(r"\r\n")]
    #[regex(r"\n")]
    Newline,

    #[regex(r"[ \t]+")]
    Whitespace,

    #[regex(r"#[^\n]*")]
    Comment,

    // Block structure markers synthesized by the token transform from
    // leading whitespace. The byte patterns never occur in authored
    // source text.
    #[token("\u{0001}")]
    Indent,
    #[token("\u{0002}")]
    Dedent,

    // Grouping and other markers
    #[token("(")]
    LeftParen,
    #[token(")")]
    RightParen,
    #[token("[")]
    LeftBracket,
    #[token("]")]
    RightBracket,
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,
    #[token(".")]
    Period,

    // Keywords. These are case sensitive in the authoring language.
    #[token("if")]
    If,
    #[token("elif")]
    Elif,
    #[token("else")]
    Else,
    #[token("while")]
    While,
    #[token("for")]
    For,
    #[token("in")]
    In,
    #[token("match")]
    Match,
    #[token("case")]
    Case,
    #[token("return")]
    Return,
    #[token("break")]
    Break,
    #[token("pass")]
    Pass,
    #[token("and")]
    And,
    #[token("or")]
    Or,
    #[token("not")]
    Not,
    #[token("True")]
    True,
    #[token("False")]
    False,
    #[token("self")]
    SelfRef,
    #[token("super")]
    Super,

    // Lower priority than any keyword.
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", priority = 1)]
    Identifier,

    // Constants. Floats take precedence over a digit run followed by
    // a period token.
    #[regex(r"[0-9][0-9_]*\.[0-9][0-9_]*([eE][+-]?[0-9]+)?", priority = 3)]
    Float,
    #[regex(r"[0-9][0-9_]*")]
    Digits,
    #[regex(r"'[^'\n]*'")]
    #[regex(r#""[^"\n]*""#)]
    StringLiteral,

    // Operators. Multi-character operators take precedence by length.
    #[token("**")]
    Power,
    #[token("//")]
    FloorDivide,
    #[token("<<")]
    ShiftLeft,
    #[token(">>")]
    ShiftRight,
    #[token("==")]
    EqualEqual,
    #[token("!=")]
    NotEqual,
    #[token("<=")]
    LessEqual,
    #[token(">=")]
    GreaterEqual,
    #[token("<")]
    Less,
    #[token(">")]
    Greater,
    #[token("=")]
    Assign,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("&")]
    Ampersand,
    #[token("|")]
    Pipe,
    #[token("^")]
    Caret,
    #[token("~")]
    Tilde,
    #[token("_")]
    Underscore,
}

impl Token {
    /// Creates a synthetic token (indent/dedent/newline) positioned at
    /// an existing token.
    pub fn synthetic(token_type: TokenType, at: &Token) -> Token {
        Token {
            token_type,
            span: at.span.clone(),
            line: at.line,
            col: at.col,
            text: String::new(),
        }
    }
}
