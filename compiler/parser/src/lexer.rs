//! Lexer for the authoring language. The lexer transforms source text
//! into tokens; tokens are the input to the indentation transform and
//! then the parser.
use logos::Logos;
use plx_dsl::{
    core::{FileId, SourceSpan},
    diagnostic::{Diagnostic, Label},
};
use plx_problems::Problem;

use crate::token::{Token, TokenType};

/// Tokenize an authored logic body.
///
/// Returns tokens and diagnostics rather than a result so that parsing
/// can continue past bad tokens and report errors with full context.
pub fn tokenize(source: &str, file_id: &FileId) -> (Vec<Token>, Vec<Diagnostic>) {
    let mut tokens = Vec::new();
    let mut diagnostics = Vec::new();
    let mut lexer = TokenType::lexer(source);

    let mut line: usize = 0;
    let mut col: usize = 0;

    while let Some(token) = lexer.next() {
        match token {
            Ok(token_type) => {
                tokens.push(Token {
                    token_type: token_type.clone(),
                    span: SourceSpan::range(lexer.span().start, lexer.span().end)
                        .with_file_id(file_id),
                    line,
                    col,
                    text: lexer.slice().into(),
                });

                match token_type {
                    TokenType::Newline => {
                        line += 1;
                        col = 0;
                    }
                    _ => col += lexer.span().len(),
                }
            }
            Err(_) => {
                let span = SourceSpan::range(lexer.span().start, lexer.span().end)
                    .with_file_id(file_id);
                diagnostics.push(Diagnostic::problem(
                    Problem::UnexpectedToken,
                    Label::span(
                        span,
                        format!(
                            "The text '{}' is not valid at line {} column {}",
                            lexer.slice(),
                            // 1-indexed for display
                            line + 1,
                            col + 1,
                        ),
                    ),
                ));
                col += lexer.span().len();
            }
        }
    }

    (tokens, diagnostics)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn types(source: &str) -> Vec<TokenType> {
        let (tokens, diagnostics) = tokenize(source, &FileId::default());
        assert!(diagnostics.is_empty(), "{:?}", diagnostics);
        tokens.into_iter().map(|t| t.token_type).collect()
    }

    #[test]
    fn tokenize_when_assignment_then_expected_tokens() {
        assert_eq!(
            types("self.running = True"),
            vec![
                TokenType::SelfRef,
                TokenType::Period,
                TokenType::Identifier,
                TokenType::Whitespace,
                TokenType::Assign,
                TokenType::Whitespace,
                TokenType::True,
            ]
        );
    }

    #[test]
    fn tokenize_when_keyword_prefix_then_identifier() {
        // "iffy" starts with the keyword "if" but is an identifier.
        assert_eq!(types("iffy"), vec![TokenType::Identifier]);
    }

    #[test]
    fn tokenize_when_float_then_single_token() {
        assert_eq!(types("3.25"), vec![TokenType::Float]);
        assert_eq!(
            types("1.0e-3"),
            vec![TokenType::Float],
        );
    }

    #[test]
    fn tokenize_when_comparison_operators_then_longest_match() {
        assert_eq!(
            types("a<=b"),
            vec![
                TokenType::Identifier,
                TokenType::LessEqual,
                TokenType::Identifier
            ]
        );
    }

    #[test]
    fn tokenize_when_comment_then_comment_token() {
        assert_eq!(
            types("pass  # startup only\n"),
            vec![
                TokenType::Pass,
                TokenType::Whitespace,
                TokenType::Comment,
                TokenType::Newline
            ]
        );
    }

    #[test]
    fn tokenize_when_invalid_character_then_diagnostic() {
        let (_, diagnostics) = tokenize("a = 1 @ 2", &FileId::default());
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].is_problem(Problem::UnexpectedToken));
    }

    #[test]
    fn tokenize_when_lines_then_line_and_column_tracked() {
        let (tokens, _) = tokenize("a = 1\nb = 2", &FileId::default());
        let b_token = tokens
            .iter()
            .find(|t| t.text == "b")
            .expect("b token present");
        assert_eq!(b_token.line, 1);
        assert_eq!(b_token.col, 0);
    }
}
