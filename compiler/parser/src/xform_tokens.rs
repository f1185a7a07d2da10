//! Token transform that turns leading whitespace into block structure.
//!
//! The authoring language is indentation sensitive. The lexer emits
//! raw whitespace tokens; this transform measures the leading
//! whitespace of each line and synthesizes `Indent`/`Dedent` tokens,
//! then drops whitespace, comments and blank lines so that the parser
//! only sees significant tokens.
use plx_dsl::{
    core::FileId,
    diagnostic::{Diagnostic, Label},
};
use plx_problems::Problem;

use crate::token::{Token, TokenType};

/// Converts a raw token stream into a block-structured token stream.
///
/// The output ends with a `Newline` (inserted when missing) followed
/// by one `Dedent` per open block.
pub fn apply(input: Vec<Token>, _file_id: &FileId) -> Result<Vec<Token>, Vec<Diagnostic>> {
    let mut output: Vec<Token> = Vec::new();
    let mut diagnostics: Vec<Diagnostic> = Vec::new();
    let mut indent_stack: Vec<usize> = vec![0];

    let lines = split_lines(input);

    for line in &lines {
        let (indent_width, significant) = measure(line);

        // Blank lines and comment-only lines do not affect the block
        // structure.
        if significant.is_empty() {
            continue;
        }

        let first = significant[0];
        let current = *indent_stack.last().expect("indent stack is never empty");

        if indent_width > current {
            indent_stack.push(indent_width);
            output.push(Token::synthetic(TokenType::Indent, first));
        } else if indent_width < current {
            while *indent_stack.last().expect("indent stack is never empty") > indent_width {
                indent_stack.pop();
                output.push(Token::synthetic(TokenType::Dedent, first));
            }
            if *indent_stack.last().expect("indent stack is never empty") != indent_width {
                diagnostics.push(
                    Diagnostic::problem(
                        Problem::SyntaxError,
                        Label::span(first.span.clone(), "Indentation"),
                    )
                    .with_context("line", &(first.line + 1).to_string()),
                );
            }
        }

        for token in &significant {
            output.push((*token).clone());
        }

        // Each line of statements ends with an explicit newline.
        let last = significant.last().expect("line has tokens");
        output.push(Token::synthetic(TokenType::Newline, last));
    }

    // Close all open blocks.
    if let Some(last) = output.last().cloned() {
        while indent_stack.len() > 1 {
            indent_stack.pop();
            output.push(Token::synthetic(TokenType::Dedent, &last));
        }
    }

    if diagnostics.is_empty() {
        Ok(output)
    } else {
        Err(diagnostics)
    }
}

/// Splits the raw stream into lines at newline tokens. The newline
/// tokens themselves are dropped.
fn split_lines(input: Vec<Token>) -> Vec<Vec<Token>> {
    let mut lines: Vec<Vec<Token>> = Vec::new();
    let mut current: Vec<Token> = Vec::new();
    for token in input {
        if token.token_type == TokenType::Newline {
            lines.push(std::mem::take(&mut current));
        } else {
            current.push(token);
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Measures the indentation of a line and returns the significant
/// (non-whitespace, non-comment) tokens.
fn measure(line: &[Token]) -> (usize, Vec<&Token>) {
    let mut indent_width = 0;
    let mut seen_significant = false;
    let mut significant = Vec::new();

    for token in line {
        match token.token_type {
            TokenType::Whitespace => {
                if !seen_significant {
                    indent_width += token.text.chars().count();
                }
            }
            TokenType::Comment => {}
            _ => {
                seen_significant = true;
                significant.push(token);
            }
        }
    }

    (indent_width, significant)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    fn transform(source: &str) -> Vec<TokenType> {
        let file_id = FileId::default();
        let (tokens, diagnostics) = tokenize(source, &file_id);
        assert!(diagnostics.is_empty(), "{:?}", diagnostics);
        apply(tokens, &file_id)
            .unwrap()
            .into_iter()
            .map(|t| t.token_type)
            .collect()
    }

    #[test]
    fn apply_when_flat_lines_then_no_indents() {
        let types = transform("a = 1\nb = 2\n");
        assert!(!types.contains(&TokenType::Indent));
        assert_eq!(
            types.iter().filter(|t| **t == TokenType::Newline).count(),
            2
        );
    }

    #[test]
    fn apply_when_block_then_indent_and_dedent_balanced() {
        let types = transform("if a:\n    b = 1\nc = 2\n");
        let indents = types.iter().filter(|t| **t == TokenType::Indent).count();
        let dedents = types.iter().filter(|t| **t == TokenType::Dedent).count();
        assert_eq!(indents, 1);
        assert_eq!(dedents, 1);
    }

    #[test]
    fn apply_when_blank_and_comment_lines_then_ignored() {
        let types = transform("a = 1\n\n# note\n    \nb = 2\n");
        assert!(!types.contains(&TokenType::Indent));
        assert!(!types.contains(&TokenType::Comment));
        assert_eq!(
            types.iter().filter(|t| **t == TokenType::Newline).count(),
            2
        );
    }

    #[test]
    fn apply_when_input_misses_final_newline_then_blocks_closed() {
        let types = transform("if a:\n    b = 1");
        assert_eq!(types.last(), Some(&TokenType::Dedent));
    }

    #[test]
    fn apply_when_nested_blocks_then_all_dedents_emitted() {
        let types = transform("if a:\n    if b:\n        c = 1\n");
        let dedents = types.iter().filter(|t| **t == TokenType::Dedent).count();
        assert_eq!(dedents, 2);
    }

    #[test]
    fn apply_when_inconsistent_dedent_then_error() {
        let file_id = FileId::default();
        let (tokens, _) = tokenize("if a:\n        b = 1\n    c = 2\n", &file_id);
        let result = apply(tokens, &file_id);
        assert!(result.is_err());
    }
}
