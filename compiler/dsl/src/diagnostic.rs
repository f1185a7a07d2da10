//! Provides the definition of diagnostics: the errors and warnings
//! associated with compilation and simulation.
//!
//! There exist crates that make this easy, but the same diagnostic must
//! serve programmatic assertions in tests, aggregation across analysis
//! passes, and rendering by callers, and no one crate covers all three.
use plx_problems::Problem;
use std::collections::HashSet;

use crate::core::{FileId, Id, Located, SourceSpan};

/// A position marker that has both line and offset information.
#[derive(Debug, Clone)]
pub struct QualifiedPosition {
    /// Line (1-indexed)
    pub line: usize,

    /// Column (1-indexed)
    pub column: usize,

    /// Byte offset from start of input (0-indexed)
    pub offset: usize,
}

impl QualifiedPosition {
    pub fn new(line: usize, column: usize, offset: usize) -> Self {
        Self {
            line,
            column,
            offset,
        }
    }
}

/// A position marker that only has byte offsets in an input.
#[derive(Debug, Clone)]
pub struct Location {
    /// Byte offset of the start (0-indexed)
    pub start: usize,
    /// Byte offset of the end (0-indexed)
    pub end: usize,
}

/// A label that refers to some range in an input, with a message
/// describing that range.
///
/// Normally this indicates the location of an error or warning along
/// with text describing what is at that position.
#[derive(Debug, Clone)]
pub struct Label {
    /// The position of the label.
    pub location: Location,

    /// Identifier for the input.
    pub file_id: FileId,

    /// A message describing this label.
    pub message: String,
}

impl Label {
    pub fn span(span: SourceSpan, message: impl Into<String>) -> Self {
        Self {
            location: Location {
                start: span.start,
                end: span.end,
            },
            file_id: span.file_id,
            message: message.into(),
        }
    }

    pub fn qualified(
        file_id: FileId,
        position: QualifiedPosition,
        message: impl Into<String>,
    ) -> Self {
        Self {
            location: Location {
                start: position.offset,
                end: position.offset,
            },
            file_id,
            message: format!("{} (line {} column {})", message.into(), position.line, position.column),
        }
    }

    /// A label that refers to an input in its entirety rather than a
    /// particular position.
    pub fn file(file_id: impl Into<FileId>, message: impl Into<String>) -> Self {
        Self {
            location: Location { start: 0, end: 0 },
            file_id: file_id.into(),
            message: message.into(),
        }
    }
}

/// The severity of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

/// A diagnostic. Diagnostics have a code that is indicative of the
/// category, a primary location and a possibly non-empty set of
/// secondary locations.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// A stable value describing the type of diagnostic.
    pub code: String,

    description: String,

    pub severity: Severity,

    /// The primary position associated with the diagnostic.
    pub primary: Label,

    /// Additional context appended to the constant description.
    pub described: Vec<String>,

    /// Related positions for the diagnostic.
    pub secondary: Vec<Label>,
}

impl Diagnostic {
    /// Creates an error diagnostic from the problem code with the
    /// specified primary label.
    pub fn problem(problem: Problem, primary: Label) -> Self {
        Self {
            code: problem.code().to_string(),
            description: problem.message().to_string(),
            severity: Severity::Error,
            primary,
            described: vec![],
            secondary: vec![],
        }
    }

    /// Creates a warning diagnostic from the problem code.
    pub fn warning(problem: Problem, primary: Label) -> Self {
        Self {
            severity: Severity::Warning,
            ..Diagnostic::problem(problem, primary)
        }
    }

    /// Tests whether this diagnostic carries the given problem code.
    pub fn is_problem(&self, problem: Problem) -> bool {
        self.code == problem.code()
    }

    /// Adds context to the problem description. This forms part of the
    /// main description and does not need to relate to a position.
    pub fn with_context(mut self, description: &str, item: &str) -> Self {
        self.described.push(format!("{}={}", description, item));
        self
    }

    /// Adds context to the problem description from an identifier.
    pub fn with_context_id(mut self, description: &str, item: &Id) -> Self {
        self.described.push(format!("{}={}", description, item));
        self
    }

    pub fn with_secondary(mut self, label: Label) -> Self {
        self.secondary.push(label);
        self
    }

    /// Returns the full description for the diagnostic, including any
    /// added context.
    pub fn description(&self) -> String {
        if self.described.is_empty() {
            self.description.clone()
        } else {
            format!("{} ({})", self.description, self.described.join(", "))
        }
    }

    pub fn file_ids(&self) -> HashSet<&FileId> {
        let mut file_ids = HashSet::new();
        file_ids.insert(&self.primary.file_id);

        for secondary_item in self.secondary.iter() {
            file_ids.insert(&secondary_item.file_id);
        }

        file_ids
    }
}

impl Located for Diagnostic {
    fn span(&self) -> SourceSpan {
        SourceSpan {
            start: self.primary.location.start,
            end: self.primary.location.end,
            file_id: self.primary.file_id.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostic_when_context_added_then_description_includes_it() {
        let diagnostic = Diagnostic::problem(
            Problem::DuplicateName,
            Label::span(SourceSpan::default(), "declaration"),
        )
        .with_context("name", "motor");

        assert!(diagnostic.description().contains("name=motor"));
        assert_eq!(diagnostic.code, "P0007");
    }

    #[test]
    fn diagnostic_when_warning_then_severity_warning() {
        let diagnostic = Diagnostic::warning(
            Problem::CaseNotExhaustive,
            Label::span(SourceSpan::default(), "case"),
        );
        assert_eq!(diagnostic.severity, Severity::Warning);
    }
}
