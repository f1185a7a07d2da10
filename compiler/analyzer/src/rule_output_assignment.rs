//! Semantic rule that warns when an output variable is not assigned
//! on every executed control path of a statement body.
//!
//! An output that keeps its previous value between scans is usually an
//! authoring mistake on a cyclic controller, but it can be deliberate,
//! so this rule only warns.
//!
//! ## Passes
//!
//! ```ignore
//! running := cmd;
//! ```
//!
//! ## Warns
//!
//! ```ignore
//! IF cmd THEN
//!     running := TRUE;
//! END_IF;
//! ```
use plx_dsl::common::{BodyKind, Pou};
use plx_dsl::core::{Id, Located};
use plx_dsl::diagnostic::{Diagnostic, Label};
use plx_dsl::project::Project;
use plx_dsl::textual::StmtKind;
use plx_problems::Problem;

use crate::result::SemanticResult;

pub fn apply(project: &Project) -> SemanticResult {
    let mut diagnostics = Vec::new();

    for pou in &project.pous {
        // Chart steps assign outputs conditionally per step, so only
        // statement bodies are analyzed.
        let statements = match &pou.body {
            BodyKind::Statements(statements) => statements,
            _ => continue,
        };
        for output in &pou.interface.outputs {
            if !assigns_on_all_paths(statements, &output.name) {
                diagnostics.push(warning(pou, &output.name));
            }
        }
    }

    if diagnostics.is_empty() {
        Ok(())
    } else {
        Err(diagnostics)
    }
}

fn warning(pou: &Pou, output: &Id) -> Diagnostic {
    Diagnostic::warning(
        Problem::OutputNotAssigned,
        Label::span(output.span(), "Output variable"),
    )
    .with_context_id("pou", &pou.name)
    .with_context_id("output", output)
}

/// True when every control path through the statements assigns the
/// variable.
fn assigns_on_all_paths(statements: &[StmtKind], name: &Id) -> bool {
    statements
        .iter()
        .any(|statement| statement_assigns(statement, name))
}

fn statement_assigns(statement: &StmtKind, name: &Id) -> bool {
    match statement {
        StmtKind::Assignment(assignment) => assignment.target.root() == Some(name),
        StmtKind::If(if_stmt) => {
            // Without an else, the fall-through path assigns nothing.
            if if_stmt.else_body.is_empty() {
                return false;
            }
            if_stmt
                .branches
                .iter()
                .all(|branch| assigns_on_all_paths(&branch.body, name))
                && assigns_on_all_paths(&if_stmt.else_body, name)
        }
        StmtKind::Case(case) => {
            if case.else_body.is_empty() {
                return false;
            }
            case.arms
                .iter()
                .all(|arm| assigns_on_all_paths(&arm.body, name))
                && assigns_on_all_paths(&case.else_body, name)
        }
        // A repeat body runs at least once; while and for bodies may
        // never run.
        StmtKind::Repeat(repeat) => assigns_on_all_paths(&repeat.body, name),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plx_dsl::common::{Interface, VarDecl};
    use plx_dsl::textual::ExprKind;

    fn motor(body: Vec<StmtKind>) -> Project {
        let mut interface = Interface::new();
        interface.inputs.push(VarDecl::bool("cmd"));
        interface.outputs.push(VarDecl::bool("running"));
        Project::new("cell").with_pou(
            Pou::function_block("Motor")
                .with_interface(interface)
                .with_body(body),
        )
    }

    #[test]
    fn apply_when_output_always_assigned_then_ok() {
        let project = motor(vec![StmtKind::simple_assignment(
            "running",
            ExprKind::named_variable("cmd"),
        )]);
        assert!(apply(&project).is_ok());
    }

    #[test]
    fn apply_when_output_assigned_in_one_branch_then_warning() {
        let project = motor(vec![StmtKind::if_then(
            ExprKind::named_variable("cmd"),
            vec![StmtKind::simple_assignment(
                "running",
                ExprKind::const_bool(true),
            )],
        )]);
        let warnings = apply(&project).unwrap_err();
        assert!(warnings[0].is_problem(Problem::OutputNotAssigned));
        assert_eq!(
            warnings[0].severity,
            plx_dsl::diagnostic::Severity::Warning
        );
    }

    #[test]
    fn apply_when_output_assigned_in_both_branches_then_ok() {
        let project = motor(vec![StmtKind::if_then_else(
            ExprKind::named_variable("cmd"),
            vec![StmtKind::simple_assignment(
                "running",
                ExprKind::const_bool(true),
            )],
            vec![StmtKind::simple_assignment(
                "running",
                ExprKind::const_bool(false),
            )],
        )]);
        assert!(apply(&project).is_ok());
    }
}
