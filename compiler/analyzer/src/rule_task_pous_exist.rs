//! Semantic rule that checks that every POU a task schedules exists
//! and is a program.
//!
//! ## Passes
//!
//! A task scheduling the program `Line`, with `Line` in the project.
//!
//! ## Fails
//!
//! A task scheduling `Ghost` when no POU named `Ghost` exists, or a
//! task scheduling a function block directly.
use plx_dsl::common::PouKind;
use plx_dsl::core::Located;
use plx_dsl::diagnostic::{Diagnostic, Label};
use plx_dsl::project::Project;
use plx_problems::Problem;

use crate::result::SemanticResult;

pub fn apply(project: &Project) -> SemanticResult {
    let mut diagnostics = Vec::new();

    for task in &project.tasks {
        for pou_name in &task.pous {
            match project.find_pou(pou_name) {
                None => diagnostics.push(
                    Diagnostic::problem(
                        Problem::DanglingReference,
                        Label::span(pou_name.span(), "Task program"),
                    )
                    .with_context_id("task", &task.name)
                    .with_context_id("missing", pou_name),
                ),
                Some(pou) if pou.kind != PouKind::Program => diagnostics.push(
                    Diagnostic::problem(
                        Problem::InvalidSchedule,
                        Label::span(pou_name.span(), "Task program"),
                    )
                    .with_context_id("task", &task.name)
                    .with_context_id("pou", pou_name)
                    .with_context("kind", &pou.kind.to_string()),
                ),
                Some(_) => {}
            }
        }
    }

    if diagnostics.is_empty() {
        Ok(())
    } else {
        Err(diagnostics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plx_dsl::common::Pou;
    use plx_dsl::core::Id;
    use plx_dsl::project::Task;
    use plx_dsl::time::DurationLiteral;

    #[test]
    fn apply_when_program_exists_then_ok() {
        let project = Project::new("cell").with_pou(Pou::program("Line")).with_task(
            Task::periodic("main", DurationLiteral::milliseconds(10), vec![Id::from("Line")])
                .unwrap(),
        );
        assert!(apply(&project).is_ok());
    }

    #[test]
    fn apply_when_missing_pou_then_dangling_reference() {
        let project = Project::new("cell").with_task(
            Task::periodic("main", DurationLiteral::milliseconds(10), vec![Id::from("Ghost")])
                .unwrap(),
        );
        let errors = apply(&project).unwrap_err();
        assert!(errors[0].is_problem(Problem::DanglingReference));
        assert!(errors[0].description().contains("Ghost"));
    }

    #[test]
    fn apply_when_task_schedules_function_block_then_invalid() {
        let project = Project::new("cell")
            .with_pou(Pou::function_block("Motor"))
            .with_task(
                Task::periodic(
                    "main",
                    DurationLiteral::milliseconds(10),
                    vec![Id::from("Motor")],
                )
                .unwrap(),
            );
        let errors = apply(&project).unwrap_err();
        assert!(errors[0].is_problem(Problem::InvalidSchedule));
    }
}
