//! Semantic rule that type-checks every POU body: assignment
//! compatibility, Boolean contexts, case selectors, invocation inputs
//! and loop bounds.
//!
//! Enum case selectors that do not cover every variant produce a
//! warning, not an error.
use plx_dsl::common::{BodyKind, Pou, PouKind};
use plx_dsl::project::Project;

use crate::environment::TypeEnvironment;
use crate::result::SemanticResult;
use crate::typecheck::{Scope, StatementChecker};

pub fn apply(project: &Project, env: &TypeEnvironment) -> SemanticResult {
    let mut diagnostics = Vec::new();

    for pou in &project.pous {
        diagnostics.extend(check_pou(pou, env));
    }

    if diagnostics.is_empty() {
        Ok(())
    } else {
        Err(diagnostics)
    }
}

fn check_pou(pou: &Pou, env: &TypeEnvironment) -> Vec<plx_dsl::diagnostic::Diagnostic> {
    let scope = match (&pou.kind, &pou.return_type) {
        (PouKind::Function, Some(return_type)) => {
            Scope::for_function(&pou.interface, &pou.name, return_type)
        }
        _ => Scope::from_interface(&pou.interface),
    };

    let mut checker = StatementChecker::new(scope, env, pou.kind);
    match &pou.body {
        BodyKind::Statements(statements) => checker.check_body(statements),
        BodyKind::Chart(chart) => {
            for step in &chart.steps {
                checker.check_body(&step.actions);
            }
            for transition in &chart.transitions {
                checker.expect_transition(&transition.condition);
            }
        }
        BodyKind::Empty => {}
    }

    for method in &pou.methods {
        // Methods see the enclosing block's variables in addition to
        // their own; the method's name is its writable result.
        let mut method_scope = Scope::from_interface(&pou.interface);
        if let Some(return_type) = &method.return_type {
            method_scope.insert(
                method.name.clone(),
                plx_dsl::common::VarRole::Output,
                return_type.clone(),
            );
        }
        for (role, decl) in method.interface.iter() {
            method_scope.insert(decl.name.clone(), role, decl.type_ref.clone());
        }
        let mut method_checker = StatementChecker::new(method_scope, env, PouKind::Function);
        method_checker.check_body(&method.body);
        checker.diagnostics.extend(method_checker.diagnostics);
    }

    checker.diagnostics
}

#[cfg(test)]
mod tests {
    use super::*;
    use plx_dsl::common::{Interface, TypeRef, VarDecl};
    use plx_dsl::textual::{ExprKind, StmtKind};
    use plx_problems::Problem;

    #[test]
    fn apply_when_well_typed_then_ok() {
        let mut interface = Interface::new();
        interface.inputs.push(VarDecl::bool("cmd"));
        interface.outputs.push(VarDecl::bool("running"));
        let project = Project::new("cell").with_pou(
            Pou::function_block("Motor")
                .with_interface(interface)
                .with_body(vec![StmtKind::simple_assignment(
                    "running",
                    ExprKind::named_variable("cmd"),
                )]),
        );
        let env = TypeEnvironment::new().with_pous(&project.pous);
        assert!(apply(&project, &env).is_ok());
    }

    #[test]
    fn apply_when_bool_assigned_integer_then_mismatch() {
        let mut interface = Interface::new();
        interface.outputs.push(VarDecl::bool("running"));
        let project = Project::new("cell").with_pou(
            Pou::function_block("Motor")
                .with_interface(interface)
                .with_body(vec![StmtKind::simple_assignment(
                    "running",
                    ExprKind::const_integer(1),
                )]),
        );
        let env = TypeEnvironment::new().with_pous(&project.pous);
        let errors = apply(&project, &env).unwrap_err();
        assert!(errors[0].is_problem(Problem::TypeMismatch));
    }

    #[test]
    fn apply_when_chart_transition_not_boolean_then_mismatch() {
        use plx_dsl::sfc::{Chart, Step, Transition};
        let mut interface = Interface::new();
        interface.statics.push(VarDecl::int("count"));

        let chart = Chart::new(
            vec![Step::initial("idle", vec![]), Step::new("run", vec![])],
            vec![
                Transition::new("idle", "run", ExprKind::named_variable("count")),
                Transition::new("run", "idle", ExprKind::const_bool(true)),
            ],
        )
        .unwrap();

        let project = Project::new("cell").with_pou(
            Pou::function_block("Batch")
                .with_interface(interface)
                .with_chart(chart),
        );
        let env = TypeEnvironment::new().with_pous(&project.pous);
        let errors = apply(&project, &env).unwrap_err();
        assert!(errors[0].is_problem(Problem::TypeMismatch));
    }
}
