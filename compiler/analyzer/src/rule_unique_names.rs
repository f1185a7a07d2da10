//! Semantic rule that checks name uniqueness within each project
//! namespace: POUs, data types, global blocks and tasks.
//!
//! ## Passes
//!
//! A project with POUs `Motor` and `Valve`.
//!
//! ## Fails
//!
//! A project with two POUs named `Motor`, or a POU `Motor` and a data
//! type `MOTOR`.
use std::collections::HashMap;

use plx_dsl::core::{Id, Located};
use plx_dsl::diagnostic::{Diagnostic, Label};
use plx_dsl::project::Project;
use plx_problems::Problem;

use crate::result::SemanticResult;

pub fn apply(project: &Project) -> SemanticResult {
    let mut diagnostics = Vec::new();

    // POUs and data types share a type namespace: an instance
    // declaration `x : Motor` must resolve to exactly one definition.
    let mut type_names: HashMap<&Id, &'static str> = HashMap::new();
    for pou in &project.pous {
        check(&mut type_names, &pou.name, "POU", &mut diagnostics);
    }
    for data_type in &project.data_types {
        check(
            &mut type_names,
            &data_type.type_name().name,
            "data type",
            &mut diagnostics,
        );
    }

    let mut global_names: HashMap<&Id, &'static str> = HashMap::new();
    for global in &project.globals {
        check(&mut global_names, &global.name, "global block", &mut diagnostics);
    }

    let mut task_names: HashMap<&Id, &'static str> = HashMap::new();
    for task in &project.tasks {
        check(&mut task_names, &task.name, "task", &mut diagnostics);
    }

    if diagnostics.is_empty() {
        Ok(())
    } else {
        Err(diagnostics)
    }
}

fn check<'a>(
    seen: &mut HashMap<&'a Id, &'static str>,
    name: &'a Id,
    kind: &'static str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match seen.get(name) {
        Some(first_kind) => diagnostics.push(
            Diagnostic::problem(Problem::DuplicateName, Label::span(name.span(), kind))
                .with_context_id("name", name)
                .with_context("first declared as", first_kind),
        ),
        None => {
            seen.insert(name, kind);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plx_dsl::common::Pou;

    #[test]
    fn apply_when_unique_names_then_ok() {
        let project = Project::new("cell")
            .with_pou(Pou::program("Line"))
            .with_pou(Pou::function_block("Motor"));
        assert!(apply(&project).is_ok());
    }

    #[test]
    fn apply_when_two_pous_same_name_then_duplicate() {
        let project = Project::new("cell")
            .with_pou(Pou::program("Line"))
            .with_pou(Pou::function_block("line"));
        let errors = apply(&project).unwrap_err();
        assert!(errors[0].is_problem(Problem::DuplicateName));
    }

    #[test]
    fn apply_when_pou_and_data_type_collide_then_duplicate() {
        use plx_dsl::common::{EnumVariantDecl, EnumerationDefinition, TypeDefinitionKind};
        let project = Project::new("cell")
            .with_pou(Pou::function_block("Mode"))
            .with_data_type(TypeDefinitionKind::Enumeration(
                EnumerationDefinition::new("Mode", vec![EnumVariantDecl::new("Off", 0)]).unwrap(),
            ));
        assert!(apply(&project).is_err());
    }
}
