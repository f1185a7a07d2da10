//! Semantic rule that checks that every named type reference resolves
//! to a declared data type, a function block, or a standard block.
//!
//! ## Passes
//!
//! A POU instance variable `starter : TON`, or `mode : Mode` with the
//! enumeration `Mode` declared.
//!
//! ## Fails
//!
//! A declaration `x : Ghost` with no type named `Ghost`.
use plx_dsl::common::{TypeRef, VarDecl};
use plx_dsl::core::Located;
use plx_dsl::diagnostic::{Diagnostic, Label};
use plx_dsl::project::Project;
use plx_problems::Problem;

use crate::environment::TypeEnvironment;
use crate::result::SemanticResult;

pub fn apply(project: &Project, env: &TypeEnvironment) -> SemanticResult {
    let mut diagnostics = Vec::new();

    for pou in &project.pous {
        for (_, decl) in pou.interface.iter() {
            check_decl(decl, env, Problem::NameUnresolved, &mut diagnostics);
        }
        for method in &pou.methods {
            for (_, decl) in method.interface.iter() {
                check_decl(decl, env, Problem::NameUnresolved, &mut diagnostics);
            }
        }
        if let Some(parent) = &pou.parent {
            if env.resolve(parent).is_none() {
                diagnostics.push(
                    Diagnostic::problem(
                        Problem::NameUnresolved,
                        Label::span(parent.span(), "Parent function block"),
                    )
                    .with_context("parent", &parent.to_string()),
                );
            }
        }
    }

    for data_type in &project.data_types {
        use plx_dsl::common::TypeDefinitionKind;
        match data_type {
            TypeDefinitionKind::Structure(def) => {
                for member in &def.members {
                    check_type_ref(
                        &member.type_ref,
                        env,
                        Problem::NameUnresolved,
                        &mut diagnostics,
                    );
                }
            }
            TypeDefinitionKind::Alias(def) => {
                check_type_ref(&def.target, env, Problem::NameUnresolved, &mut diagnostics);
            }
            _ => {}
        }
    }

    // A global variable with an unresolvable type is a dangling
    // reference from the project's perspective.
    for global in &project.globals {
        for decl in &global.variables {
            check_decl(decl, env, Problem::DanglingReference, &mut diagnostics);
        }
    }

    if diagnostics.is_empty() {
        Ok(())
    } else {
        Err(diagnostics)
    }
}

fn check_decl(
    decl: &VarDecl,
    env: &TypeEnvironment,
    problem: Problem,
    diagnostics: &mut Vec<Diagnostic>,
) {
    check_type_ref(&decl.type_ref, env, problem, diagnostics);
}

fn check_type_ref(
    type_ref: &TypeRef,
    env: &TypeEnvironment,
    problem: Problem,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match type_ref {
        TypeRef::Named(name) => {
            if env.resolve(name).is_none() {
                diagnostics.push(
                    Diagnostic::problem(problem, Label::span(name.span(), "Type reference"))
                        .with_context("type", &name.to_string()),
                );
            }
        }
        TypeRef::Array(spec) => check_type_ref(&spec.element, env, problem, diagnostics),
        TypeRef::Pointer(target) | TypeRef::Reference(target) => {
            check_type_ref(target, env, problem, diagnostics)
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plx_dsl::common::{Interface, Pou};
    use plx_dsl::project::GlobalBlock;

    fn env_for<'a>(project: &'a Project) -> TypeEnvironment<'a> {
        TypeEnvironment::new()
            .with_data_types(&project.data_types)
            .with_pous(&project.pous)
    }

    #[test]
    fn apply_when_standard_fb_instance_then_ok() {
        let mut interface = Interface::new();
        interface.statics.push(VarDecl::instance("starter", "TON"));
        let project =
            Project::new("cell").with_pou(Pou::function_block("Motor").with_interface(interface));
        assert!(apply(&project, &env_for(&project)).is_ok());
    }

    #[test]
    fn apply_when_unknown_type_then_unresolved() {
        let mut interface = Interface::new();
        interface.statics.push(VarDecl::instance("x", "Ghost"));
        let project =
            Project::new("cell").with_pou(Pou::function_block("Motor").with_interface(interface));
        let errors = apply(&project, &env_for(&project)).unwrap_err();
        assert!(errors[0].is_problem(Problem::NameUnresolved));
    }

    #[test]
    fn apply_when_global_type_missing_then_dangling() {
        let project = Project::new("cell").with_global(GlobalBlock::new(
            "Station",
            vec![VarDecl::instance("recipe", "Recipe")],
        ));
        let errors = apply(&project, &env_for(&project)).unwrap_err();
        assert!(errors[0].is_problem(Problem::DanglingReference));
    }

    #[test]
    fn apply_when_array_of_unknown_element_then_unresolved() {
        use plx_dsl::common::Dimension;
        let mut interface = Interface::new();
        interface.statics.push(VarDecl::new(
            "queue",
            TypeRef::array(TypeRef::named("Ghost"), vec![Dimension::new(0, 7).unwrap()]),
        ));
        let project =
            Project::new("cell").with_pou(Pou::function_block("Motor").with_interface(interface));
        assert!(apply(&project, &env_for(&project)).is_err());
    }
}
