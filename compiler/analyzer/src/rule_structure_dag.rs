//! Semantic rule that checks that structure containment is acyclic: a
//! structure must not contain an instance of itself, directly or
//! through other structures or aliases.
//!
//! ## Passes
//!
//! ```ignore
//! Recipe { amount: REAL }
//! Batch { recipe: Recipe }
//! ```
//!
//! ## Fails
//!
//! ```ignore
//! Node { next: Node }
//! ```
use plx_dsl::common::{TypeDefinitionKind, TypeRef};
use plx_dsl::core::Located;
use plx_dsl::diagnostic::{Diagnostic, Label};
use plx_dsl::project::Project;
use plx_problems::Problem;

use crate::result::SemanticResult;
use crate::symbol_graph::SymbolGraph;

pub fn apply(project: &Project) -> SemanticResult {
    let mut graph: SymbolGraph<()> = SymbolGraph::new();

    for data_type in &project.data_types {
        let from = graph.add_node(data_type.type_name(), ());
        match data_type {
            TypeDefinitionKind::Structure(def) => {
                for member in &def.members {
                    for named in named_types(&member.type_ref) {
                        let to = graph.add_node(&named, ());
                        graph.add_edge(from, to);
                    }
                }
            }
            TypeDefinitionKind::Alias(def) => {
                for named in named_types(&def.target) {
                    let to = graph.add_node(&named, ());
                    graph.add_edge(from, to);
                }
            }
            _ => {}
        }
    }

    if !graph.has_cycle() {
        return Ok(());
    }

    let diagnostics = graph
        .cyclic_names()
        .into_iter()
        .map(|name| {
            Diagnostic::problem(
                Problem::StructureCycle,
                Label::span(name.span(), "Data type"),
            )
            .with_context("type", &name.to_string())
        })
        .collect();
    Err(diagnostics)
}

/// The named types a reference depends on for storage. Pointers and
/// references break the containment cycle, so they contribute nothing.
fn named_types(type_ref: &TypeRef) -> Vec<plx_dsl::common::TypeName> {
    match type_ref {
        TypeRef::Named(name) => vec![name.clone()],
        TypeRef::Array(spec) => named_types(&spec.element),
        _ => vec![],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plx_dsl::common::{StructureDefinition, StructureMember};

    fn structure(name: &str, member: &str, member_type: TypeRef) -> TypeDefinitionKind {
        TypeDefinitionKind::Structure(
            StructureDefinition::new(name, vec![StructureMember::new(member, member_type)])
                .unwrap(),
        )
    }

    #[test]
    fn apply_when_nested_structures_then_ok() {
        let project = Project::new("cell")
            .with_data_type(structure("Recipe", "amount", TypeRef::REAL))
            .with_data_type(structure("Batch", "recipe", TypeRef::named("Recipe")));
        assert!(apply(&project).is_ok());
    }

    #[test]
    fn apply_when_self_containing_then_cycle() {
        let project =
            Project::new("cell").with_data_type(structure("Node", "next", TypeRef::named("Node")));
        let errors = apply(&project).unwrap_err();
        assert!(errors[0].is_problem(Problem::StructureCycle));
    }

    #[test]
    fn apply_when_mutual_containment_then_cycle() {
        let project = Project::new("cell")
            .with_data_type(structure("A", "b", TypeRef::named("B")))
            .with_data_type(structure("B", "a", TypeRef::named("A")));
        let errors = apply(&project).unwrap_err();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn apply_when_pointer_back_reference_then_ok() {
        let project = Project::new("cell").with_data_type(structure(
            "Node",
            "next",
            TypeRef::Pointer(Box::new(TypeRef::named("Node"))),
        ));
        assert!(apply(&project).is_ok());
    }
}
