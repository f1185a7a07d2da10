//! Semantic rule that checks the function block inheritance graph:
//! parents exist, only function blocks extend, and the parent chain is
//! acyclic.
//!
//! ## Passes
//!
//! `Derived EXTENDS Base` with `Base` a function block.
//!
//! ## Fails
//!
//! `A EXTENDS B` together with `B EXTENDS A`.
use plx_dsl::common::{PouKind, TypeName};
use plx_dsl::core::Located;
use plx_dsl::diagnostic::{Diagnostic, Label};
use plx_dsl::project::Project;
use plx_problems::Problem;

use crate::result::SemanticResult;
use crate::symbol_graph::SymbolGraph;

pub fn apply(project: &Project) -> SemanticResult {
    let mut diagnostics = Vec::new();
    let mut graph: SymbolGraph<()> = SymbolGraph::new();

    for pou in &project.pous {
        let parent = match &pou.parent {
            Some(parent) => parent,
            None => continue,
        };

        if pou.kind != PouKind::FunctionBlock {
            diagnostics.push(
                Diagnostic::problem(
                    Problem::SyntaxUnsupported,
                    Label::span(pou.name.span(), "POU"),
                )
                .with_context_id("pou", &pou.name)
                .with_context("reason", "only function blocks may extend"),
            );
        }

        match project.find_pou(&parent.name) {
            None => diagnostics.push(
                Diagnostic::problem(
                    Problem::NameUnresolved,
                    Label::span(parent.span(), "Parent function block"),
                )
                .with_context_id("pou", &pou.name)
                .with_context("parent", &parent.to_string()),
            ),
            Some(parent_pou) if parent_pou.kind != PouKind::FunctionBlock => diagnostics.push(
                Diagnostic::problem(
                    Problem::SyntaxUnsupported,
                    Label::span(parent.span(), "Parent POU"),
                )
                .with_context("parent", &parent.to_string())
                .with_context("kind", &parent_pou.kind.to_string()),
            ),
            Some(_) => {}
        }

        let child = graph.add_node(&TypeName::from_id(&pou.name), ());
        let parent_node = graph.add_node(parent, ());
        graph.add_edge(child, parent_node);
    }

    if graph.has_cycle() {
        for name in graph.cyclic_names() {
            diagnostics.push(
                Diagnostic::problem(
                    Problem::InheritanceCycle,
                    Label::span(name.span(), "Function block"),
                )
                .with_context("function_block", &name.to_string()),
            );
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

    #[test]
    fn apply_when_single_inheritance_then_ok() {
        let project = Project::new("cell")
            .with_pou(Pou::function_block("Base"))
            .with_pou(Pou::function_block("Derived").with_parent("Base"));
        assert!(apply(&project).is_ok());
    }

    #[test]
    fn apply_when_mutual_inheritance_then_cycle() {
        let project = Project::new("cell")
            .with_pou(Pou::function_block("A").with_parent("B"))
            .with_pou(Pou::function_block("B").with_parent("A"));
        let errors = apply(&project).unwrap_err();
        assert!(errors.iter().any(|d| d.is_problem(Problem::InheritanceCycle)));
    }

    #[test]
    fn apply_when_self_inheritance_then_cycle() {
        let project =
            Project::new("cell").with_pou(Pou::function_block("A").with_parent("A"));
        let errors = apply(&project).unwrap_err();
        assert!(errors.iter().any(|d| d.is_problem(Problem::InheritanceCycle)));
    }

    #[test]
    fn apply_when_program_extends_then_rejected() {
        let project = Project::new("cell")
            .with_pou(Pou::function_block("Base"))
            .with_pou(Pou::program("Main").with_parent("Base"));
        let errors = apply(&project).unwrap_err();
        assert!(errors[0].is_problem(Problem::SyntaxUnsupported));
    }
}
