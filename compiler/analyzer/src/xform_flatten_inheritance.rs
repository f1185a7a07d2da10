//! Inheritance flattening pass.
//!
//! Target vendors without EXTENDS receive POUs with the linearized
//! ancestor chain folded in: ancestor declaration blocks merge ahead
//! of the child's, and the parent-body marker (`super().logic()`)
//! inlines the parent's lowered body. Vendors with native EXTENDS skip
//! this pass; the IR retains the parent link.
use std::collections::HashMap;

use log::debug;

use plx_dsl::common::{BodyKind, Interface, Pou, VarRole};
use plx_dsl::core::{Id, Located};
use plx_dsl::diagnostic::{Diagnostic, Label};
use plx_dsl::project::Project;
use plx_dsl::textual::{CaseArm, IfBranch, StmtKind};
use plx_problems::Problem;

/// Flattens every function block inheritance chain in the project.
pub fn apply(project: Project) -> Result<Project, Vec<Diagnostic>> {
    let mut flattened: HashMap<Id, Pou> = HashMap::new();
    let by_name: HashMap<Id, &Pou> = project.pous.iter().map(|p| (p.name.clone(), p)).collect();

    let mut diagnostics = Vec::new();
    let mut result_pous = Vec::new();

    for pou in &project.pous {
        match flatten_into(pou, &by_name, &mut flattened, &mut Vec::new()) {
            Ok(flat) => result_pous.push(flat),
            Err(mut errors) => diagnostics.append(&mut errors),
        }
    }

    if !diagnostics.is_empty() {
        return Err(diagnostics);
    }

    Ok(Project {
        pous: result_pous,
        ..project
    })
}

/// Flattens a single POU against a registry of POUs. The registry must
/// contain every ancestor.
pub fn flatten_pou(pou: &Pou, registry: &[Pou]) -> Result<Pou, Vec<Diagnostic>> {
    let by_name: HashMap<Id, &Pou> = registry.iter().map(|p| (p.name.clone(), p)).collect();
    flatten_into(pou, &by_name, &mut HashMap::new(), &mut Vec::new())
}

fn flatten_into(
    pou: &Pou,
    by_name: &HashMap<Id, &Pou>,
    flattened: &mut HashMap<Id, Pou>,
    in_flight: &mut Vec<Id>,
) -> Result<Pou, Vec<Diagnostic>> {
    if let Some(done) = flattened.get(&pou.name) {
        return Ok(done.clone());
    }

    let parent_name = match &pou.parent {
        None => {
            flattened.insert(pou.name.clone(), pou.clone());
            return Ok(pou.clone());
        }
        Some(parent) => parent,
    };

    if in_flight.contains(&pou.name) {
        return Err(vec![Diagnostic::problem(
            Problem::InheritanceCycle,
            Label::span(pou.name.span(), "Function block"),
        )
        .with_context_id("function_block", &pou.name)]);
    }
    in_flight.push(pou.name.clone());

    let parent = by_name.get(&parent_name.name).ok_or_else(|| {
        vec![Diagnostic::problem(
            Problem::NameUnresolved,
            Label::span(parent_name.span(), "Parent function block"),
        )
        .with_context("parent", &parent_name.to_string())]
    })?;

    // Ancestors flatten first so that a chain of EXTENDS folds from
    // the root down.
    let parent = flatten_into(parent, by_name, flattened, in_flight)?;
    in_flight.pop();

    debug!("flattening {} into {}", parent.name, pou.name);

    let interface = merge_interfaces(&parent, pou)?;

    let parent_statements: Vec<StmtKind> = match &parent.body {
        BodyKind::Statements(statements) => statements.clone(),
        BodyKind::Empty => vec![],
        BodyKind::Chart(_) => {
            return Err(vec![Diagnostic::problem(
                Problem::NotRepresentable,
                Label::span(parent.name.span(), "Parent function block"),
            )
            .with_context("reason", "chart bodies cannot be inherited")])
        }
    };

    let body = match &pou.body {
        BodyKind::Statements(statements) => {
            BodyKind::Statements(inline_parent(statements, &parent_statements))
        }
        other => other.clone(),
    };

    let mut methods = parent.methods.clone();
    for method in &pou.methods {
        if !methods.iter().any(|m| m.name == method.name) {
            methods.push(method.clone());
        }
    }

    let flat = Pou {
        kind: pou.kind,
        name: pou.name.clone(),
        return_type: pou.return_type.clone(),
        parent: None,
        interface,
        body,
        methods,
    };
    flattened.insert(pou.name.clone(), flat.clone());
    Ok(flat)
}

/// Merges the parent's declaration blocks ahead of the child's. A
/// child may not redeclare a parent variable.
fn merge_interfaces(parent: &Pou, child: &Pou) -> Result<Interface, Vec<Diagnostic>> {
    let mut diagnostics = Vec::new();
    let mut interface = parent.interface.clone();

    for role in [
        VarRole::Input,
        VarRole::Output,
        VarRole::InOut,
        VarRole::Static,
        VarRole::Temp,
        VarRole::Constant,
    ] {
        for decl in child.interface.block(role) {
            if let Some((_, existing)) = parent.interface.find(&decl.name) {
                diagnostics.push(
                    Diagnostic::problem(
                        Problem::DuplicateName,
                        Label::span(decl.name.span(), "Inherited declaration"),
                    )
                    .with_context_id("variable", &decl.name)
                    .with_context("parent", parent.name.original())
                    .with_secondary(Label::span(existing.name.span(), "Declared by the parent")),
                );
                continue;
            }
            interface.block_mut(role).push(decl.clone());
        }
    }

    if diagnostics.is_empty() {
        Ok(interface)
    } else {
        Err(diagnostics)
    }
}

/// Replaces each parent-body marker with the parent's statements,
/// recursing into compound statements.
fn inline_parent(statements: &[StmtKind], parent_body: &[StmtKind]) -> Vec<StmtKind> {
    let mut result = Vec::new();
    for statement in statements {
        match statement {
            StmtKind::SuperCall => result.extend(parent_body.iter().cloned()),
            StmtKind::If(if_stmt) => {
                let branches = if_stmt
                    .branches
                    .iter()
                    .map(|branch| IfBranch {
                        condition: branch.condition.clone(),
                        body: inline_parent(&branch.body, parent_body),
                    })
                    .collect();
                result.push(StmtKind::If(plx_dsl::textual::If {
                    branches,
                    else_body: inline_parent(&if_stmt.else_body, parent_body),
                }));
            }
            StmtKind::Case(case) => {
                let arms = case
                    .arms
                    .iter()
                    .map(|arm| CaseArm {
                        selectors: arm.selectors.clone(),
                        body: inline_parent(&arm.body, parent_body),
                    })
                    .collect();
                result.push(StmtKind::Case(plx_dsl::textual::Case {
                    selector: case.selector.clone(),
                    arms,
                    else_body: inline_parent(&case.else_body, parent_body),
                }));
            }
            StmtKind::For(for_stmt) => {
                result.push(StmtKind::For(plx_dsl::textual::For {
                    control: for_stmt.control.clone(),
                    from: for_stmt.from.clone(),
                    to: for_stmt.to.clone(),
                    step: for_stmt.step.clone(),
                    body: inline_parent(&for_stmt.body, parent_body),
                }));
            }
            StmtKind::While(while_stmt) => {
                result.push(StmtKind::While(plx_dsl::textual::While {
                    condition: while_stmt.condition.clone(),
                    body: inline_parent(&while_stmt.body, parent_body),
                }));
            }
            StmtKind::Repeat(repeat) => {
                result.push(StmtKind::Repeat(plx_dsl::textual::Repeat {
                    body: inline_parent(&repeat.body, parent_body),
                    until: repeat.until.clone(),
                }));
            }
            other => result.push(other.clone()),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use plx_dsl::common::VarDecl;
    use plx_dsl::textual::ExprKind;

    fn parent_pou() -> Pou {
        let mut interface = Interface::new();
        interface.inputs.push(VarDecl::bool("cmd"));
        interface.outputs.push(VarDecl::bool("running"));
        Pou::function_block("Base")
            .with_interface(interface)
            .with_body(vec![StmtKind::simple_assignment(
                "running",
                ExprKind::named_variable("cmd"),
            )])
    }

    fn child_pou() -> Pou {
        let mut interface = Interface::new();
        interface.outputs.push(VarDecl::bool("indicator"));
        Pou::function_block("Derived")
            .with_parent("Base")
            .with_interface(interface)
            .with_body(vec![
                StmtKind::SuperCall,
                StmtKind::simple_assignment("indicator", ExprKind::named_variable("running")),
            ])
    }

    #[test]
    fn apply_when_child_extends_parent_then_body_concatenated() {
        let project = Project::new("cell")
            .with_pou(parent_pou())
            .with_pou(child_pou());

        let flattened = apply(project).unwrap();
        let derived = flattened.find_pou(&Id::from("Derived")).unwrap();

        assert!(derived.parent.is_none());
        // Parent declarations merge ahead of the child's.
        assert_eq!(derived.interface.outputs[0].name, Id::from("running"));
        assert_eq!(derived.interface.outputs[1].name, Id::from("indicator"));

        let body = derived.body.statements().unwrap();
        assert_eq!(body.len(), 2);
        assert_eq!(body[0], parent_pou().body.statements().unwrap()[0]);
    }

    #[test]
    fn apply_when_grandparent_chain_then_fully_flattened() {
        let mut grandchild_interface = Interface::new();
        grandchild_interface.outputs.push(VarDecl::bool("late"));
        let grandchild = Pou::function_block("Grandchild")
            .with_parent("Derived")
            .with_interface(grandchild_interface)
            .with_body(vec![
                StmtKind::SuperCall,
                StmtKind::simple_assignment("late", ExprKind::const_bool(true)),
            ]);

        let project = Project::new("cell")
            .with_pou(parent_pou())
            .with_pou(child_pou())
            .with_pou(grandchild);

        let flattened = apply(project).unwrap();
        let pou = flattened.find_pou(&Id::from("Grandchild")).unwrap();
        let body = pou.body.statements().unwrap();
        // Base, Derived's addition, Grandchild's addition.
        assert_eq!(body.len(), 3);
        assert!(pou.interface.find(&Id::from("cmd")).is_some());
    }

    #[test]
    fn apply_when_cycle_then_inheritance_cycle() {
        let a = Pou::function_block("A").with_parent("B");
        let b = Pou::function_block("B").with_parent("A");
        let errors = apply(Project::new("cell").with_pou(a).with_pou(b)).unwrap_err();
        assert!(errors
            .iter()
            .any(|d| d.is_problem(Problem::InheritanceCycle)));
    }

    #[test]
    fn apply_when_child_shadows_parent_then_duplicate_name() {
        let mut child_interface = Interface::new();
        child_interface.outputs.push(VarDecl::bool("running"));
        let child = Pou::function_block("Derived")
            .with_parent("Base")
            .with_interface(child_interface)
            .with_body(vec![StmtKind::SuperCall]);

        let errors = apply(
            Project::new("cell")
                .with_pou(parent_pou())
                .with_pou(child),
        )
        .unwrap_err();
        assert!(errors[0].is_problem(Problem::DuplicateName));
    }

    #[test]
    fn apply_when_missing_parent_then_unresolved() {
        let orphan = Pou::function_block("Orphan").with_parent("Ghost");
        let errors = apply(Project::new("cell").with_pou(orphan)).unwrap_err();
        assert!(errors[0].is_problem(Problem::NameUnresolved));
    }

    #[test]
    fn apply_when_no_inheritance_then_identity() {
        let project = Project::new("cell").with_pou(parent_pou());
        let flattened = apply(project.clone()).unwrap();
        assert_eq!(flattened, project);
    }

    #[test]
    fn apply_when_super_inside_if_then_inlined_in_branch() {
        let child = Pou::function_block("Derived")
            .with_parent("Base")
            .with_body(vec![StmtKind::if_then(
                ExprKind::named_variable("cmd"),
                vec![StmtKind::SuperCall],
            )]);

        let flattened = apply(
            Project::new("cell")
                .with_pou(parent_pou())
                .with_pou(child),
        )
        .unwrap();
        let pou = flattened.find_pou(&Id::from("Derived")).unwrap();
        match &pou.body.statements().unwrap()[0] {
            StmtKind::If(if_stmt) => {
                assert!(matches!(if_stmt.branches[0].body[0], StmtKind::Assignment(_)));
            }
            other => panic!("unexpected statement {:?}", other),
        }
    }
}
