//! Project assembly as individual stages (to enable testing).
//!
//! Assembly validates the cross-references of a composed project and
//! returns the fully-checked project IR, or the aggregate batch of
//! every violation found. Assembly does not short-circuit on the first
//! failing rule.
use log::debug;

use plx_dsl::diagnostic::{Diagnostic, Severity};
use plx_dsl::project::Project;

use crate::environment::TypeEnvironment;
use crate::{
    rule_inheritance_dag, rule_output_assignment, rule_structure_dag, rule_task_pous_exist,
    rule_type_check, rule_type_refs_resolve, rule_unique_names,
};

/// A validated project together with the warnings analysis produced.
#[derive(Debug, Clone)]
pub struct Assembled {
    pub project: Project,
    pub warnings: Vec<Diagnostic>,
}

/// Validates a composed project.
///
/// Every rule runs even when an earlier rule failed, so the returned
/// batch lists all violations at once.
pub fn assemble(project: Project) -> Result<Assembled, Vec<Diagnostic>> {
    let mut diagnostics: Vec<Diagnostic> = Vec::new();

    {
        let env = TypeEnvironment::new()
            .with_data_types(&project.data_types)
            .with_pous(&project.pous);

        let rules: [(&str, crate::result::SemanticResult); 7] = [
            ("unique_names", rule_unique_names::apply(&project)),
            ("task_pous_exist", rule_task_pous_exist::apply(&project)),
            (
                "type_refs_resolve",
                rule_type_refs_resolve::apply(&project, &env),
            ),
            ("structure_dag", rule_structure_dag::apply(&project)),
            ("inheritance_dag", rule_inheritance_dag::apply(&project)),
            ("type_check", rule_type_check::apply(&project, &env)),
            ("output_assignment", rule_output_assignment::apply(&project)),
        ];

        for (name, result) in rules {
            match result {
                Ok(()) => debug!("rule {} passed", name),
                Err(mut errors) => {
                    debug!("rule {} reported {} diagnostic(s)", name, errors.len());
                    diagnostics.append(&mut errors);
                }
            }
        }
    }

    let (errors, warnings): (Vec<Diagnostic>, Vec<Diagnostic>) = diagnostics
        .into_iter()
        .partition(|d| d.severity == Severity::Error);

    if errors.is_empty() {
        Ok(Assembled { project, warnings })
    } else {
        // Warnings ride along with the failure so callers can render
        // the full picture.
        let mut all = errors;
        all.extend(warnings);
        Err(all)
    }
}
