//! Persisted form of the project IR.
//!
//! The document is self-describing and versioned. Round-tripping a
//! validated project through the document form is the identity.
use serde::{Deserialize, Serialize};

use plx_problems::Problem;

use crate::core::SourceSpan;
use crate::diagnostic::{Diagnostic, Label};
use crate::project::Project;

/// Version of the persisted document format. Bump on any change that
/// is not forward compatible.
pub const FORMAT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct Document {
    format: String,
    version: u32,
    project: Project,
}

const FORMAT_NAME: &str = "plx-project";

/// Serializes a project into the versioned document form.
pub fn to_document(project: &Project) -> Result<String, Diagnostic> {
    let document = Document {
        format: FORMAT_NAME.to_owned(),
        version: FORMAT_VERSION,
        project: project.clone(),
    };
    serde_json::to_string_pretty(&document).map_err(|err| {
        Diagnostic::problem(
            Problem::InternalInvariant,
            Label::span(SourceSpan::default(), "Serializing project"),
        )
        .with_context("error", &err.to_string())
    })
}

/// Reads a project back from the document form.
pub fn from_document(text: &str) -> Result<Project, Diagnostic> {
    let document: Document = serde_json::from_str(text).map_err(|err| {
        Diagnostic::problem(
            Problem::InvalidLiteral,
            Label::span(SourceSpan::default(), "Reading project document"),
        )
        .with_context("error", &err.to_string())
    })?;

    if document.format != FORMAT_NAME || document.version != FORMAT_VERSION {
        return Err(Diagnostic::problem(
            Problem::InvalidLiteral,
            Label::span(SourceSpan::default(), "Reading project document"),
        )
        .with_context("format", &document.format)
        .with_context("version", &document.version.to_string()));
    }

    Ok(document.project)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::*;
    use crate::core::Id;
    use crate::project::Task;
    use crate::sfc::{Chart, Step, Transition};
    use crate::textual::{ExprKind, StmtKind};
    use crate::time::DurationLiteral;

    fn sample_project() -> Project {
        let mut interface = Interface::new();
        interface.inputs.push(VarDecl::bool("cmd"));
        interface
            .outputs
            .push(VarDecl::bool("running").with_description("motor is running"));
        interface.statics.push(
            VarDecl::new("preset", TypeRef::TIME)
                .with_initial(ConstantKind::duration(DurationLiteral::seconds(5))),
        );

        let chart = Chart::new(
            vec![Step::initial("idle", vec![]), Step::new("run", vec![])],
            vec![
                Transition::new("idle", "run", ExprKind::named_variable("cmd")),
                Transition::new("run", "idle", ExprKind::const_bool(false)),
            ],
        )
        .unwrap();

        Project::new("cell")
            .with_data_type(TypeDefinitionKind::Enumeration(
                EnumerationDefinition::new(
                    "Mode",
                    vec![
                        EnumVariantDecl::new("Off", 0),
                        EnumVariantDecl::new("Manual", 1),
                        EnumVariantDecl::new("Auto", 2),
                    ],
                )
                .unwrap(),
            ))
            .with_pou(
                Pou::program("Line")
                    .with_interface(interface)
                    .with_body(vec![StmtKind::simple_assignment(
                        "running",
                        ExprKind::named_variable("cmd"),
                    )]),
            )
            .with_pou(Pou::function_block("Sequence").with_chart(chart))
            .with_task(
                Task::periodic(
                    "main",
                    DurationLiteral::milliseconds(10),
                    vec![Id::from("Line")],
                )
                .unwrap(),
            )
    }

    #[test]
    fn persist_when_round_trip_then_identity() {
        let project = sample_project();
        let text = to_document(&project).unwrap();
        let restored = from_document(&text).unwrap();
        assert_eq!(restored, project);
    }

    #[test]
    fn persist_when_version_mismatch_then_rejected() {
        let project = sample_project();
        let text = to_document(&project).unwrap();
        let tampered = text.replace("\"version\": 1", "\"version\": 999");
        assert!(from_document(&tampered).is_err());
    }

    #[test]
    fn persist_when_not_a_document_then_rejected() {
        assert!(from_document("{\"bottles\": 99}").is_err());
    }
}
