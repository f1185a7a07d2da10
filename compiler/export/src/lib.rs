//! Vendor lowering contracts.
//!
//! Each vendor toolchain consumes a validated project IR through the
//! same contract: a target descriptor says which schema the emitter
//! produces and whether the toolchain understands EXTENDS natively,
//! and `prepare` brings a project into the form the target accepts
//! (flattening inheritance where required, rejecting constructs the
//! target cannot represent). The XML serializers behind each schema
//! are external collaborators; the Structured Text renderer in
//! [`st`] produces the vendor-neutral body text they embed.

pub mod st;

use plx_analyzer::flatten;
use plx_dsl::common::{Pou, TypeRef, VarDecl};
use plx_dsl::core::Located;
use plx_dsl::diagnostic::{Diagnostic, Label};
use plx_dsl::project::Project;
use plx_problems::Problem;

/// The vendor toolchains plx can lower to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VendorKind {
    /// Allen-Bradley RSLogix / Studio 5000.
    RockwellL5x,
    /// Siemens TIA Portal.
    SiemensSimaticMl,
    /// Beckhoff TwinCAT.
    BeckhoffTcPou,
}

/// Descriptor of a vendor target's on-disk contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VendorTarget {
    pub kind: VendorKind,
    /// Identifier of the published schema the emitter writes.
    pub schema: &'static str,
    pub file_extension: &'static str,
    /// Whether the toolchain understands function block inheritance.
    /// Targets without native EXTENDS receive flattened POUs.
    pub native_extends: bool,
    /// Whether the toolchain accepts pointer-typed interface
    /// variables.
    pub pointers_supported: bool,
}

impl VendorTarget {
    pub fn rockwell_l5x() -> Self {
        Self {
            kind: VendorKind::RockwellL5x,
            schema: "RSLogix5000Content",
            file_extension: "L5X",
            native_extends: false,
            pointers_supported: false,
        }
    }

    pub fn siemens_simatic_ml() -> Self {
        Self {
            kind: VendorKind::SiemensSimaticMl,
            schema: "SW.Blocks.CompileUnit",
            file_extension: "xml",
            native_extends: false,
            pointers_supported: true,
        }
    }

    pub fn beckhoff_tc_pou() -> Self {
        Self {
            kind: VendorKind::BeckhoffTcPou,
            schema: "TcPlcObject",
            file_extension: "TcPOU",
            native_extends: true,
            pointers_supported: true,
        }
    }

    /// Brings a validated project into the form this target accepts.
    ///
    /// The mapping is lossy only for attributes orthogonal to
    /// semantics; behavioral constructs either map or the preparation
    /// rejects the project.
    pub fn prepare(&self, project: Project) -> Result<Project, Vec<Diagnostic>> {
        log::debug!("preparing project for {}", self.schema);
        let project = if self.native_extends {
            project
        } else {
            flatten(project)?
        };

        let mut diagnostics = Vec::new();
        if !self.pointers_supported {
            for pou in &project.pous {
                for (_, decl) in pou.interface.iter() {
                    check_pointer_free(decl, self, &mut diagnostics);
                }
            }
        }

        if diagnostics.is_empty() {
            Ok(project)
        } else {
            Err(diagnostics)
        }
    }
}

fn check_pointer_free(decl: &VarDecl, target: &VendorTarget, diagnostics: &mut Vec<Diagnostic>) {
    if contains_pointer(&decl.type_ref) {
        diagnostics.push(
            Diagnostic::problem(
                Problem::NotRepresentable,
                Label::span(decl.name.span(), "Variable declaration"),
            )
            .with_context_id("variable", &decl.name)
            .with_context("target", target.schema),
        );
    }
}

fn contains_pointer(type_ref: &TypeRef) -> bool {
    match type_ref {
        TypeRef::Pointer(_) | TypeRef::Reference(_) => true,
        TypeRef::Array(spec) => contains_pointer(&spec.element),
        _ => false,
    }
}

/// Contract every vendor emitter implements: consume a prepared
/// project, produce the document body for the target's schema.
pub trait VendorEmitter {
    fn target(&self) -> VendorTarget;

    /// Emits the document content for one POU. Implementations embed
    /// the Structured Text body produced by [`st::render_pou`] into
    /// the vendor's schema.
    fn emit_pou(&self, pou: &Pou) -> Result<String, Vec<Diagnostic>>;

    /// Emits the full project document set, keyed by file name.
    fn emit_project(&self, project: &Project) -> Result<Vec<(String, String)>, Vec<Diagnostic>> {
        let prepared = self.target().prepare(project.clone())?;
        let mut documents = Vec::new();
        for pou in &prepared.pous {
            let content = self.emit_pou(pou)?;
            documents.push((
                format!("{}.{}", pou.name, self.target().file_extension),
                content,
            ));
        }
        Ok(documents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plx_dsl::common::Interface;
    use plx_dsl::core::Id;
    use plx_dsl::textual::StmtKind;

    fn inheriting_project() -> Project {
        let mut parent_interface = Interface::new();
        parent_interface.inputs.push(VarDecl::bool("cmd"));
        let parent = Pou::function_block("Base")
            .with_interface(parent_interface)
            .with_body(vec![]);

        let child = Pou::function_block("Derived")
            .with_parent("Base")
            .with_body(vec![StmtKind::SuperCall]);

        Project::new("cell").with_pou(parent).with_pou(child)
    }

    #[test]
    fn prepare_when_l5x_then_inheritance_flattened() {
        let prepared = VendorTarget::rockwell_l5x()
            .prepare(inheriting_project())
            .unwrap();
        let derived = prepared.find_pou(&Id::from("Derived")).unwrap();
        assert!(derived.parent.is_none());
        assert!(derived.interface.find(&Id::from("cmd")).is_some());
    }

    #[test]
    fn prepare_when_beckhoff_then_parent_link_retained() {
        let prepared = VendorTarget::beckhoff_tc_pou()
            .prepare(inheriting_project())
            .unwrap();
        let derived = prepared.find_pou(&Id::from("Derived")).unwrap();
        assert!(derived.parent.is_some());
    }

    #[test]
    fn prepare_when_l5x_with_pointer_then_rejected() {
        let mut interface = Interface::new();
        interface.statics.push(VarDecl::new(
            "head",
            TypeRef::Pointer(Box::new(TypeRef::INT)),
        ));
        let project = Project::new("cell")
            .with_pou(Pou::function_block("List").with_interface(interface));

        let errors = VendorTarget::rockwell_l5x().prepare(project).unwrap_err();
        assert!(errors[0].is_problem(Problem::NotRepresentable));
    }

    struct TextEmitter;

    impl VendorEmitter for TextEmitter {
        fn target(&self) -> VendorTarget {
            VendorTarget::beckhoff_tc_pou()
        }

        fn emit_pou(&self, pou: &Pou) -> Result<String, Vec<Diagnostic>> {
            st::render_pou(pou)
        }
    }

    #[test]
    fn emit_project_when_text_emitter_then_one_document_per_pou() {
        let documents = TextEmitter.emit_project(&inheriting_project()).unwrap();
        assert_eq!(documents.len(), 2);
        assert_eq!(documents[0].0, "Base.TcPOU");
        assert!(documents[1].1.contains("EXTENDS Base"));
    }
}
