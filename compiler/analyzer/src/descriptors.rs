//! Variable descriptors: the declaration-time records a POU builder
//! collects before materializing an interface.
//!
//! A descriptor is a lightweight record of role, type, optional
//! initial value and documentation. Descriptors are captured in
//! declaration order; materialization groups them by role into the
//! ordered interface blocks and discards the records.
use plx_dsl::common::{ConstantKind, Interface, TypeRef, VarDecl, VarRole};
use plx_dsl::core::{Id, Located, SourceSpan};
use plx_dsl::diagnostic::{Diagnostic, Label};
use plx_problems::Problem;

use crate::environment::assignable;
use crate::typecheck::constant_type;

/// A declaration-time variable record.
#[derive(Debug, Clone)]
pub struct VarSpec {
    pub role: VarRole,
    pub type_ref: TypeRef,
    pub initial: Option<ConstantKind>,
    pub description: String,
}

impl VarSpec {
    fn new(role: VarRole, type_ref: TypeRef) -> Self {
        Self {
            role,
            type_ref,
            initial: None,
            description: String::new(),
        }
    }

    pub fn with_initial(mut self, initial: ConstantKind) -> Self {
        self.initial = Some(initial);
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_owned();
        self
    }
}

/// Declares an input variable.
pub fn input_var(type_ref: TypeRef) -> VarSpec {
    VarSpec::new(VarRole::Input, type_ref)
}

/// Declares an output variable.
pub fn output_var(type_ref: TypeRef) -> VarSpec {
    VarSpec::new(VarRole::Output, type_ref)
}

/// Declares an in-out variable. In-out variables are references and
/// carry no initial value.
pub fn inout_var(type_ref: TypeRef) -> VarSpec {
    VarSpec::new(VarRole::InOut, type_ref)
}

/// Declares a static variable: state retained across scans.
pub fn static_var(type_ref: TypeRef) -> VarSpec {
    VarSpec::new(VarRole::Static, type_ref)
}

/// Declares a temp variable: reinitialized on every scan.
pub fn temp_var(type_ref: TypeRef) -> VarSpec {
    VarSpec::new(VarRole::Temp, type_ref)
}

/// Declares a constant.
pub fn constant_var(type_ref: TypeRef, initial: ConstantKind) -> VarSpec {
    VarSpec::new(VarRole::Constant, type_ref).with_initial(initial)
}

/// Groups descriptors (in declaration order) into interface blocks.
///
/// Rejects duplicate names and initial values that are not assignable
/// to the declared type.
pub fn materialize(specs: Vec<(String, VarSpec)>) -> Result<Interface, Vec<Diagnostic>> {
    let mut diagnostics = Vec::new();
    let mut interface = Interface::new();
    let mut seen: Vec<Id> = Vec::new();

    for (name, spec) in specs {
        let id = Id::from(&name);
        if seen.contains(&id) {
            diagnostics.push(
                Diagnostic::problem(
                    Problem::DuplicateName,
                    Label::span(id.span(), "Variable declaration"),
                )
                .with_context_id("variable", &id),
            );
            continue;
        }
        seen.push(id.clone());

        if let Some(initial) = &spec.initial {
            let literal_type = constant_type(initial);
            if let Some(literal_type) = literal_type {
                if !assignable(&literal_type, &spec.type_ref) {
                    diagnostics.push(
                        Diagnostic::problem(
                            Problem::TypeMismatch,
                            Label::span(SourceSpan::default(), "Initial value"),
                        )
                        .with_context_id("variable", &id)
                        .with_context("declared", &spec.type_ref.to_string())
                        .with_context("initial", &literal_type.to_string()),
                    );
                    continue;
                }
            }
        }

        let decl = VarDecl {
            name: id,
            type_ref: spec.type_ref,
            initial: spec.initial,
            description: spec.description,
        };
        interface.block_mut(spec.role).push(decl);
    }

    if diagnostics.is_empty() {
        Ok(interface)
    } else {
        Err(diagnostics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plx_dsl::time::DurationLiteral;

    #[test]
    fn materialize_when_roles_mixed_then_grouped_in_order() {
        let interface = materialize(vec![
            ("cmd".to_owned(), input_var(TypeRef::BOOL)),
            ("running".to_owned(), output_var(TypeRef::BOOL)),
            ("fault".to_owned(), output_var(TypeRef::BOOL)),
            ("count".to_owned(), static_var(TypeRef::INT)),
        ])
        .unwrap();

        assert_eq!(interface.inputs.len(), 1);
        assert_eq!(interface.outputs.len(), 2);
        assert_eq!(interface.outputs[0].name, Id::from("running"));
        assert_eq!(interface.statics.len(), 1);
    }

    #[test]
    fn materialize_when_duplicate_name_then_error() {
        let err = materialize(vec![
            ("cmd".to_owned(), input_var(TypeRef::BOOL)),
            ("cmd".to_owned(), output_var(TypeRef::BOOL)),
        ])
        .unwrap_err();
        assert!(err[0].is_problem(Problem::DuplicateName));
    }

    #[test]
    fn materialize_when_initial_not_assignable_then_type_mismatch() {
        let err = materialize(vec![(
            "preset".to_owned(),
            static_var(TypeRef::BOOL).with_initial(ConstantKind::integer(5)),
        )])
        .unwrap_err();
        assert!(err[0].is_problem(Problem::TypeMismatch));
    }

    #[test]
    fn materialize_when_duration_initial_on_time_then_accepted() {
        let interface = materialize(vec![(
            "preset".to_owned(),
            static_var(TypeRef::TIME)
                .with_initial(ConstantKind::duration(DurationLiteral::seconds(3))),
        )])
        .unwrap();
        assert!(interface.statics[0].initial.is_some());
    }
}
