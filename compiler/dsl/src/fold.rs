//! A set of traits and functions for folding all nodes in a project.
//!
//! Folding a project returns a new instance with changes defined by
//! the `fold_*` functions. The default behavior returns a copy of the
//! input. To fold, define a struct and implement the `Fold` trait,
//! then override the `fold_*` functions that should transform nodes.
use paste::paste;

use crate::common::*;
use crate::core::Id;
use crate::project::*;
use crate::sfc::*;
use crate::textual::*;
use crate::time::*;

/// Defines a `Fold` trait method that dispatches to the free function
/// which rebuilds the node from folded children:
///
/// ```ignore
/// fn fold_type_name(&mut self, node: TypeName) -> Result<TypeName, E> {
///     fold_type_name(self, node)
/// }
/// ```
macro_rules! dispatch {
    ($type_name:ident) => {
        paste! {
            fn [<fold_ $type_name:snake>](&mut self, node: $type_name) -> Result<$type_name, E> {
                [<fold_ $type_name:snake>](self, node)
            }
        }
    };
}

/// Defines a `Fold` trait method for a node with no IR children. The
/// node is returned unchanged.
macro_rules! leaf {
    ($type_name:ident) => {
        paste! {
            fn [<fold_ $type_name:snake>](&mut self, node: $type_name) -> Result<$type_name, E> {
                Ok(node)
            }
        }
    };
}

/// Defines the free function that rebuilds a node from its folded
/// children. Implementations call these to resume the default fold.
macro_rules! rebuilding_fn {
    ($type_name:ident) => {
        paste! {
            pub fn [<fold_ $type_name:snake>]<F: Fold<E> + ?Sized, E>(
                f: &mut F,
                node: $type_name,
            ) -> Result<$type_name, E> {
                node.traverse_fold(f)
            }
        }
    };
}

/// Transforms an IR tree into a new IR tree.
///
/// The IR is immutable; passes that change nodes (flattening, vendor
/// preparation) implement `Fold` and produce a new project.
pub trait Fold<E> {
    /// Folds a whole project.
    fn fold(&mut self, node: Project) -> Result<Project, E> {
        node.traverse_fold(self)
    }

    // Core
    leaf!(Id);

    // Types
    dispatch!(TypeName);
    dispatch!(TypeRef);
    dispatch!(ArraySpec);
    leaf!(StringSpec);
    leaf!(Dimension);

    // Constants
    dispatch!(ConstantKind);
    leaf!(BoolLiteral);
    leaf!(IntegerLiteral);
    leaf!(RealLiteral);
    leaf!(BitStringLiteral);
    leaf!(CharacterStringLiteral);
    leaf!(DurationLiteral);
    leaf!(DateLiteral);
    leaf!(TimeOfDayLiteral);
    leaf!(DateAndTimeLiteral);
    leaf!(EnumeratedValue);

    // User-defined types
    dispatch!(TypeDefinitionKind);
    dispatch!(StructureDefinition);
    dispatch!(StructureMember);
    dispatch!(EnumerationDefinition);
    dispatch!(EnumVariantDecl);
    dispatch!(AliasDefinition);
    dispatch!(SubrangeDefinition);

    // Declarations
    dispatch!(VarDecl);
    dispatch!(Interface);
    dispatch!(BodyKind);
    dispatch!(Method);
    dispatch!(Pou);

    // Expressions
    dispatch!(ExprKind);
    dispatch!(VariablePath);
    dispatch!(PathSegment);
    dispatch!(IndexSegment);
    dispatch!(UnaryExpr);
    dispatch!(BinaryExpr);
    dispatch!(CompareExpr);
    dispatch!(LogicExpr);
    dispatch!(Conditional);
    dispatch!(FunctionCall);
    dispatch!(CallArg);

    // Statements
    dispatch!(StmtKind);
    dispatch!(Assignment);
    dispatch!(If);
    dispatch!(IfBranch);
    dispatch!(Case);
    dispatch!(CaseArm);
    dispatch!(CaseSelector);
    dispatch!(For);
    dispatch!(While);
    dispatch!(Repeat);
    dispatch!(FbCall);
    dispatch!(NamedInput);
    dispatch!(ReturnStmt);

    // Sequential function charts
    dispatch!(Chart);
    dispatch!(Step);
    dispatch!(Transition);

    // Tasks and projects
    dispatch!(ScheduleKind);
    dispatch!(Task);
    dispatch!(GlobalBlock);
    dispatch!(Project);
}

rebuilding_fn!(TypeName);
rebuilding_fn!(TypeRef);
rebuilding_fn!(ArraySpec);
rebuilding_fn!(ConstantKind);
rebuilding_fn!(TypeDefinitionKind);
rebuilding_fn!(StructureDefinition);
rebuilding_fn!(StructureMember);
rebuilding_fn!(EnumerationDefinition);
rebuilding_fn!(EnumVariantDecl);
rebuilding_fn!(AliasDefinition);
rebuilding_fn!(SubrangeDefinition);
rebuilding_fn!(VarDecl);
rebuilding_fn!(Interface);
rebuilding_fn!(BodyKind);
rebuilding_fn!(Method);
rebuilding_fn!(Pou);
rebuilding_fn!(ExprKind);
rebuilding_fn!(VariablePath);
rebuilding_fn!(PathSegment);
rebuilding_fn!(IndexSegment);
rebuilding_fn!(UnaryExpr);
rebuilding_fn!(BinaryExpr);
rebuilding_fn!(CompareExpr);
rebuilding_fn!(LogicExpr);
rebuilding_fn!(Conditional);
rebuilding_fn!(FunctionCall);
rebuilding_fn!(CallArg);
rebuilding_fn!(StmtKind);
rebuilding_fn!(Assignment);
rebuilding_fn!(If);
rebuilding_fn!(IfBranch);
rebuilding_fn!(Case);
rebuilding_fn!(CaseArm);
rebuilding_fn!(CaseSelector);
rebuilding_fn!(For);
rebuilding_fn!(While);
rebuilding_fn!(Repeat);
rebuilding_fn!(FbCall);
rebuilding_fn!(NamedInput);
rebuilding_fn!(ReturnStmt);
rebuilding_fn!(Chart);
rebuilding_fn!(Step);
rebuilding_fn!(Transition);
rebuilding_fn!(ScheduleKind);
rebuilding_fn!(Task);
rebuilding_fn!(GlobalBlock);
rebuilding_fn!(Project);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::Diagnostic;

    /// Renames every variable reference from `old` to `new`.
    struct RenameVariable {
        old: Id,
        new: Id,
    }

    impl Fold<Diagnostic> for RenameVariable {
        fn fold_path_segment(&mut self, node: PathSegment) -> Result<PathSegment, Diagnostic> {
            match node {
                PathSegment::Field(name) if name == self.old => {
                    Ok(PathSegment::Field(self.new.clone()))
                }
                other => fold_path_segment(self, other),
            }
        }
    }

    #[test]
    fn fold_when_renaming_then_new_tree_produced() {
        let statement = StmtKind::simple_assignment("running", ExprKind::named_variable("cmd"));
        let pou = Pou::function_block("Motor").with_body(vec![statement]);
        let project = Project::new("cell").with_pou(pou);

        let mut rename = RenameVariable {
            old: Id::from("cmd"),
            new: Id::from("command"),
        };
        let folded = rename.fold(project).unwrap();

        let body = folded.pous[0].body.statements().unwrap();
        match &body[0] {
            StmtKind::Assignment(assignment) => match &assignment.value {
                ExprKind::Variable(path) => {
                    assert_eq!(path.root(), Some(&Id::from("command")));
                }
                other => panic!("unexpected value {:?}", other),
            },
            other => panic!("unexpected statement {:?}", other),
        }
    }

    struct Identity;
    impl Fold<Diagnostic> for Identity {}

    #[test]
    fn fold_when_identity_then_structurally_equal() {
        let pou = Pou::function_block("Motor").with_body(vec![StmtKind::simple_assignment(
            "running",
            ExprKind::const_bool(true),
        )]);
        let project = Project::new("cell").with_pou(pou);

        let folded = Identity.fold(project.clone()).unwrap();
        assert_eq!(folded, project);
    }
}
