//! A set of traits and functions for visiting all nodes in a project.
//!
//! To use the visitor, define a struct and implement the `Visitor`
//! trait for the struct. Trait functions dispatch to free functions
//! that implement walking into the children of a node; selectively
//! call (or don't call) these to control descent.
//!
//! # Example
//!
//! ```
//! use plx_dsl::common::Pou;
//! use plx_dsl::diagnostic::Diagnostic;
//! use plx_dsl::visitor::{visit_pou, Visitor};
//!
//! struct PouCounter {
//!     count: usize,
//! }
//!
//! impl Visitor<Diagnostic> for PouCounter {
//!     type Value = ();
//!
//!     fn visit_pou(&mut self, node: &Pou) -> Result<Self::Value, Diagnostic> {
//!         self.count += 1;
//!         // Continue the recursion
//!         visit_pou(self, node)
//!     }
//! }
//! ```

use paste::paste;

use crate::common::*;
use crate::core::Id;
use crate::project::*;
use crate::sfc::*;
use crate::textual::*;
use crate::time::*;

/// Defines a `Visitor` trait method that dispatches to the free
/// function which recurses into the node's children:
///
/// ```ignore
/// fn visit_type_name(&mut self, node: &TypeName) -> Result<Self::Value, E> {
///     visit_type_name(self, node)
/// }
/// ```
macro_rules! dispatch {
    ($type_name:ident) => {
        paste! {
            fn [<visit_ $type_name:snake>](&mut self, node: &$type_name) -> Result<Self::Value, E> {
                [<visit_ $type_name:snake>](self, node)
            }
        }
    };
}

/// Defines a `Visitor` trait method for a node with no IR children:
///
/// ```ignore
/// fn visit_id(&mut self, node: &Id) -> Result<Self::Value, E> {
///     Ok(Self::Value::default())
/// }
/// ```
macro_rules! leaf {
    ($type_name:ident) => {
        paste! {
            fn [<visit_ $type_name:snake>](&mut self, _node: &$type_name) -> Result<Self::Value, E> {
                Ok(Self::Value::default())
            }
        }
    };
}

/// Defines the free function that continues recursion into a node.
/// Implementations call these to resume the default walk after doing
/// their own work.
macro_rules! recursing_fn {
    ($type_name:ident) => {
        paste! {
            pub fn [<visit_ $type_name:snake>]<V: Visitor<E> + ?Sized, E>(
                v: &mut V,
                node: &$type_name,
            ) -> Result<V::Value, E> {
                node.traverse_visit(v)
            }
        }
    };
}

/// Defines a visitor for the IR tree. The default visitor recursively
/// walks every node and visits each child exactly once.
///
/// Functions in the visitor are named for the snake-case variant of
/// the element name: the `Pou` element's function is `visit_pou`.
pub trait Visitor<E> {
    /// Value produced by this visitor when the result is not an error.
    ///
    /// The returned value is usually not meaningful because no
    /// guarantee is provided when returning from vectors of objects.
    type Value: Default;

    /// Visits a whole project.
    fn walk(&mut self, node: &Project) -> Result<Self::Value, E> {
        node.traverse_visit(self)
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

recursing_fn!(TypeName);
recursing_fn!(TypeRef);
recursing_fn!(ArraySpec);
recursing_fn!(ConstantKind);
recursing_fn!(TypeDefinitionKind);
recursing_fn!(StructureDefinition);
recursing_fn!(StructureMember);
recursing_fn!(EnumerationDefinition);
recursing_fn!(EnumVariantDecl);
recursing_fn!(AliasDefinition);
recursing_fn!(SubrangeDefinition);
recursing_fn!(VarDecl);
recursing_fn!(Interface);
recursing_fn!(BodyKind);
recursing_fn!(Method);
recursing_fn!(Pou);
recursing_fn!(ExprKind);
recursing_fn!(VariablePath);
recursing_fn!(PathSegment);
recursing_fn!(IndexSegment);
recursing_fn!(UnaryExpr);
recursing_fn!(BinaryExpr);
recursing_fn!(CompareExpr);
recursing_fn!(LogicExpr);
recursing_fn!(Conditional);
recursing_fn!(FunctionCall);
recursing_fn!(CallArg);
recursing_fn!(StmtKind);
recursing_fn!(Assignment);
recursing_fn!(If);
recursing_fn!(IfBranch);
recursing_fn!(Case);
recursing_fn!(CaseArm);
recursing_fn!(CaseSelector);
recursing_fn!(For);
recursing_fn!(While);
recursing_fn!(Repeat);
recursing_fn!(FbCall);
recursing_fn!(NamedInput);
recursing_fn!(ReturnStmt);
recursing_fn!(Chart);
recursing_fn!(Step);
recursing_fn!(Transition);
recursing_fn!(ScheduleKind);
recursing_fn!(Task);
recursing_fn!(GlobalBlock);
recursing_fn!(Project);
