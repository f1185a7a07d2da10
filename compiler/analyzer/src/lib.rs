//! Lowering, semantic analysis and project assembly for plx.
//!
//! The crate has three layers:
//!
//! * the declaration surface: variable descriptors and the POU/chart
//!   builders, which compile authored logic the moment a definition is
//!   registered;
//! * the lowering pass: authoring AST to IR, with sentinel expansion;
//! * project assembly: semantic rules over a composed project plus the
//!   inheritance flattening transform.

pub mod descriptors;
pub mod environment;
pub mod lower;
pub mod pou_builder;
mod result;
pub mod rule_inheritance_dag;
pub mod rule_output_assignment;
pub mod rule_structure_dag;
pub mod rule_task_pous_exist;
pub mod rule_type_check;
pub mod rule_type_refs_resolve;
pub mod rule_unique_names;
pub mod sentinels;
pub mod stages;
pub mod symbol_graph;
pub mod typecheck;
pub mod xform_flatten_inheritance;

pub use descriptors::{
    constant_var, input_var, inout_var, output_var, static_var, temp_var, VarSpec,
};
pub use environment::TypeEnvironment;
pub use pou_builder::{ChartBuilder, PouBuilder};
pub use stages::{assemble, Assembled};
pub use xform_flatten_inheritance::{apply as flatten, flatten_pou};
