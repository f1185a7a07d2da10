//! Deterministic scan-cycle simulation of plx project IR.
//!
//! The simulator is a tree-walking evaluator with a virtual clock:
//! a *scan* is one pass through a POU's body with inputs sampled at
//! scan start and outputs published at scan end, and `tick` advances
//! simulated time without running a scan. Given identical input
//! sequences and tick schedules, output traces are identical across
//! runs.
//!
//! ```
//! use plx_dsl::common::{Interface, Pou, VarDecl};
//! use plx_dsl::textual::{ExprKind, StmtKind};
//! use plx_sim::simulate;
//!
//! let mut interface = Interface::new();
//! interface.inputs.push(VarDecl::bool("cmd"));
//! interface.outputs.push(VarDecl::bool("running"));
//! let motor = Pou::function_block("Motor")
//!     .with_interface(interface)
//!     .with_body(vec![StmtKind::simple_assignment(
//!         "running",
//!         ExprKind::named_variable("cmd"),
//!     )]);
//!
//! let mut controller = simulate(&motor);
//! controller.set("cmd", true).unwrap();
//! controller.scan().unwrap();
//! assert!(controller.get_bool("running").unwrap());
//! ```

pub mod builtins;
pub mod controller;
pub mod error;
pub mod executor;
pub mod state;
pub mod value;

use plx_dsl::common::Pou;
use plx_dsl::project::Project;

pub use controller::Controller;
pub use error::{Fault, RuntimeFault};
pub use state::Registry;
pub use value::{Record, Value};

/// Constructs a controller for a single POU with no further context.
pub fn simulate(pou: &Pou) -> Controller {
    let mut registry = Registry::new();
    registry.add_pou(pou.clone());
    Controller::new(pou.clone(), registry)
}

/// Constructs a controller for a POU with an explicit registry of
/// POUs and data types (nested function blocks, enumerations).
pub fn simulate_with(pou: &Pou, registry: Registry) -> Controller {
    let mut registry = registry;
    registry.add_pou(pou.clone());
    Controller::new(pou.clone(), registry)
}

/// Constructs a controller for a named POU of a validated project.
pub fn simulate_project(project: &Project, pou_name: &str) -> Option<Controller> {
    let pou = project.find_pou(&plx_dsl::core::Id::from(pou_name))?.clone();
    let registry = Registry::from_project(project);
    Some(Controller::new(pou, registry))
}
