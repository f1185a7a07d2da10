//! Provides definitions of the Universal IR: a vendor-neutral, typed
//! model of IEC 61131-3 projects, together with traversal and
//! persistence support.

#[allow(unused)]
pub mod common;
#[allow(unused)]
pub mod core;
#[allow(unused)]
pub mod diagnostic;
#[allow(unused)]
pub mod fold;
#[allow(unused)]
pub mod persist;
#[allow(unused)]
pub mod project;
#[allow(unused)]
pub mod sfc;
#[allow(unused)]
pub mod textual;
#[allow(unused)]
pub mod time;
#[allow(unused)]
pub mod visitor;
