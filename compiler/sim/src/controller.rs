//! The controller: the user-facing object for running POU scans.
//!
//! A controller owns its mutable state exclusively and borrows the IR
//! immutably; several controllers may share one POU. Inputs staged
//! between scans become visible at the next scan start (copy-in);
//! outputs are observable once `scan` returns (copy-out). The virtual
//! clock advances only through `tick` and never during a scan.
use log::debug;
use time::Duration;

use plx_dsl::common::{Pou, TypeRef, VarRole};
use plx_dsl::core::Id;

use crate::error::{Fault, RuntimeFault};
use crate::executor::Executor;
use crate::state::{allocate_instance, Registry};
use crate::value::{Record, Value};

pub struct Controller {
    pou: Pou,
    registry: Registry,
    state: Record,
    staged: Vec<(String, Value)>,
    clock_ns: i64,
    first_scan: bool,
    scan_count: u64,
}

impl Controller {
    pub(crate) fn new(pou: Pou, registry: Registry) -> Self {
        let state = allocate_instance(&pou, &registry);
        Self {
            pou,
            registry,
            state,
            staged: Vec::new(),
            clock_ns: 0,
            first_scan: true,
            scan_count: 0,
        }
    }

    /// Stages an input value for the next scan. The value must match
    /// the declared input type.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<(), Fault> {
        let value = value.into();
        let id = Id::from(name);
        let (role, decl) = self
            .pou
            .interface
            .find(&id)
            .ok_or_else(|| Fault::UnknownVariable(name.to_owned()))?;
        if role != VarRole::Input {
            return Err(Fault::TypeError(format!(
                "{name} is not an input (role {role})"
            )));
        }
        check_shape(&decl.type_ref, &value)?;
        self.staged.push((id.lower_case().to_owned(), value));
        Ok(())
    }

    /// Reads any variable: input, output or static. Values reflect
    /// the state after the most recent completed scan.
    pub fn get(&self, name: &str) -> Result<Value, Fault> {
        let id = Id::from(name);
        self.state
            .get(id.lower_case())
            .cloned()
            .ok_or_else(|| Fault::UnknownVariable(name.to_owned()))
    }

    /// Convenience reader for Boolean variables.
    pub fn get_bool(&self, name: &str) -> Result<bool, Fault> {
        self.get(name)?.as_bool()
    }

    /// Reads a field of a nested instance, such as a timer's `ET`.
    pub fn get_field(&self, instance: &str, field: &str) -> Result<Value, Fault> {
        let record = self.get(instance)?;
        let record = record.record()?;
        record
            .get(Id::from(field).lower_case())
            .cloned()
            .ok_or_else(|| Fault::UnknownVariable(format!("{instance}.{field}")))
    }

    /// Executes one scan: staged inputs are copied in, the body runs
    /// to completion, and the resulting state is published.
    ///
    /// A faulting scan publishes nothing; the state observable through
    /// `get` stays at the previous scan's values.
    pub fn scan(&mut self) -> Result<(), RuntimeFault> {
        let mut working = self.state.clone();
        for (name, value) in &self.staged {
            working.insert(name.clone(), value.clone());
        }

        let executor = Executor::new(&self.registry, self.clock_ns, self.first_scan);
        executor.scan(&self.pou, &mut working)?;

        self.state = working;
        self.staged.clear();
        self.first_scan = false;
        self.scan_count += 1;
        debug!(
            "scan {} of {} completed at {} ns",
            self.scan_count, self.pou.name, self.clock_ns
        );
        Ok(())
    }

    /// Executes `count` scans.
    pub fn scan_n(&mut self, count: usize) -> Result<(), RuntimeFault> {
        for _ in 0..count {
            self.scan()?;
        }
        Ok(())
    }

    /// Advances the virtual clock. No scan runs; tests interleave
    /// `tick` and `scan` explicitly.
    pub fn tick(&mut self, duration: Duration) {
        self.clock_ns += duration.whole_nanoseconds() as i64;
    }

    /// Advances the virtual clock by whole seconds.
    pub fn tick_seconds(&mut self, seconds: i64) {
        self.tick(Duration::seconds(seconds));
    }

    pub fn tick_milliseconds(&mut self, milliseconds: i64) {
        self.tick(Duration::milliseconds(milliseconds));
    }

    /// The current virtual clock in nanoseconds.
    pub fn clock_ns(&self) -> i64 {
        self.clock_ns
    }

    /// The active step of a chart body, once the first scan has run.
    pub fn active_step(&self) -> Option<String> {
        Executor::active_step(&self.state)
    }

    /// A deterministic snapshot of every observable variable.
    pub fn snapshot(&self) -> Record {
        self.state
            .iter()
            .filter(|(key, _)| !key.starts_with("__"))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }
}

/// Checks that a staged value has the shape of the declared type.
fn check_shape(type_ref: &TypeRef, value: &Value) -> Result<(), Fault> {
    let ok = match type_ref {
        TypeRef::Elementary(kind) => {
            if kind.is_boolean() {
                matches!(value, Value::Bool(_))
            } else if kind.is_float() {
                matches!(value, Value::Real(_) | Value::Int(_))
            } else if kind.is_duration() {
                matches!(value, Value::Duration(_))
            } else {
                matches!(value, Value::Int(_))
            }
        }
        TypeRef::String(_) => matches!(value, Value::Str(_)),
        // Named types accept integers (enumerations) and records.
        TypeRef::Named(_) => matches!(value, Value::Int(_) | Value::Record(_)),
        TypeRef::Array(_) => matches!(value, Value::Array(_)),
        TypeRef::Pointer(_) | TypeRef::Reference(_) => false,
    };
    if ok {
        Ok(())
    } else {
        Err(Fault::TypeError(format!(
            "value {value:?} does not match declared type {type_ref}"
        )))
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Real(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_owned())
    }
}
