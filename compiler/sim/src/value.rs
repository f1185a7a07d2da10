//! Runtime values for the simulator.
//!
//! Values mirror the IR type system at the granularity the evaluator
//! needs: one integer representation covers all integer widths, since
//! the type checker has already accepted the project. Records back
//! both structures and function block instances; iteration order is
//! deterministic.
use std::collections::BTreeMap;

use plx_dsl::common::ConstantKind;

use crate::error::Fault;

/// The state record of a structure or function block instance.
pub type Record = BTreeMap<String, Value>;

/// An array value together with the lower bound of its dimension, so
/// subscript checks do not need the declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayValue {
    pub lower: i64,
    pub elements: Vec<Value>,
}

impl ArrayValue {
    pub fn upper(&self) -> i64 {
        self.lower + self.elements.len() as i64 - 1
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Real(f64),
    /// Durations in nanoseconds.
    Duration(i64),
    Str(String),
    Array(ArrayValue),
    Record(Record),
}

impl Value {
    pub fn as_bool(&self) -> Result<bool, Fault> {
        match self {
            Value::Bool(value) => Ok(*value),
            other => Err(Fault::TypeError(format!("expected BOOL, found {other:?}"))),
        }
    }

    pub fn as_int(&self) -> Result<i64, Fault> {
        match self {
            Value::Int(value) => Ok(*value),
            other => Err(Fault::TypeError(format!("expected integer, found {other:?}"))),
        }
    }

    pub fn as_duration(&self) -> Result<i64, Fault> {
        match self {
            Value::Duration(value) => Ok(*value),
            other => Err(Fault::TypeError(format!("expected TIME, found {other:?}"))),
        }
    }

    /// Numeric reading for arithmetic that mixes integers and reals.
    pub fn as_real(&self) -> Result<f64, Fault> {
        match self {
            Value::Real(value) => Ok(*value),
            Value::Int(value) => Ok(*value as f64),
            other => Err(Fault::TypeError(format!("expected number, found {other:?}"))),
        }
    }

    pub fn is_real(&self) -> bool {
        matches!(self, Value::Real(_))
    }

    pub fn record(&self) -> Result<&Record, Fault> {
        match self {
            Value::Record(record) => Ok(record),
            other => Err(Fault::TypeError(format!("expected record, found {other:?}"))),
        }
    }

    pub fn record_mut(&mut self) -> Result<&mut Record, Fault> {
        match self {
            Value::Record(record) => Ok(record),
            other => Err(Fault::TypeError(format!("expected record, found {other:?}"))),
        }
    }

    /// Converts an IR constant to a runtime value. Enumerated values
    /// need the enumeration registry and are handled by the executor.
    pub fn from_constant(constant: &ConstantKind) -> Option<Value> {
        match constant {
            ConstantKind::Bool(literal) => Some(Value::Bool(literal.value)),
            ConstantKind::Integer(literal) => Some(Value::Int(literal.value as i64)),
            ConstantKind::Real(literal) => Some(Value::Real(literal.value)),
            ConstantKind::BitString(literal) => Some(Value::Int(literal.value as i64)),
            ConstantKind::CharacterString(literal) => Some(Value::Str(literal.value.clone())),
            ConstantKind::Duration(literal) => Some(Value::Duration(literal.as_nanoseconds())),
            ConstantKind::Enumerated(_) => None,
            // Dates have no arithmetic in the evaluator; store the
            // canonical nanosecond offset of midnight.
            ConstantKind::Date(_) | ConstantKind::TimeOfDay(_) | ConstantKind::DateAndTime(_) => {
                None
            }
        }
    }
}

/// Structural equality used by comparison operators: integers compare
/// with reals numerically.
pub fn values_equal(left: &Value, right: &Value) -> Result<bool, Fault> {
    match (left, right) {
        (Value::Int(l), Value::Real(r)) => Ok((*l as f64) == *r),
        (Value::Real(l), Value::Int(r)) => Ok(*l == (*r as f64)),
        (l, r) => Ok(l == r),
    }
}
