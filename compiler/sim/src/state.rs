//! Instance state allocation.
//!
//! A controller owns one top-level instance record per run. Records
//! nest: function block instance variables (including synthesized
//! timer/trigger/counter instances) allocate their own records inside
//! the parent's.
use std::collections::{BTreeMap, HashMap};

use plx_dsl::common::{
    ElementaryKind, Pou, TypeDefinitionKind, TypeRef, VarDecl,
};
use plx_dsl::core::Id;
use plx_dsl::project::Project;

use crate::builtins;
use crate::value::{ArrayValue, Record, Value};

/// The definitions a running simulation resolves names against.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    pous: HashMap<String, Pou>,
    // Ordered so that unqualified enumeration lookups resolve the
    // same way on every run.
    data_types: BTreeMap<String, TypeDefinitionKind>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry from a project's declarations.
    pub fn from_project(project: &Project) -> Self {
        let mut registry = Self::new();
        for pou in &project.pous {
            registry.add_pou(pou.clone());
        }
        for data_type in &project.data_types {
            registry.add_data_type(data_type.clone());
        }
        registry
    }

    pub fn add_pou(&mut self, pou: Pou) {
        self.pous.insert(pou.name.lower_case().to_owned(), pou);
    }

    pub fn add_data_type(&mut self, data_type: TypeDefinitionKind) {
        self.data_types
            .insert(data_type.type_name().name.lower_case().to_owned(), data_type);
    }

    pub fn pou(&self, name: &Id) -> Option<&Pou> {
        self.pous.get(name.lower_case())
    }

    pub fn data_type(&self, name: &Id) -> Option<&TypeDefinitionKind> {
        self.data_types.get(name.lower_case())
    }

    /// The integer value of an enumeration variant, looked up across
    /// every registered enumeration when unqualified.
    pub fn enum_value(&self, type_name: Option<&Id>, variant: &Id) -> Option<i64> {
        match type_name {
            Some(type_name) => match self.data_type(type_name) {
                Some(TypeDefinitionKind::Enumeration(def)) => def.value_of(variant),
                _ => None,
            },
            None => self.data_types.values().find_map(|def| match def {
                TypeDefinitionKind::Enumeration(def) => def.value_of(variant),
                _ => None,
            }),
        }
    }
}

/// Allocates the instance record for a POU: declared initial values
/// where present, zero/false/empty otherwise. Inherited interfaces
/// allocate the ancestor chain first.
pub fn allocate_instance(pou: &Pou, registry: &Registry) -> Record {
    let mut record = Record::new();
    allocate_into(pou, registry, &mut record, 0);
    record
}

fn allocate_into(pou: &Pou, registry: &Registry, record: &mut Record, depth: usize) {
    // Assembly rejects inheritance cycles; the depth guard keeps
    // unvalidated input from recursing forever.
    if depth > 32 {
        return;
    }
    if let Some(parent) = &pou.parent {
        if let Some(parent_pou) = registry.pou(&parent.name) {
            allocate_into(parent_pou, registry, record, depth + 1);
        }
    }
    for (_, decl) in pou.interface.iter() {
        record.insert(decl.name.lower_case().to_owned(), allocate_var(decl, registry));
    }
}

/// Allocates one variable: its initial value if declared, otherwise
/// the type default.
pub fn allocate_var(decl: &VarDecl, registry: &Registry) -> Value {
    if let Some(initial) = &decl.initial {
        if let Some(value) = Value::from_constant(initial) {
            return value;
        }
        if let plx_dsl::common::ConstantKind::Enumerated(enumerated) = initial {
            let type_name = enumerated.type_name.as_ref().map(|t| &t.name);
            if let Some(value) = registry.enum_value(type_name, &enumerated.variant) {
                return Value::Int(value);
            }
        }
    }
    default_value(&decl.type_ref, registry)
}

/// The zero/false/empty default of a type.
pub fn default_value(type_ref: &TypeRef, registry: &Registry) -> Value {
    match type_ref {
        TypeRef::Elementary(kind) => elementary_default(*kind),
        TypeRef::String(_) => Value::Str(String::new()),
        TypeRef::Named(name) => {
            if builtins::is_builtin(name.name.original()) {
                return Value::Record(builtins::initial_state(name.name.original()));
            }
            if let Some(pou) = registry.pou(&name.name) {
                return Value::Record(allocate_instance(pou, registry));
            }
            match registry.data_type(&name.name) {
                Some(TypeDefinitionKind::Structure(def)) => {
                    let mut record = Record::new();
                    for member in &def.members {
                        let value = match &member.initial {
                            Some(initial) => Value::from_constant(initial)
                                .unwrap_or_else(|| default_value(&member.type_ref, registry)),
                            None => default_value(&member.type_ref, registry),
                        };
                        record.insert(member.name.lower_case().to_owned(), value);
                    }
                    Value::Record(record)
                }
                Some(TypeDefinitionKind::Enumeration(def)) => {
                    Value::Int(def.variants.first().map(|v| v.value).unwrap_or(0))
                }
                Some(TypeDefinitionKind::Alias(def)) => default_value(&def.target, registry),
                Some(TypeDefinitionKind::Subrange(def)) => {
                    // The default clamps into the declared range.
                    Value::Int(def.lower.max(0).min(def.upper))
                }
                None => Value::Record(Record::new()),
            }
        }
        TypeRef::Array(spec) => allocate_array(spec, 0, registry),
        // Pointers and references have no simulated storage.
        TypeRef::Pointer(_) | TypeRef::Reference(_) => Value::Int(0),
    }
}

fn allocate_array(
    spec: &plx_dsl::common::ArraySpec,
    dimension: usize,
    registry: &Registry,
) -> Value {
    let dim = &spec.dimensions[dimension];
    let element = if dimension + 1 == spec.dimensions.len() {
        default_value(&spec.element, registry)
    } else {
        allocate_array(spec, dimension + 1, registry)
    };
    Value::Array(ArrayValue {
        lower: dim.lower,
        elements: vec![element; dim.len()],
    })
}

fn elementary_default(kind: ElementaryKind) -> Value {
    if kind.is_boolean() {
        Value::Bool(false)
    } else if kind.is_float() {
        Value::Real(0.0)
    } else if kind.is_duration() {
        Value::Duration(0)
    } else {
        // Integers, bit strings, dates and characters all default to
        // their zero representation.
        Value::Int(0)
    }
}
