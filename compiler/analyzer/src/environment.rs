//! The type environment: every name the checker can resolve a type
//! reference against, including elementary types, the standard
//! function blocks, user data types and user POUs.
use std::collections::HashMap;

use plx_dsl::common::{
    ElementaryKind, EnumerationDefinition, Interface, Pou, PouKind, TypeDefinitionKind, TypeName,
    TypeRef, VarDecl, VarRole,
};
use plx_dsl::core::Id;

/// The standard function block types the compiler synthesizes for
/// sentinel expansion and that authored code may instantiate.
pub static STANDARD_FBS: phf::Map<&'static str, StandardFb> = phf::phf_map! {
    "ton" => StandardFb::Ton,
    "tof" => StandardFb::Tof,
    "tp" => StandardFb::Tp,
    "r_trig" => StandardFb::RTrig,
    "f_trig" => StandardFb::FTrig,
    "ctu" => StandardFb::Ctu,
    "ctd" => StandardFb::Ctd,
};

/// The IEC standard functions accepted in call expressions.
pub static STANDARD_FUNCTIONS: phf::Set<&'static str> = phf::phf_set! {
    "ABS", "SQRT", "LN", "LOG", "EXP", "EXPT",
    "SIN", "COS", "TAN", "ASIN", "ACOS", "ATAN",
    "MIN", "MAX", "LIMIT", "SEL", "MUX",
    "SHL", "SHR", "TRUNC", "ROUND",
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StandardFb {
    Ton,
    Tof,
    Tp,
    RTrig,
    FTrig,
    Ctu,
    Ctd,
}

impl StandardFb {
    pub fn type_name(&self) -> &'static str {
        match self {
            StandardFb::Ton => "TON",
            StandardFb::Tof => "TOF",
            StandardFb::Tp => "TP",
            StandardFb::RTrig => "R_TRIG",
            StandardFb::FTrig => "F_TRIG",
            StandardFb::Ctu => "CTU",
            StandardFb::Ctd => "CTD",
        }
    }

    /// Input variables of the standard interface.
    pub fn inputs(&self) -> Vec<VarDecl> {
        match self {
            StandardFb::Ton | StandardFb::Tof | StandardFb::Tp => vec![
                VarDecl::bool("IN"),
                VarDecl::new("PT", TypeRef::TIME),
            ],
            StandardFb::RTrig | StandardFb::FTrig => vec![VarDecl::bool("CLK")],
            StandardFb::Ctu => vec![
                VarDecl::bool("CU"),
                VarDecl::bool("R"),
                VarDecl::int("PV"),
            ],
            StandardFb::Ctd => vec![
                VarDecl::bool("CD"),
                VarDecl::bool("LD"),
                VarDecl::int("PV"),
            ],
        }
    }

    /// Output variables of the standard interface.
    pub fn outputs(&self) -> Vec<VarDecl> {
        match self {
            StandardFb::Ton | StandardFb::Tof | StandardFb::Tp => vec![
                VarDecl::bool("Q"),
                VarDecl::new("ET", TypeRef::TIME),
            ],
            StandardFb::RTrig | StandardFb::FTrig => vec![VarDecl::bool("Q")],
            StandardFb::Ctu | StandardFb::Ctd => {
                vec![VarDecl::bool("Q"), VarDecl::int("CV")]
            }
        }
    }

    pub fn lookup(type_name: &TypeName) -> Option<StandardFb> {
        STANDARD_FBS.get(type_name.name.lower_case()).copied()
    }
}

/// What a named type resolves to.
#[derive(Debug, Clone)]
pub enum Resolved<'a> {
    DataType(&'a TypeDefinitionKind),
    UserPou(&'a Pou),
    StandardFb(StandardFb),
}

/// Resolves names to types across a project's declarations.
///
/// The environment borrows the declarations; the IR stays immutable.
pub struct TypeEnvironment<'a> {
    data_types: HashMap<&'a Id, &'a TypeDefinitionKind>,
    pous: HashMap<&'a Id, &'a Pou>,
}

impl<'a> TypeEnvironment<'a> {
    pub fn new() -> Self {
        Self {
            data_types: HashMap::new(),
            pous: HashMap::new(),
        }
    }

    pub fn with_data_types(mut self, data_types: &'a [TypeDefinitionKind]) -> Self {
        for data_type in data_types {
            self.data_types
                .insert(&data_type.type_name().name, data_type);
        }
        self
    }

    pub fn with_pous(mut self, pous: &'a [Pou]) -> Self {
        for pou in pous {
            self.pous.insert(&pou.name, pou);
        }
        self
    }

    pub fn resolve(&self, name: &TypeName) -> Option<Resolved<'a>> {
        if let Some(fb) = StandardFb::lookup(name) {
            return Some(Resolved::StandardFb(fb));
        }
        if let Some(data_type) = self.data_types.get(&name.name).copied() {
            return Some(Resolved::DataType(data_type));
        }
        self.pous
            .get(&name.name)
            .copied()
            .map(|pou| Resolved::UserPou(pou))
    }

    pub fn enumeration(&self, name: &Id) -> Option<&'a EnumerationDefinition> {
        match self.data_types.get(name).copied() {
            Some(TypeDefinitionKind::Enumeration(def)) => Some(def),
            _ => None,
        }
    }

    pub fn pou(&self, name: &Id) -> Option<&'a Pou> {
        self.pous.get(name).copied()
    }

    /// Follows alias definitions to the underlying type reference.
    pub fn canonical(&self, type_ref: &TypeRef) -> TypeRef {
        let mut current = type_ref.clone();
        // Alias chains are short; the structure DAG rule rejects
        // anything circular.
        for _ in 0..32 {
            match &current {
                TypeRef::Named(name) => match self.data_types.get(&name.name) {
                    Some(TypeDefinitionKind::Alias(alias)) => {
                        current = alias.target.clone();
                    }
                    Some(TypeDefinitionKind::Subrange(subrange)) => {
                        return TypeRef::Elementary(subrange.base);
                    }
                    _ => return current,
                },
                _ => return current,
            }
        }
        current
    }

    /// The interface of a function block type (standard or user).
    pub fn fb_interface(&self, name: &TypeName) -> Option<Interface> {
        match self.resolve(name)? {
            Resolved::StandardFb(fb) => {
                let mut interface = Interface::new();
                interface.inputs = fb.inputs();
                interface.outputs = fb.outputs();
                Some(interface)
            }
            Resolved::UserPou(pou) if pou.kind == PouKind::FunctionBlock => {
                Some(pou.interface.clone())
            }
            _ => None,
        }
    }
}

impl<'a> Default for TypeEnvironment<'a> {
    fn default() -> Self {
        Self::new()
    }
}

/// Tests whether a value of type `from` may be assigned to a variable
/// of type `to` without an explicit conversion.
///
/// Numeric widening is permitted; narrowing and cross-domain
/// assignment (float to integer, integer to Boolean) are not.
pub fn assignable(from: &TypeRef, to: &TypeRef) -> bool {
    if from == to {
        return true;
    }
    match (from, to) {
        (TypeRef::Elementary(from_kind), TypeRef::Elementary(to_kind)) => {
            elementary_assignable(*from_kind, *to_kind)
        }
        (TypeRef::String(from_spec), TypeRef::String(to_spec)) => from_spec.wide == to_spec.wide,
        _ => false,
    }
}

fn elementary_assignable(from: ElementaryKind, to: ElementaryKind) -> bool {
    if from == to {
        return true;
    }
    let widening = |order: &[ElementaryKind]| {
        let from_rank = order.iter().position(|k| *k == from);
        let to_rank = order.iter().position(|k| *k == to);
        matches!((from_rank, to_rank), (Some(f), Some(t)) if f <= t)
    };

    use ElementaryKind::*;
    widening(&[SINT, INT, DINT, LINT])
        || widening(&[USINT, UINT, UDINT, ULINT])
        || widening(&[REAL, LREAL])
        || widening(&[BYTE, WORD, DWORD, LWORD])
        || (from == TIME && to == LTIME)
}

/// The role blocks a given variable role is readable from and writable
/// to inside its own POU.
pub fn writable(role: VarRole) -> bool {
    !matches!(role, VarRole::Input | VarRole::Constant)
}

#[cfg(test)]
mod tests {
    use super::*;
    use plx_dsl::common::EnumVariantDecl;

    #[test]
    fn assignable_when_widening_int_then_accepted() {
        assert!(assignable(&TypeRef::DINT, &TypeRef::LINT));
        assert!(assignable(&TypeRef::INT, &TypeRef::DINT));
    }

    #[test]
    fn assignable_when_narrowing_int_then_rejected() {
        assert!(!assignable(&TypeRef::LINT, &TypeRef::DINT));
    }

    #[test]
    fn assignable_when_float_to_int_then_rejected() {
        assert!(!assignable(&TypeRef::REAL, &TypeRef::DINT));
    }

    #[test]
    fn assignable_when_int_to_bool_then_rejected() {
        assert!(!assignable(&TypeRef::INT, &TypeRef::BOOL));
    }

    #[test]
    fn environment_when_standard_fb_then_interface_known() {
        let env = TypeEnvironment::new();
        let interface = env.fb_interface(&TypeName::from("TON")).unwrap();
        assert!(interface.find(&Id::from("PT")).is_some());
        assert!(interface.find(&Id::from("Q")).is_some());
    }

    #[test]
    fn environment_when_alias_then_canonical_follows() {
        use plx_dsl::common::AliasDefinition;
        let types = vec![TypeDefinitionKind::Alias(AliasDefinition {
            type_name: TypeName::from("Speed"),
            target: TypeRef::REAL,
        })];
        let env = TypeEnvironment::new().with_data_types(&types);
        assert_eq!(env.canonical(&TypeRef::named("Speed")), TypeRef::REAL);
    }

    #[test]
    fn environment_when_enumeration_then_found() {
        let types = vec![TypeDefinitionKind::Enumeration(
            EnumerationDefinition::new("Mode", vec![EnumVariantDecl::new("Off", 0)]).unwrap(),
        )];
        let env = TypeEnvironment::new().with_data_types(&types);
        assert!(env.enumeration(&Id::from("mode")).is_some());
    }
}
