//! Provides definitions of the common IR elements: the type system,
//! literal constants, user-defined types, variable declarations and
//! program organization units.
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use plx_dsl_derive::Traverse;
use plx_problems::Problem;

use crate::core::{Id, Located, SourceSpan};
use crate::diagnostic::{Diagnostic, Label};
use crate::fold::Fold;
use crate::sfc::Chart;
use crate::textual::StmtKind;
use crate::time::{DateAndTimeLiteral, DateLiteral, DurationLiteral, TimeOfDayLiteral};
use crate::visitor::Visitor;

/// Elementary type names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[allow(clippy::upper_case_acronyms)]
pub enum ElementaryKind {
    /// Boolean
    BOOL,
    /// Signed integers, 8/16/32/64 bits wide
    SINT,
    INT,
    DINT,
    LINT,
    /// Unsigned integers, 8/16/32/64 bits wide
    USINT,
    UINT,
    UDINT,
    ULINT,
    /// Floating point, 32/64 bits wide
    REAL,
    LREAL,
    /// Bit strings, 8/16/32/64 bits wide
    BYTE,
    WORD,
    DWORD,
    LWORD,
    /// Durations (short and long form)
    TIME,
    LTIME,
    /// Date and time of day
    DATE,
    TOD,
    DT,
    /// Characters (narrow and wide)
    CHAR,
    WCHAR,
}

impl ElementaryKind {
    pub fn is_boolean(&self) -> bool {
        matches!(self, ElementaryKind::BOOL)
    }

    pub fn is_signed_integer(&self) -> bool {
        matches!(
            self,
            ElementaryKind::SINT | ElementaryKind::INT | ElementaryKind::DINT | ElementaryKind::LINT
        )
    }

    pub fn is_unsigned_integer(&self) -> bool {
        matches!(
            self,
            ElementaryKind::USINT
                | ElementaryKind::UINT
                | ElementaryKind::UDINT
                | ElementaryKind::ULINT
        )
    }

    pub fn is_integer(&self) -> bool {
        self.is_signed_integer() || self.is_unsigned_integer()
    }

    pub fn is_bit_string(&self) -> bool {
        matches!(
            self,
            ElementaryKind::BYTE | ElementaryKind::WORD | ElementaryKind::DWORD | ElementaryKind::LWORD
        )
    }

    pub fn is_float(&self) -> bool {
        matches!(self, ElementaryKind::REAL | ElementaryKind::LREAL)
    }

    pub fn is_numeric(&self) -> bool {
        self.is_integer() || self.is_float()
    }

    pub fn is_duration(&self) -> bool {
        matches!(self, ElementaryKind::TIME | ElementaryKind::LTIME)
    }

    /// Width in bits for sized kinds. Durations, dates and characters
    /// have no meaningful width here.
    pub fn bit_width(&self) -> Option<u32> {
        match self {
            ElementaryKind::BOOL => Some(1),
            ElementaryKind::SINT | ElementaryKind::USINT | ElementaryKind::BYTE => Some(8),
            ElementaryKind::INT | ElementaryKind::UINT | ElementaryKind::WORD => Some(16),
            ElementaryKind::DINT
            | ElementaryKind::UDINT
            | ElementaryKind::DWORD
            | ElementaryKind::REAL => Some(32),
            ElementaryKind::LINT
            | ElementaryKind::ULINT
            | ElementaryKind::LWORD
            | ElementaryKind::LREAL => Some(64),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ElementaryKind::BOOL => "BOOL",
            ElementaryKind::SINT => "SINT",
            ElementaryKind::INT => "INT",
            ElementaryKind::DINT => "DINT",
            ElementaryKind::LINT => "LINT",
            ElementaryKind::USINT => "USINT",
            ElementaryKind::UINT => "UINT",
            ElementaryKind::UDINT => "UDINT",
            ElementaryKind::ULINT => "ULINT",
            ElementaryKind::REAL => "REAL",
            ElementaryKind::LREAL => "LREAL",
            ElementaryKind::BYTE => "BYTE",
            ElementaryKind::WORD => "WORD",
            ElementaryKind::DWORD => "DWORD",
            ElementaryKind::LWORD => "LWORD",
            ElementaryKind::TIME => "TIME",
            ElementaryKind::LTIME => "LTIME",
            ElementaryKind::DATE => "DATE",
            ElementaryKind::TOD => "TIME_OF_DAY",
            ElementaryKind::DT => "DATE_AND_TIME",
            ElementaryKind::CHAR => "CHAR",
            ElementaryKind::WCHAR => "WCHAR",
        }
    }
}

impl fmt::Display for ElementaryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Implements a type identifier.
///
/// Types are identifiers but we use a separate structure because it is
/// convenient to treat types and other identifiers separately.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Traverse)]
pub struct TypeName {
    pub name: Id,
}

impl TypeName {
    pub fn from(str: &str) -> Self {
        Self {
            name: Id::from(str),
        }
    }

    pub fn from_id(name: &Id) -> Self {
        Self { name: name.clone() }
    }
}

impl Located for TypeName {
    fn span(&self) -> SourceSpan {
        self.name.span()
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// One inclusive array dimension, `[lower..upper]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimension {
    pub lower: i64,
    pub upper: i64,
}

impl Dimension {
    /// Creates a dimension. A dimension with `lower > upper` is not a
    /// valid bound.
    pub fn new(lower: i64, upper: i64) -> Result<Self, Diagnostic> {
        if lower > upper {
            return Err(Diagnostic::problem(
                Problem::InvalidLiteral,
                Label::span(
                    SourceSpan::default(),
                    format!("Array bound [{}..{}] is descending", lower, upper),
                ),
            ));
        }
        Ok(Self { lower, upper })
    }

    pub fn len(&self) -> usize {
        (self.upper - self.lower + 1) as usize
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn contains(&self, index: i64) -> bool {
        index >= self.lower && index <= self.upper
    }
}

/// String specification: maximum length and character width.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StringSpec {
    pub wide: bool,
    pub max_length: Option<u32>,
}

/// Array specification: the element type and the ordered dimensions.
/// Multi-dimensional arrays are a single specification with several
/// dimensions, not nested arrays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Traverse)]
pub struct ArraySpec {
    pub element: Box<TypeRef>,
    pub dimensions: Vec<Dimension>,
}

/// A reference to a type, wherever the IR needs one: variable
/// declarations, array elements, return types.
///
/// Named types refer into the project's data type registry (or to a
/// function block type) and are resolved during assembly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Traverse)]
pub enum TypeRef {
    #[traverse(skip)]
    Elementary(ElementaryKind),
    String(StringSpec),
    Named(TypeName),
    Array(ArraySpec),
    Pointer(Box<TypeRef>),
    Reference(Box<TypeRef>),
}

impl TypeRef {
    pub const BOOL: TypeRef = TypeRef::Elementary(ElementaryKind::BOOL);
    pub const INT: TypeRef = TypeRef::Elementary(ElementaryKind::INT);
    pub const DINT: TypeRef = TypeRef::Elementary(ElementaryKind::DINT);
    pub const LINT: TypeRef = TypeRef::Elementary(ElementaryKind::LINT);
    pub const REAL: TypeRef = TypeRef::Elementary(ElementaryKind::REAL);
    pub const LREAL: TypeRef = TypeRef::Elementary(ElementaryKind::LREAL);
    pub const TIME: TypeRef = TypeRef::Elementary(ElementaryKind::TIME);

    pub fn named(name: &str) -> Self {
        TypeRef::Named(TypeName::from(name))
    }

    pub fn string(max_length: Option<u32>) -> Self {
        TypeRef::String(StringSpec {
            wide: false,
            max_length,
        })
    }

    pub fn wide_string(max_length: Option<u32>) -> Self {
        TypeRef::String(StringSpec {
            wide: true,
            max_length,
        })
    }

    pub fn array(element: TypeRef, dimensions: Vec<Dimension>) -> Self {
        TypeRef::Array(ArraySpec {
            element: Box::new(element),
            dimensions,
        })
    }

    pub fn as_elementary(&self) -> Option<ElementaryKind> {
        match self {
            TypeRef::Elementary(kind) => Some(*kind),
            _ => None,
        }
    }

    pub fn as_named(&self) -> Option<&TypeName> {
        match self {
            TypeRef::Named(name) => Some(name),
            _ => None,
        }
    }

    pub fn is_boolean(&self) -> bool {
        matches!(self, TypeRef::Elementary(ElementaryKind::BOOL))
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Elementary(kind) => write!(f, "{}", kind),
            TypeRef::String(spec) => {
                let keyword = if spec.wide { "WSTRING" } else { "STRING" };
                match spec.max_length {
                    Some(length) => write!(f, "{}[{}]", keyword, length),
                    None => write!(f, "{}", keyword),
                }
            }
            TypeRef::Named(name) => write!(f, "{}", name),
            TypeRef::Array(spec) => {
                let dims: Vec<String> = spec
                    .dimensions
                    .iter()
                    .map(|d| format!("{}..{}", d.lower, d.upper))
                    .collect();
                write!(f, "ARRAY [{}] OF {}", dims.join(", "), spec.element)
            }
            TypeRef::Pointer(target) => write!(f, "POINTER TO {}", target),
            TypeRef::Reference(target) => write!(f, "REFERENCE TO {}", target),
        }
    }
}

/// A particular value in an enumeration, optionally qualified with the
/// enumeration type name.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EnumeratedValue {
    pub type_name: Option<TypeName>,
    pub variant: Id,
}

impl EnumeratedValue {
    pub fn new(variant: &str) -> Self {
        EnumeratedValue {
            type_name: None,
            variant: Id::from(variant),
        }
    }

    pub fn qualified(type_name: &str, variant: &str) -> Self {
        EnumeratedValue {
            type_name: Some(TypeName::from(type_name)),
            variant: Id::from(variant),
        }
    }
}

impl Located for EnumeratedValue {
    fn span(&self) -> SourceSpan {
        self.variant.span()
    }
}

impl fmt::Display for EnumeratedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.type_name {
            Some(type_name) => write!(f, "{}#{}", type_name, self.variant),
            None => write!(f, "{}", self.variant),
        }
    }
}

/// A boolean literal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoolLiteral {
    pub value: bool,
    #[serde(skip)]
    pub span: SourceSpan,
}

/// An integer literal with an optional elementary type hint.
///
/// The value is kept in the widest representation and bound to a
/// narrower type depending on context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegerLiteral {
    pub value: i128,
    pub type_hint: Option<ElementaryKind>,
    #[serde(skip)]
    pub span: SourceSpan,
}

/// A floating point literal with an optional elementary type hint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RealLiteral {
    pub value: f64,
    pub type_hint: Option<ElementaryKind>,
    #[serde(skip)]
    pub span: SourceSpan,
}

/// A bit string literal (BYTE/WORD/DWORD/LWORD value).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BitStringLiteral {
    pub value: u64,
    pub type_hint: Option<ElementaryKind>,
    #[serde(skip)]
    pub span: SourceSpan,
}

/// A character string literal, narrow or wide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterStringLiteral {
    pub value: String,
    pub wide: bool,
    #[serde(skip)]
    pub span: SourceSpan,
}

/// Container for literal constants. Every constant carries its type,
/// either directly or via a hint bound during type checking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Traverse)]
pub enum ConstantKind {
    Bool(BoolLiteral),
    Integer(IntegerLiteral),
    Real(RealLiteral),
    BitString(BitStringLiteral),
    CharacterString(CharacterStringLiteral),
    Duration(DurationLiteral),
    Date(DateLiteral),
    TimeOfDay(TimeOfDayLiteral),
    DateAndTime(DateAndTimeLiteral),
    Enumerated(EnumeratedValue),
}

impl ConstantKind {
    pub fn bool(value: bool) -> Self {
        ConstantKind::Bool(BoolLiteral {
            value,
            span: SourceSpan::default(),
        })
    }

    pub fn integer(value: i128) -> Self {
        ConstantKind::Integer(IntegerLiteral {
            value,
            type_hint: None,
            span: SourceSpan::default(),
        })
    }

    pub fn real(value: f64) -> Self {
        ConstantKind::Real(RealLiteral {
            value,
            type_hint: None,
            span: SourceSpan::default(),
        })
    }

    pub fn duration(literal: DurationLiteral) -> Self {
        ConstantKind::Duration(literal)
    }

    pub fn character_string(value: &str) -> Self {
        ConstantKind::CharacterString(CharacterStringLiteral {
            value: value.to_owned(),
            wide: false,
            span: SourceSpan::default(),
        })
    }

    pub fn enumerated(type_name: &str, variant: &str) -> Self {
        ConstantKind::Enumerated(EnumeratedValue::qualified(type_name, variant))
    }
}

/// Declares an element contained within a structure.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Traverse)]
pub struct StructureMember {
    pub name: Id,
    pub type_ref: TypeRef,
    pub initial: Option<ConstantKind>,
    #[traverse(skip)]
    pub description: String,
}

impl StructureMember {
    pub fn new(name: &str, type_ref: TypeRef) -> Self {
        Self {
            name: Id::from(name),
            type_ref,
            initial: None,
            description: String::new(),
        }
    }
}

/// Structure declaration: an ordered combination of named, typed
/// members accessed by name. Structures may be nested but must not
/// contain an instance of themselves.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Traverse)]
pub struct StructureDefinition {
    pub type_name: TypeName,
    pub members: Vec<StructureMember>,
}

impl StructureDefinition {
    /// Creates a structure definition, rejecting duplicate member
    /// names.
    pub fn new(type_name: &str, members: Vec<StructureMember>) -> Result<Self, Diagnostic> {
        let mut seen: HashSet<&Id> = HashSet::new();
        for member in &members {
            if !seen.insert(&member.name) {
                return Err(Diagnostic::problem(
                    Problem::DuplicateName,
                    Label::span(member.name.span(), "Structure member"),
                )
                .with_context("structure", type_name)
                .with_context_id("member", &member.name));
            }
        }
        Ok(Self {
            type_name: TypeName::from(type_name),
            members,
        })
    }
}

/// A single named variant in an enumeration declaration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Traverse)]
pub struct EnumVariantDecl {
    pub name: Id,
    #[traverse(skip)]
    pub value: i64,
}

impl EnumVariantDecl {
    pub fn new(name: &str, value: i64) -> Self {
        Self {
            name: Id::from(name),
            value,
        }
    }
}

/// Enumeration declaration: named variants with distinct integer
/// values. The first variant is the default value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Traverse)]
pub struct EnumerationDefinition {
    pub type_name: TypeName,
    pub variants: Vec<EnumVariantDecl>,
}

impl EnumerationDefinition {
    /// Creates an enumeration definition, rejecting duplicate variant
    /// names and duplicate values.
    pub fn new(type_name: &str, variants: Vec<EnumVariantDecl>) -> Result<Self, Diagnostic> {
        let mut names: HashSet<&Id> = HashSet::new();
        let mut values: HashSet<i64> = HashSet::new();
        for variant in &variants {
            if !names.insert(&variant.name) {
                return Err(Diagnostic::problem(
                    Problem::DuplicateName,
                    Label::span(variant.name.span(), "Enumeration variant"),
                )
                .with_context("enumeration", type_name)
                .with_context_id("variant", &variant.name));
            }
            if !values.insert(variant.value) {
                return Err(Diagnostic::problem(
                    Problem::InvalidLiteral,
                    Label::span(variant.name.span(), "Enumeration variant"),
                )
                .with_context("enumeration", type_name)
                .with_context("value", &variant.value.to_string()));
            }
        }
        Ok(Self {
            type_name: TypeName::from(type_name),
            variants,
        })
    }

    /// Looks up the integer value of a variant.
    pub fn value_of(&self, variant: &Id) -> Option<i64> {
        self.variants
            .iter()
            .find(|v| &v.name == variant)
            .map(|v| v.value)
    }
}

/// Type alias declaration: a new name for an existing type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Traverse)]
pub struct AliasDefinition {
    pub type_name: TypeName,
    pub target: TypeRef,
}

/// Subrange declaration: narrows an integer type to the inclusive
/// range `[lower, upper]`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Traverse)]
pub struct SubrangeDefinition {
    pub type_name: TypeName,
    #[traverse(skip)]
    pub base: ElementaryKind,
    #[traverse(skip)]
    pub lower: i64,
    #[traverse(skip)]
    pub upper: i64,
}

impl SubrangeDefinition {
    pub fn new(
        type_name: &str,
        base: ElementaryKind,
        lower: i64,
        upper: i64,
    ) -> Result<Self, Diagnostic> {
        if lower > upper {
            return Err(Diagnostic::problem(
                Problem::InvalidLiteral,
                Label::span(
                    SourceSpan::default(),
                    format!("Subrange [{}..{}] is descending", lower, upper),
                ),
            )
            .with_context("subrange", type_name));
        }
        Ok(Self {
            type_name: TypeName::from(type_name),
            base,
            lower,
            upper,
        })
    }
}

/// Kinds of user-defined data types.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Traverse)]
pub enum TypeDefinitionKind {
    Structure(StructureDefinition),
    Enumeration(EnumerationDefinition),
    Alias(AliasDefinition),
    Subrange(SubrangeDefinition),
}

impl TypeDefinitionKind {
    pub fn type_name(&self) -> &TypeName {
        match self {
            TypeDefinitionKind::Structure(def) => &def.type_name,
            TypeDefinitionKind::Enumeration(def) => &def.type_name,
            TypeDefinitionKind::Alias(def) => &def.type_name,
            TypeDefinitionKind::Subrange(def) => &def.type_name,
        }
    }
}

/// The role a variable plays in a POU, determined by the declaration
/// block that contains it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VarRole {
    Input,
    Output,
    InOut,
    Static,
    Temp,
    Constant,
}

impl fmt::Display for VarRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keyword = match self {
            VarRole::Input => "VAR_INPUT",
            VarRole::Output => "VAR_OUTPUT",
            VarRole::InOut => "VAR_IN_OUT",
            VarRole::Static => "VAR",
            VarRole::Temp => "VAR_TEMP",
            VarRole::Constant => "VAR CONSTANT",
        };
        f.write_str(keyword)
    }
}

/// Variable declaration.
///
/// The declaration does not carry a role; the role is determined by
/// which interface block contains the declaration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Traverse)]
pub struct VarDecl {
    pub name: Id,
    pub type_ref: TypeRef,
    pub initial: Option<ConstantKind>,
    #[traverse(skip)]
    pub description: String,
}

impl VarDecl {
    pub fn new(name: &str, type_ref: TypeRef) -> Self {
        Self {
            name: Id::from(name),
            type_ref,
            initial: None,
            description: String::new(),
        }
    }

    pub fn bool(name: &str) -> Self {
        VarDecl::new(name, TypeRef::BOOL)
    }

    pub fn int(name: &str) -> Self {
        VarDecl::new(name, TypeRef::INT)
    }

    pub fn real(name: &str) -> Self {
        VarDecl::new(name, TypeRef::REAL)
    }

    /// Creates an instance declaration for a named function block type.
    pub fn instance(name: &str, type_name: &str) -> Self {
        VarDecl::new(name, TypeRef::named(type_name))
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

impl Located for VarDecl {
    fn span(&self) -> SourceSpan {
        self.name.span()
    }
}

/// The variable interface of a POU or method.
///
/// Each block encodes its role structurally: declarations carry no
/// direction of their own. Blocks are ordered and names are unique
/// across the whole interface.
#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize, Traverse)]
pub struct Interface {
    pub inputs: Vec<VarDecl>,
    pub outputs: Vec<VarDecl>,
    pub inouts: Vec<VarDecl>,
    pub statics: Vec<VarDecl>,
    pub temps: Vec<VarDecl>,
    pub constants: Vec<VarDecl>,
}

impl Interface {
    pub fn new() -> Self {
        Self::default()
    }

    /// All declarations in block order, with the role of the block
    /// that holds each declaration.
    pub fn iter(&self) -> impl Iterator<Item = (VarRole, &VarDecl)> {
        self.inputs
            .iter()
            .map(|v| (VarRole::Input, v))
            .chain(self.outputs.iter().map(|v| (VarRole::Output, v)))
            .chain(self.inouts.iter().map(|v| (VarRole::InOut, v)))
            .chain(self.statics.iter().map(|v| (VarRole::Static, v)))
            .chain(self.temps.iter().map(|v| (VarRole::Temp, v)))
            .chain(self.constants.iter().map(|v| (VarRole::Constant, v)))
    }

    /// Finds a declaration by name, returning its role.
    pub fn find(&self, name: &Id) -> Option<(VarRole, &VarDecl)> {
        self.iter().find(|(_, decl)| &decl.name == name)
    }

    pub fn block(&self, role: VarRole) -> &Vec<VarDecl> {
        match role {
            VarRole::Input => &self.inputs,
            VarRole::Output => &self.outputs,
            VarRole::InOut => &self.inouts,
            VarRole::Static => &self.statics,
            VarRole::Temp => &self.temps,
            VarRole::Constant => &self.constants,
        }
    }

    pub fn block_mut(&mut self, role: VarRole) -> &mut Vec<VarDecl> {
        match role {
            VarRole::Input => &mut self.inputs,
            VarRole::Output => &mut self.outputs,
            VarRole::InOut => &mut self.inouts,
            VarRole::Static => &mut self.statics,
            VarRole::Temp => &mut self.temps,
            VarRole::Constant => &mut self.constants,
        }
    }
}

/// Kinds of program organization units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PouKind {
    /// Stateless, returns a typed value.
    Function,
    /// Stateful and instantiable; static variables persist across
    /// scans.
    FunctionBlock,
    /// A function block singleton bound into a task.
    Program,
}

impl fmt::Display for PouKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keyword = match self {
            PouKind::Function => "FUNCTION",
            PouKind::FunctionBlock => "FUNCTION_BLOCK",
            PouKind::Program => "PROGRAM",
        };
        f.write_str(keyword)
    }
}

/// The body of a POU: a statement list, a sequential function chart,
/// or nothing yet.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Traverse)]
pub enum BodyKind {
    Statements(Vec<StmtKind>),
    Chart(Chart),
    Empty,
}

impl BodyKind {
    pub fn statements(&self) -> Option<&Vec<StmtKind>> {
        match self {
            BodyKind::Statements(statements) => Some(statements),
            _ => None,
        }
    }

    pub fn chart(&self) -> Option<&Chart> {
        match self {
            BodyKind::Chart(chart) => Some(chart),
            _ => None,
        }
    }
}

/// An inner function defined on a function block. The body may read
/// and assign the enclosing function block's variables.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Traverse)]
pub struct Method {
    pub name: Id,
    pub return_type: Option<TypeRef>,
    pub interface: Interface,
    pub body: Vec<StmtKind>,
}

/// Program organization unit declaration.
///
/// A POU is constructed once, at compile time, and never mutated
/// afterwards; passes that change a POU produce a new value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Traverse)]
pub struct Pou {
    #[traverse(skip)]
    pub kind: PouKind,
    pub name: Id,
    /// Return type, for function POUs only.
    pub return_type: Option<TypeRef>,
    /// Parent function block type for EXTENDS-style inheritance.
    pub parent: Option<TypeName>,
    pub interface: Interface,
    pub body: BodyKind,
    pub methods: Vec<Method>,
}

impl Pou {
    pub fn function_block(name: &str) -> Self {
        Self {
            kind: PouKind::FunctionBlock,
            name: Id::from(name),
            return_type: None,
            parent: None,
            interface: Interface::new(),
            body: BodyKind::Empty,
            methods: vec![],
        }
    }

    pub fn program(name: &str) -> Self {
        Self {
            kind: PouKind::Program,
            ..Pou::function_block(name)
        }
    }

    pub fn function(name: &str, return_type: TypeRef) -> Self {
        Self {
            kind: PouKind::Function,
            return_type: Some(return_type),
            ..Pou::function_block(name)
        }
    }

    pub fn with_interface(mut self, interface: Interface) -> Self {
        self.interface = interface;
        self
    }

    pub fn with_body(mut self, statements: Vec<StmtKind>) -> Self {
        self.body = BodyKind::Statements(statements);
        self
    }

    pub fn with_chart(mut self, chart: Chart) -> Self {
        self.body = BodyKind::Chart(chart);
        self
    }

    pub fn with_parent(mut self, parent: &str) -> Self {
        self.parent = Some(TypeName::from(parent));
        self
    }
}

impl Located for Pou {
    fn span(&self) -> SourceSpan {
        self.name.span()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimension_when_single_element_then_accepted() {
        let dim = Dimension::new(3, 3).unwrap();
        assert_eq!(dim.len(), 1);
    }

    #[test]
    fn dimension_when_descending_then_invalid_literal() {
        let err = Dimension::new(4, 3).unwrap_err();
        assert!(err.is_problem(Problem::InvalidLiteral));
    }

    #[test]
    fn enumeration_when_duplicate_value_then_error() {
        let err = EnumerationDefinition::new(
            "Mode",
            vec![
                EnumVariantDecl::new("Off", 0),
                EnumVariantDecl::new("On", 0),
            ],
        )
        .unwrap_err();
        assert!(err.is_problem(Problem::InvalidLiteral));
    }

    #[test]
    fn enumeration_when_duplicate_name_then_error() {
        let err = EnumerationDefinition::new(
            "Mode",
            vec![
                EnumVariantDecl::new("Off", 0),
                EnumVariantDecl::new("OFF", 1),
            ],
        )
        .unwrap_err();
        assert!(err.is_problem(Problem::DuplicateName));
    }

    #[test]
    fn structure_when_duplicate_member_then_error() {
        let err = StructureDefinition::new(
            "Recipe",
            vec![
                StructureMember::new("amount", TypeRef::REAL),
                StructureMember::new("amount", TypeRef::REAL),
            ],
        )
        .unwrap_err();
        assert!(err.is_problem(Problem::DuplicateName));
    }

    #[test]
    fn interface_when_find_then_role_and_decl() {
        let mut interface = Interface::new();
        interface.inputs.push(VarDecl::bool("cmd"));
        interface.statics.push(VarDecl::int("count"));

        let (role, decl) = interface.find(&Id::from("count")).unwrap();
        assert_eq!(role, VarRole::Static);
        assert_eq!(decl.type_ref, TypeRef::INT);
    }

    #[test]
    fn type_ref_when_display_array_then_iec_syntax() {
        let array = TypeRef::array(
            TypeRef::INT,
            vec![Dimension::new(0, 9).unwrap(), Dimension::new(1, 3).unwrap()],
        );
        assert_eq!(format!("{}", array), "ARRAY [0..9, 1..3] OF INT");
    }
}
