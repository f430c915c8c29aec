//! Materialized type descriptors
//!
//! Descriptors are plain values produced once per DIE and shared through
//! `Rc`, so resolving the same entry twice hands back pointer-equal
//! types. Member and parameter types stay lazy until someone asks for
//! them, which is what lets cyclic graphs materialize.

use std::rc::Rc;

use gimli::DwTag;

use crate::dwarf::DieId;
use crate::materialize::TypeCache;
use crate::Error;

bitflags::bitflags! {
    /// Type qualifiers accumulated across nested qualifier DIEs.
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
    pub struct Qualifiers: u8 {
        const CONST = 1 << 0;
        const RESTRICT = 1 << 1;
        const VOLATILE = 1 << 2;
        const ATOMIC = 1 << 3;
    }
}

/// Discriminant of a materialized type descriptor.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TypeKind {
    Void,
    Int,
    Bool,
    Float,
    Complex,
    Struct,
    Union,
    Class,
    Enum,
    Typedef,
    Pointer,
    Array,
    Function,
}

/// Flavor of a compound type.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CompoundKind {
    Struct,
    Union,
    Class,
}

impl CompoundKind {
    pub(crate) fn type_kind(self) -> TypeKind {
        match self {
            CompoundKind::Struct => TypeKind::Struct,
            CompoundKind::Union => TypeKind::Union,
            CompoundKind::Class => TypeKind::Class,
        }
    }

    pub(crate) fn tag(self) -> DwTag {
        match self {
            CompoundKind::Struct => gimli::DW_TAG_structure_type,
            CompoundKind::Union => gimli::DW_TAG_union_type,
            CompoundKind::Class => gimli::DW_TAG_class_type,
        }
    }

    /// The C keyword introducing the compound.
    pub fn keyword(self) -> &'static str {
        match self {
            CompoundKind::Struct => "struct",
            CompoundKind::Union => "union",
            CompoundKind::Class => "class",
        }
    }
}

/// A type descriptor plus the qualifiers it was reached through.
#[derive(Clone, Debug)]
pub struct QualifiedType {
    pub typ: Rc<Type>,
    pub qualifiers: Qualifiers,
}

impl QualifiedType {
    pub(crate) fn unqualified(typ: Rc<Type>) -> Self {
        QualifiedType {
            typ,
            qualifiers: Qualifiers::empty(),
        }
    }
}

/// A field of a struct, union, or class.
#[derive(Debug)]
pub struct Member {
    pub name: Option<String>,
    pub typ: LazyType,
    /// Offset in bits from the start of the compound.
    pub bit_offset: u64,
    /// Width in bits for bit fields, `None` otherwise.
    pub bit_field_size: Option<u64>,
}

/// A formal parameter of a function type.
#[derive(Debug)]
pub struct Parameter {
    pub name: Option<String>,
    pub typ: LazyType,
}

/// A named constant of an enumeration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Enumerator {
    pub name: String,
    pub value: EnumValue,
}

/// An enumerator value, preserving the signedness the producer encoded.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EnumValue {
    Signed(i64),
    Unsigned(u64),
}

/// How an object of some type stores its value.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Storage {
    Signed,
    Unsigned,
    Float,
    Buffer,
    None,
}

/// A deferred type reference carrying only the identity of the target
/// DIE plus the incomplete-array flag of the context it was found in.
///
/// Members and parameters hold one of these instead of a resolved type so
/// that a compound can be built without recursing into every member: the
/// member of `struct node` that points back at `struct node` is never
/// followed while the struct itself is still being materialized.
/// Evaluation re-enters the memoization core: after the first read every
/// further evaluation is a memo hit returning the same descriptor.
#[derive(Copy, Clone, Debug)]
pub struct LazyType {
    die: DieId,
    can_be_incomplete_array: bool,
}

impl LazyType {
    pub(crate) fn thunk(die: DieId, can_be_incomplete_array: bool) -> Self {
        LazyType {
            die,
            can_be_incomplete_array,
        }
    }

    /// Resolve the referenced type, materializing it on first use.
    pub fn evaluate(&self, cache: &TypeCache) -> Result<QualifiedType, Error> {
        cache.type_from_die_with(self.die, self.can_be_incomplete_array)
    }
}

/// A materialized type descriptor.
#[derive(Debug)]
pub struct Type {
    lang: Option<Language>,
    repr: TypeRepr,
}

#[derive(Debug)]
pub(crate) enum TypeRepr {
    Void,
    Int {
        name: String,
        size: u64,
        is_signed: bool,
    },
    Bool {
        name: String,
        size: u64,
    },
    Float {
        name: String,
        size: u64,
    },
    Complex {
        name: String,
        size: u64,
        real: Rc<Type>,
    },
    Compound {
        kind: CompoundKind,
        tag: Option<String>,
        /// `None` for declaration-only compounds.
        def: Option<CompoundDef>,
    },
    Enum {
        tag: Option<String>,
        /// `None` for declaration-only enums.
        def: Option<EnumDef>,
    },
    Typedef {
        name: String,
        aliased: QualifiedType,
    },
    Pointer {
        referenced: QualifiedType,
        size: u64,
    },
    Array {
        element: QualifiedType,
        /// `None` when the outermost dimension has no known length.
        length: Option<u64>,
    },
    Function {
        return_type: QualifiedType,
        parameters: Vec<Parameter>,
        is_variadic: bool,
    },
}

#[derive(Debug)]
pub(crate) struct CompoundDef {
    pub size: u64,
    pub members: Vec<Member>,
}

#[derive(Debug)]
pub(crate) struct EnumDef {
    pub compatible: Rc<Type>,
    pub enumerators: Vec<Enumerator>,
}

impl Type {
    pub(crate) fn new(lang: Option<Language>, repr: TypeRepr) -> Rc<Type> {
        Rc::new(Type { lang, repr })
    }

    pub(crate) fn repr(&self) -> &TypeRepr {
        &self.repr
    }

    pub fn kind(&self) -> TypeKind {
        match &self.repr {
            TypeRepr::Void => TypeKind::Void,
            TypeRepr::Int { .. } => TypeKind::Int,
            TypeRepr::Bool { .. } => TypeKind::Bool,
            TypeRepr::Float { .. } => TypeKind::Float,
            TypeRepr::Complex { .. } => TypeKind::Complex,
            TypeRepr::Compound { kind, .. } => kind.type_kind(),
            TypeRepr::Enum { .. } => TypeKind::Enum,
            TypeRepr::Typedef { .. } => TypeKind::Typedef,
            TypeRepr::Pointer { .. } => TypeKind::Pointer,
            TypeRepr::Array { .. } => TypeKind::Array,
            TypeRepr::Function { .. } => TypeKind::Function,
        }
    }

    pub fn language(&self) -> Option<Language> {
        self.lang
    }

    /// Declared name of a base type or typedef, tag name of a compound or
    /// enum.
    pub fn name(&self) -> Option<&str> {
        match &self.repr {
            TypeRepr::Int { name, .. }
            | TypeRepr::Bool { name, .. }
            | TypeRepr::Float { name, .. }
            | TypeRepr::Complex { name, .. }
            | TypeRepr::Typedef { name, .. } => Some(name),
            TypeRepr::Compound { tag, .. } | TypeRepr::Enum { tag, .. } => tag.as_deref(),
            _ => None,
        }
    }

    /// Whether the type has a definition. Declaration-only compounds and
    /// enums, incomplete arrays, and void are incomplete.
    pub fn is_complete(&self) -> bool {
        match &self.repr {
            TypeRepr::Void => false,
            TypeRepr::Compound { def, .. } => def.is_some(),
            TypeRepr::Enum { def, .. } => def.is_some(),
            TypeRepr::Array { length, .. } => length.is_some(),
            _ => true,
        }
    }

    /// Whether this descriptor is an incomplete array, or a typedef of
    /// one.
    pub fn is_incomplete_array(&self) -> bool {
        match &self.repr {
            TypeRepr::Array { length, .. } => length.is_none(),
            TypeRepr::Typedef { aliased, .. } => aliased.typ.is_incomplete_array(),
            _ => false,
        }
    }

    /// Size in bytes, when the type has one.
    pub fn size(&self) -> Option<u64> {
        match &self.repr {
            TypeRepr::Void | TypeRepr::Function { .. } => None,
            TypeRepr::Int { size, .. }
            | TypeRepr::Bool { size, .. }
            | TypeRepr::Float { size, .. }
            | TypeRepr::Complex { size, .. }
            | TypeRepr::Pointer { size, .. } => Some(*size),
            TypeRepr::Compound { def, .. } => def.as_ref().map(|def| def.size),
            TypeRepr::Enum { def, .. } => def.as_ref().and_then(|def| def.compatible.size()),
            TypeRepr::Typedef { aliased, .. } => aliased.typ.size(),
            TypeRepr::Array { element, length } => {
                length.and_then(|length| length.checked_mul(element.typ.size()?))
            }
        }
    }

    /// Signedness of an integer-like type. Enums defer to their
    /// compatible type, typedefs to their target.
    pub fn is_signed(&self) -> bool {
        match &self.repr {
            TypeRepr::Int { is_signed, .. } => *is_signed,
            TypeRepr::Enum { def: Some(def), .. } => def.compatible.is_signed(),
            TypeRepr::Typedef { aliased, .. } => aliased.typ.is_signed(),
            _ => false,
        }
    }

    /// Members of a complete compound.
    pub fn members(&self) -> Option<&[Member]> {
        match &self.repr {
            TypeRepr::Compound { def: Some(def), .. } => Some(&def.members),
            _ => None,
        }
    }

    /// Enumerators of a complete enum.
    pub fn enumerators(&self) -> Option<&[Enumerator]> {
        match &self.repr {
            TypeRepr::Enum { def: Some(def), .. } => Some(&def.enumerators),
            _ => None,
        }
    }

    /// The integer type an enum is compatible with.
    pub fn compatible_type(&self) -> Option<&Rc<Type>> {
        match &self.repr {
            TypeRepr::Enum { def: Some(def), .. } => Some(&def.compatible),
            _ => None,
        }
    }

    /// The component type of a complex type.
    pub fn real_type(&self) -> Option<&Rc<Type>> {
        match &self.repr {
            TypeRepr::Complex { real, .. } => Some(real),
            _ => None,
        }
    }

    /// The type a typedef renames.
    pub fn aliased(&self) -> Option<&QualifiedType> {
        match &self.repr {
            TypeRepr::Typedef { aliased, .. } => Some(aliased),
            _ => None,
        }
    }

    /// The type a pointer refers to.
    pub fn referenced(&self) -> Option<&QualifiedType> {
        match &self.repr {
            TypeRepr::Pointer { referenced, .. } => Some(referenced),
            _ => None,
        }
    }

    /// The element type of an array.
    pub fn element(&self) -> Option<&QualifiedType> {
        match &self.repr {
            TypeRepr::Array { element, .. } => Some(element),
            _ => None,
        }
    }

    /// The length of an array; `None` when incomplete.
    pub fn length(&self) -> Option<u64> {
        match &self.repr {
            TypeRepr::Array { length, .. } => *length,
            _ => None,
        }
    }

    /// The return type of a function type.
    pub fn return_type(&self) -> Option<&QualifiedType> {
        match &self.repr {
            TypeRepr::Function { return_type, .. } => Some(return_type),
            _ => None,
        }
    }

    /// The parameters of a function type.
    pub fn parameters(&self) -> Option<&[Parameter]> {
        match &self.repr {
            TypeRepr::Function { parameters, .. } => Some(parameters),
            _ => None,
        }
    }

    pub fn is_variadic(&self) -> bool {
        matches!(
            &self.repr,
            TypeRepr::Function {
                is_variadic: true,
                ..
            }
        )
    }

    pub fn compound_kind(&self) -> Option<CompoundKind> {
        match &self.repr {
            TypeRepr::Compound { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    pub(crate) fn storage(&self) -> Storage {
        match &self.repr {
            TypeRepr::Int {
                is_signed: true, ..
            } => Storage::Signed,
            TypeRepr::Int { .. } | TypeRepr::Bool { .. } | TypeRepr::Pointer { .. } => {
                Storage::Unsigned
            }
            TypeRepr::Float { .. } => Storage::Float,
            TypeRepr::Enum { def: Some(def), .. } => def.compatible.storage(),
            TypeRepr::Typedef { aliased, .. } => aliased.typ.storage(),
            TypeRepr::Complex { .. }
            | TypeRepr::Compound { def: Some(_), .. }
            | TypeRepr::Array {
                length: Some(_), ..
            } => Storage::Buffer,
            _ => Storage::None,
        }
    }
}

/// Collects the members of a struct, union, or class before the
/// descriptor is created.
#[derive(Debug)]
pub(crate) struct CompoundBuilder {
    kind: CompoundKind,
    members: Vec<Member>,
}

impl CompoundBuilder {
    pub fn new(kind: CompoundKind) -> Self {
        CompoundBuilder {
            kind,
            members: Vec::new(),
        }
    }

    pub fn add_member(&mut self, member: Member) {
        self.members.push(member);
    }

    pub fn build(self, tag: Option<String>, size: u64, lang: Option<Language>) -> Rc<Type> {
        Type::new(
            lang,
            TypeRepr::Compound {
                kind: self.kind,
                tag,
                def: Some(CompoundDef {
                    size,
                    members: self.members,
                }),
            },
        )
    }
}

/// Collects enumerators before the enum descriptor is created.
#[derive(Debug)]
pub(crate) struct EnumBuilder {
    enumerators: Vec<Enumerator>,
}

impl EnumBuilder {
    pub fn new() -> Self {
        EnumBuilder {
            enumerators: Vec::new(),
        }
    }

    pub fn add_signed(&mut self, name: String, value: i64) {
        self.enumerators.push(Enumerator {
            name,
            value: EnumValue::Signed(value),
        });
    }

    pub fn add_unsigned(&mut self, name: String, value: u64) {
        self.enumerators.push(Enumerator {
            name,
            value: EnumValue::Unsigned(value),
        });
    }

    pub fn build(
        self,
        tag: Option<String>,
        compatible: Rc<Type>,
        lang: Option<Language>,
    ) -> Rc<Type> {
        Type::new(
            lang,
            TypeRepr::Enum {
                tag,
                def: Some(EnumDef {
                    compatible,
                    enumerators: self.enumerators,
                }),
            },
        )
    }
}

/// Collects parameters before the function descriptor is created.
#[derive(Debug)]
pub(crate) struct FunctionBuilder {
    parameters: Vec<Parameter>,
}

impl FunctionBuilder {
    pub fn new() -> Self {
        FunctionBuilder {
            parameters: Vec::new(),
        }
    }

    pub fn add_parameter(&mut self, name: Option<String>, typ: LazyType) {
        self.parameters.push(Parameter { name, typ });
    }

    pub fn build(
        self,
        return_type: QualifiedType,
        is_variadic: bool,
        lang: Option<Language>,
    ) -> Rc<Type> {
        Type::new(
            lang,
            TypeRepr::Function {
                return_type,
                parameters: self.parameters,
                is_variadic,
            },
        )
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types)]
pub enum Language {
    /// ISO C:1989
    C89,
    /// Non-standardized C, such as K&R
    C,
    /// ISO Ada:1983
    Ada83,
    // ISO C++98
    C_plus_plus,
    /// ISO COBOL:1974
    Cobol74,
    /// ISO COBOL:1985
    Cobol85,
    /// ISO FORTRAN:1977
    Fortran77,
    /// ISO Fortran:1990
    Fortran90,
    /// ISO Pascal:1983
    Pascal83,
    /// ISO Modula-2:1996
    Modula2,
    /// Java
    Java,
    /// ISO C:1999
    C99,
    /// ISO Ada:1995
    Ada95,
    /// ISO Fortran:1995
    Fortran95,
    /// ANSI PL/I:1976
    PLI,
    /// Objective C
    ObjC,
    /// Objective C++
    ObjC_plus_plus,
    /// UPC (Unified Parallel C)
    UPC,
    /// D
    D,
    /// Python
    Python,
    /// OpenCL
    OpenCL,
    /// Go
    Go,
    /// Modula-3
    Modula3,
    /// Haskell
    Haskell,
    /// ISO C++03
    C_plus_plus_03,
    /// ISO C++11
    C_plus_plus_11,
    /// OCaml
    OCaml,
    /// Rust
    Rust,
    /// ISO C:2011
    C11,
    /// Swift
    Swift,
    /// Julia
    Julia,
    /// Dylan
    Dylan,
    /// ISO C++14
    C_plus_plus_14,
    /// ISO Fortran:2004
    Fortran03,
    /// ISO Fortran:2010
    Fortran08,
    /// RenderScript Kernel Language
    RenderScript,
    /// BLISS
    BLISS,
    /// Vendor Extension
    Vendor(u16),
}

impl Language {
    pub(crate) fn from_dwarf(lang: gimli::DwLang) -> Option<Language> {
        if lang.0 >= 0x8000 {
            return Some(Language::Vendor(lang.0));
        }
        lang.0.try_into().ok()
    }
}

impl TryFrom<u16> for Language {
    type Error = ();

    fn try_from(v: u16) -> Result<Self, Self::Error> {
        match v {
            1 => Ok(Language::C89),
            2 => Ok(Language::C),
            3 => Ok(Language::Ada83),
            4 => Ok(Language::C_plus_plus),
            5 => Ok(Language::Cobol74),
            6 => Ok(Language::Cobol85),
            7 => Ok(Language::Fortran77),
            8 => Ok(Language::Fortran90),
            9 => Ok(Language::Pascal83),
            10 => Ok(Language::Modula2),
            11 => Ok(Language::Java),
            12 => Ok(Language::C99),
            13 => Ok(Language::Ada95),
            14 => Ok(Language::Fortran95),
            15 => Ok(Language::PLI),
            16 => Ok(Language::ObjC),
            17 => Ok(Language::ObjC_plus_plus),
            18 => Ok(Language::UPC),
            19 => Ok(Language::D),
            20 => Ok(Language::Python),
            21 => Ok(Language::OpenCL),
            22 => Ok(Language::Go),
            23 => Ok(Language::Modula3),
            24 => Ok(Language::Haskell),
            25 => Ok(Language::C_plus_plus_03),
            26 => Ok(Language::C_plus_plus_11),
            27 => Ok(Language::OCaml),
            28 => Ok(Language::Rust),
            29 => Ok(Language::C11),
            30 => Ok(Language::Swift),
            31 => Ok(Language::Julia),
            32 => Ok(Language::Dylan),
            33 => Ok(Language::C_plus_plus_14),
            34 => Ok(Language::Fortran03),
            35 => Ok(Language::Fortran08),
            36 => Ok(Language::RenderScript),
            37 => Ok(Language::BLISS),
            _ => Err(()),
        }
    }
}
