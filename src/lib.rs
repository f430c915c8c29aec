//! `dwmat` is a library for materializing program-level type information
//! from [DWARF](https://dwarfstd.org/) (v2-v5) debuging information.
//!
//! Instead of exposing raw DIEs, `dwmat` walks the debugging information
//! into a memoized graph of type descriptors (integers, floats,
//! compounds, enums, typedefs, pointers, arrays, functions, qualified
//! wrappers) and answers name lookups against it: "the type named N" and
//! "the object (variable / function / enumerator) named N". Cycles in the
//! type graph are broken with lazily evaluated member and parameter
//! types, so `struct node { struct node *next; }` materializes without
//! fix-point evaluation.

pub mod dwarf;
pub mod format;
pub mod index;
pub mod materialize;
pub mod object;
pub mod types;

pub use crate::dwarf::{ByteOrder, DieId, Dwarf};
pub use crate::index::NameIndex;
pub use crate::materialize::TypeCache;
pub use crate::object::{FindObjectFlags, Object, ObjectValue};
pub use crate::types::{
    CompoundKind, EnumValue, Enumerator, Language, LazyType, Member, Parameter, QualifiedType,
    Qualifiers, Type, TypeKind,
};

/// Error type for loading DWARF information and materializing types
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A required attribute is missing or of an unexpected form, an
    /// encoding is unknown, or the DIE structure is invalid.
    #[error("malformed DWARF: {0}")]
    MalformedDwarf(String),

    /// Array dimension arithmetic exceeded 64 bits.
    #[error("{0} is too large")]
    Overflow(&'static str),

    /// Type resolution recursed past the depth limit.
    #[error("maximum DWARF type resolution depth exceeded")]
    RecursionLimit,

    /// The requested object exists but has neither an address nor a value.
    #[error("{0}")]
    Lookup(String),

    #[error("object failed to parse file")]
    ObjectError(#[from] ::object::Error),

    #[error("gimli failed to parse DWARF")]
    GimliError(#[from] gimli::Error),

    #[error("failed when attempting to get some CU")]
    CUError(String),

    #[error("failed when attempting to get some DIE")]
    DIEError(String),
}

pub(crate) fn malformed(msg: impl Into<String>) -> Error {
    Error::MalformedDwarf(msg.into())
}
