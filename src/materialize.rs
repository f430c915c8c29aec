//! Materialization of type descriptors from DIEs
//!
//! The cache drives everything: a request for a type lands in
//! [`TypeCache::type_from_die`], which memoizes per DIE and dispatches on
//! the DWARF tag. Compound members and function parameters come back as
//! thunks that re-enter the cache on first read, so reference cycles in
//! the debugging information never recurse here.
//!
//! A DIE can legitimately have two materializations: one where an
//! unsized outermost array dimension stays incomplete, and one where the
//! context (a struct member that is not last, a union member, an array
//! element) forces the length to zero. GCC before 9.0 encoded zero
//! length and unknown length identically, so the context is the only
//! signal. The two memo maps keep those materializations apart.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use gimli::DwTag;
use smallvec::SmallVec;

use crate::dwarf::{DieId, Dwarf, IntValue};
use crate::index::NameIndex;
use crate::types::{
    CompoundBuilder, CompoundKind, EnumBuilder, FunctionBuilder, Language, LazyType, Member,
    QualifiedType, Qualifiers, Type, TypeKind, TypeRepr,
};
use crate::{malformed, Error};

/// Resolution depth cap guarding against producer-induced cycles.
const MAX_DEPTH: usize = 1000;

#[derive(Clone)]
struct CacheEntry {
    typ: Rc<Type>,
    qualifiers: Qualifiers,
    is_incomplete_array: bool,
}

#[derive(Copy, Clone, Debug)]
struct ArrayDimension {
    length: u64,
    is_complete: bool,
}

/// Materializes and memoizes type descriptors for one loaded image.
///
/// The cache owns every descriptor it creates; a DIE materializes to
/// pointer-equal descriptors on every request for the lifetime of the
/// cache.
pub struct TypeCache<'d> {
    dwarf: &'d Dwarf<'d>,
    index: NameIndex,
    /// DIE -> type, as seen by contexts that allow incomplete arrays.
    primary: RefCell<HashMap<DieId, CacheEntry>>,
    /// DIE -> type with the outermost array length forced to zero. Only
    /// populated for the sparse set of DIEs whose primary materialization
    /// is an incomplete array.
    restricted: RefCell<HashMap<DieId, CacheEntry>>,
    depth: Cell<usize>,
    void_types: RefCell<HashMap<Option<Language>, Rc<Type>>>,
}

impl<'d> TypeCache<'d> {
    /// Build a cache (and its name index) over `dwarf`.
    pub fn new(dwarf: &'d Dwarf<'d>) -> Result<Self, Error> {
        Self::with_bias(dwarf, 0)
    }

    /// Like [`TypeCache::new`], with a load bias applied to every static
    /// address found through the index.
    pub fn with_bias(dwarf: &'d Dwarf<'d>, bias: u64) -> Result<Self, Error> {
        Ok(TypeCache {
            dwarf,
            index: NameIndex::build(dwarf, bias)?,
            primary: RefCell::new(HashMap::new()),
            restricted: RefCell::new(HashMap::new()),
            depth: Cell::new(0),
            void_types: RefCell::new(HashMap::new()),
        })
    }

    pub(crate) fn dwarf(&self) -> &'d Dwarf<'d> {
        self.dwarf
    }

    pub(crate) fn index(&self) -> &NameIndex {
        &self.index
    }

    /// Materialize the type a DIE describes.
    pub(crate) fn type_from_die(&self, die: DieId) -> Result<QualifiedType, Error> {
        self.type_from_die_internal(die, true, &mut false)
    }

    pub(crate) fn type_from_die_with(
        &self,
        die: DieId,
        can_be_incomplete_array: bool,
    ) -> Result<QualifiedType, Error> {
        self.type_from_die_internal(die, can_be_incomplete_array, &mut false)
    }

    fn type_from_die_internal(
        &self,
        die: DieId,
        can_be_incomplete_array: bool,
        is_incomplete_array_ret: &mut bool,
    ) -> Result<QualifiedType, Error> {
        if self.depth.get() >= MAX_DEPTH {
            return Err(Error::RecursionLimit);
        }

        if let Some(entry) = self.lookup_memo(die, can_be_incomplete_array) {
            *is_incomplete_array_ret = entry.is_incomplete_array;
            return Ok(QualifiedType {
                typ: entry.typ,
                qualifiers: entry.qualifiers,
            });
        }

        let lang = self.dwarf.die_language(die)?;
        let tag = self.dwarf.die_tag(die)?;

        self.depth.set(self.depth.get() + 1);
        let result = self.dispatch(die, tag, lang, can_be_incomplete_array);
        self.depth.set(self.depth.get() - 1);
        let (qualified, is_incomplete_array) = result?;

        let entry = CacheEntry {
            typ: qualified.typ.clone(),
            qualifiers: qualified.qualifiers,
            is_incomplete_array,
        };
        let map = if !can_be_incomplete_array && is_incomplete_array {
            &self.restricted
        } else {
            &self.primary
        };
        map.borrow_mut().insert(die, entry);
        *is_incomplete_array_ret = is_incomplete_array;
        Ok(qualified)
    }

    fn lookup_memo(&self, die: DieId, can_be_incomplete_array: bool) -> Option<CacheEntry> {
        let primary = self.primary.borrow();
        let entry = primary.get(&die)?;
        if !can_be_incomplete_array && entry.is_incomplete_array {
            // The caller needs the forced-to-zero materialization, which
            // may not exist yet.
            return self.restricted.borrow().get(&die).cloned();
        }
        Some(entry.clone())
    }

    fn dispatch(
        &self,
        die: DieId,
        tag: DwTag,
        lang: Option<Language>,
        can_be_incomplete_array: bool,
    ) -> Result<(QualifiedType, bool), Error> {
        let mut is_incomplete_array = false;
        let qualified = match tag {
            gimli::DW_TAG_const_type => {
                self.qualifier_type_from_die(die, tag, lang, Qualifiers::CONST)?
            }
            gimli::DW_TAG_restrict_type => {
                self.qualifier_type_from_die(die, tag, lang, Qualifiers::RESTRICT)?
            }
            gimli::DW_TAG_volatile_type => {
                self.qualifier_type_from_die(die, tag, lang, Qualifiers::VOLATILE)?
            }
            gimli::DW_TAG_atomic_type => {
                self.qualifier_type_from_die(die, tag, lang, Qualifiers::ATOMIC)?
            }
            gimli::DW_TAG_base_type => {
                QualifiedType::unqualified(self.base_type_from_die(die, lang)?)
            }
            gimli::DW_TAG_structure_type => QualifiedType::unqualified(
                self.compound_type_from_die(die, lang, CompoundKind::Struct)?,
            ),
            gimli::DW_TAG_union_type => QualifiedType::unqualified(
                self.compound_type_from_die(die, lang, CompoundKind::Union)?,
            ),
            gimli::DW_TAG_class_type => QualifiedType::unqualified(
                self.compound_type_from_die(die, lang, CompoundKind::Class)?,
            ),
            gimli::DW_TAG_enumeration_type => {
                QualifiedType::unqualified(self.enum_type_from_die(die, lang)?)
            }
            gimli::DW_TAG_typedef => QualifiedType::unqualified(self.typedef_type_from_die(
                die,
                lang,
                can_be_incomplete_array,
                &mut is_incomplete_array,
            )?),
            gimli::DW_TAG_pointer_type => {
                QualifiedType::unqualified(self.pointer_type_from_die(die, lang)?)
            }
            gimli::DW_TAG_array_type => QualifiedType::unqualified(self.array_type_from_die(
                die,
                lang,
                can_be_incomplete_array,
                &mut is_incomplete_array,
            )?),
            gimli::DW_TAG_subroutine_type | gimli::DW_TAG_subprogram => {
                QualifiedType::unqualified(self.function_type_from_die(die, tag, lang)?)
            }
            _ => return Err(malformed(format!("unknown DWARF type tag {tag}"))),
        };
        Ok((qualified, is_incomplete_array))
    }

    /// Materialize the type referenced by a DIE's DW_AT_type attribute.
    /// A missing attribute means void when the tag allows it.
    fn type_from_attr(
        &self,
        die: DieId,
        lang: Option<Language>,
        tag: DwTag,
        can_be_void: bool,
        can_be_incomplete_array: bool,
        is_incomplete_array_ret: &mut bool,
    ) -> Result<QualifiedType, Error> {
        match self.dwarf.die_type_ref(die)? {
            None => {
                if can_be_void {
                    Ok(QualifiedType::unqualified(self.void_type(lang)))
                } else {
                    Err(malformed(format!("{tag} is missing DW_AT_type")))
                }
            }
            Some(target) => {
                self.type_from_die_internal(target, can_be_incomplete_array, is_incomplete_array_ret)
            }
        }
    }

    pub(crate) fn variable_type(&self, die: DieId) -> Result<QualifiedType, Error> {
        let lang = self.dwarf.die_language(die)?;
        self.type_from_attr(die, lang, gimli::DW_TAG_variable, true, true, &mut false)
    }

    pub(crate) fn void_type(&self, lang: Option<Language>) -> Rc<Type> {
        self.void_types
            .borrow_mut()
            .entry(lang)
            .or_insert_with(|| Type::new(lang, TypeRepr::Void))
            .clone()
    }

    fn qualifier_type_from_die(
        &self,
        die: DieId,
        tag: DwTag,
        lang: Option<Language>,
        qualifier: Qualifiers,
    ) -> Result<QualifiedType, Error> {
        let mut qualified = self.type_from_attr(die, lang, tag, true, true, &mut false)?;
        qualified.qualifiers |= qualifier;
        Ok(qualified)
    }

    fn base_type_from_die(
        &self,
        die: DieId,
        lang: Option<Language>,
    ) -> Result<Rc<Type>, Error> {
        let name = self
            .dwarf
            .die_name(die)?
            .ok_or_else(|| malformed("DW_TAG_base_type has missing or invalid DW_AT_name"))?;
        let encoding = self.dwarf.die_encoding(die)?.ok_or_else(|| {
            malformed("DW_TAG_base_type has missing or invalid DW_AT_encoding")
        })?;
        let size = self.dwarf.die_byte_size(die)?.ok_or_else(|| {
            malformed("DW_TAG_base_type has missing or invalid DW_AT_byte_size")
        })?;

        match encoding {
            gimli::DW_ATE_boolean => Ok(Type::new(lang, TypeRepr::Bool { name, size })),
            gimli::DW_ATE_float => Ok(Type::new(lang, TypeRepr::Float { name, size })),
            gimli::DW_ATE_signed | gimli::DW_ATE_signed_char => Ok(Type::new(
                lang,
                TypeRepr::Int {
                    name,
                    size,
                    is_signed: true,
                },
            )),
            gimli::DW_ATE_unsigned | gimli::DW_ATE_unsigned_char => Ok(Type::new(
                lang,
                TypeRepr::Int {
                    name,
                    size,
                    is_signed: false,
                },
            )),
            gimli::DW_ATE_complex_float => {
                let child = self.dwarf.die_type_ref(die)?.ok_or_else(|| {
                    malformed("DW_TAG_base_type has missing or invalid DW_AT_type")
                })?;
                let real = self.type_from_die(child)?;
                if real.typ.kind() != TypeKind::Float && real.typ.kind() != TypeKind::Int {
                    return Err(malformed(
                        "DW_AT_type of DW_ATE_complex_float is not a floating-point or integer type",
                    ));
                }
                Ok(Type::new(
                    lang,
                    TypeRepr::Complex {
                        name,
                        size,
                        real: real.typ,
                    },
                ))
            }
            _ => Err(malformed(format!(
                "DW_TAG_base_type has unknown DWARF encoding {encoding}"
            ))),
        }
    }

    /// Search the index for the lone complete definition matching a
    /// declaration. Zero candidates and several candidates both mean "no
    /// definitive match": with several we can't know which one the
    /// declaration meant, so the caller keeps it incomplete rather than
    /// guessing.
    fn find_complete(&self, tag: DwTag, name: &str) -> Result<Option<Rc<Type>>, Error> {
        let tags = [tag];
        let mut candidates = self.index.iterate(name, &tags);
        let Some(first) = candidates.next() else {
            return Ok(None);
        };
        if candidates.next().is_some() {
            return Ok(None);
        }
        Ok(Some(self.type_from_die(first.die)?.typ))
    }

    fn compound_type_from_die(
        &self,
        die: DieId,
        lang: Option<Language>,
        kind: CompoundKind,
    ) -> Result<Rc<Type>, Error> {
        let tag_name = self.dwarf.die_name(die)?;
        let declaration = self.dwarf.die_flag(die, gimli::DW_AT_declaration)?;
        if declaration {
            if let Some(name) = &tag_name {
                if let Some(complete) = self.find_complete(kind.tag(), name)? {
                    return Ok(complete);
                }
            }
            return Ok(Type::new(
                lang,
                TypeRepr::Compound {
                    kind,
                    tag: tag_name,
                    def: None,
                },
            ));
        }

        let size = self.dwarf.die_byte_size(die)?.ok_or_else(|| {
            malformed(format!(
                "{} has missing or invalid DW_AT_byte_size",
                kind.tag()
            ))
        })?;
        let little_endian = self.dwarf.die_byte_order(die, false)?.is_little();

        let members: Vec<DieId> = self
            .dwarf
            .die_children(die)?
            .into_iter()
            .filter(|(tag, _)| *tag == gimli::DW_TAG_member)
            .map(|(_, child)| child)
            .collect();

        let mut builder = CompoundBuilder::new(kind);
        for (i, member) in members.iter().enumerate() {
            // Flexible array members are only allowed as the last member
            // of a structure with at least one other member.
            let can_be_incomplete_array =
                i + 1 == members.len() && kind != CompoundKind::Union && i > 0;
            self.parse_member(*member, little_endian, can_be_incomplete_array, &mut builder)?;
        }
        Ok(builder.build(tag_name, size, lang))
    }

    fn parse_member(
        &self,
        die: DieId,
        little_endian: bool,
        can_be_incomplete_array: bool,
        builder: &mut CompoundBuilder,
    ) -> Result<(), Error> {
        let name = self.dwarf.die_name(die)?;
        let bit_field_size = self.dwarf.die_udata(die, gimli::DW_AT_bit_size)?;
        let typ = self.lazy_type_from_attr(die, gimli::DW_TAG_member, can_be_incomplete_array)?;
        let bit_offset =
            self.member_bit_offset(die, &typ, bit_field_size.unwrap_or(0), little_endian)?;
        builder.add_member(Member {
            name,
            typ,
            bit_offset,
            bit_field_size,
        });
        Ok(())
    }

    /// Bit offset of a member from the start of its compound, across the
    /// three encodings producers use.
    fn member_bit_offset(
        &self,
        die: DieId,
        member_type: &LazyType,
        bit_field_size: u64,
        little_endian: bool,
    ) -> Result<u64, Error> {
        // The simplest case: DW_AT_data_bit_offset is already the offset
        // in bits from the start of the containing object.
        if let Some(bit_offset) = self.dwarf.die_udata(die, gimli::DW_AT_data_bit_offset)? {
            return Ok(bit_offset);
        }

        let mut offset = 8 * self
            .dwarf
            .die_udata(die, gimli::DW_AT_data_member_location)?
            .unwrap_or(0);

        // Legacy bit fields add DW_AT_bit_offset: the offset of the most
        // significant bit of the field from the most significant bit of
        // its storage unit. On big-endian targets that is the start of the
        // field; on little-endian targets the start is counted back from
        // the end of the storage unit.
        if let Some(bit_offset) = self.dwarf.die_udata(die, gimli::DW_AT_bit_offset)? {
            if little_endian {
                let byte_size = match self.dwarf.die_udata(die, gimli::DW_AT_byte_size)? {
                    Some(size) => size,
                    None => {
                        let qualified = member_type.evaluate(self)?;
                        qualified.typ.size().ok_or_else(|| {
                            malformed("DW_TAG_member bit field type does not have size")
                        })?
                    }
                };
                let from_end = 8u64
                    .checked_mul(byte_size)
                    .and_then(|bits| bits.checked_sub(bit_offset))
                    .and_then(|bits| bits.checked_sub(bit_field_size))
                    .ok_or_else(|| malformed("DW_TAG_member has invalid DW_AT_bit_offset"))?;
                offset += from_end;
            } else {
                offset += bit_offset;
            }
        }
        Ok(offset)
    }

    fn lazy_type_from_attr(
        &self,
        die: DieId,
        tag: DwTag,
        can_be_incomplete_array: bool,
    ) -> Result<LazyType, Error> {
        match self.dwarf.die_type_ref(die)? {
            Some(target) => Ok(LazyType::thunk(target, can_be_incomplete_array)),
            None => Err(malformed(format!("{tag} is missing DW_AT_type"))),
        }
    }

    fn enum_type_from_die(
        &self,
        die: DieId,
        lang: Option<Language>,
    ) -> Result<Rc<Type>, Error> {
        let tag_name = self.dwarf.die_name(die)?;
        let declaration = self.dwarf.die_flag(die, gimli::DW_AT_declaration)?;
        if declaration {
            if let Some(name) = &tag_name {
                if let Some(complete) =
                    self.find_complete(gimli::DW_TAG_enumeration_type, name)?
                {
                    return Ok(complete);
                }
            }
            return Ok(Type::new(
                lang,
                TypeRepr::Enum {
                    tag: tag_name,
                    def: None,
                },
            ));
        }

        let mut builder = EnumBuilder::new();
        let mut is_signed = false;
        for (tag, child) in self.dwarf.die_children(die)? {
            if tag != gimli::DW_TAG_enumerator {
                continue;
            }
            self.parse_enumerator(child, &mut builder, &mut is_signed)?;
        }

        let compatible = match self.dwarf.die_type_ref(die)? {
            Some(child) => {
                let qualified = self.type_from_die(child)?;
                if qualified.typ.kind() != TypeKind::Int {
                    return Err(malformed(
                        "DW_AT_type of DW_TAG_enumeration_type is not an integer type",
                    ));
                }
                qualified.typ
            }
            // GCC before 5.1 did not emit DW_AT_type for enumeration
            // types; fabricate the compatible type from the byte size,
            // with signedness guessed from the enumerator values.
            None => {
                let size = self.dwarf.die_byte_size(die)?.ok_or_else(|| {
                    malformed("DW_TAG_enumeration_type has missing or invalid DW_AT_byte_size")
                })?;
                Type::new(
                    lang,
                    TypeRepr::Int {
                        name: "<unknown>".to_string(),
                        size,
                        is_signed,
                    },
                )
            }
        };
        Ok(builder.build(tag_name, compatible, lang))
    }

    fn parse_enumerator(
        &self,
        die: DieId,
        builder: &mut EnumBuilder,
        is_signed: &mut bool,
    ) -> Result<(), Error> {
        let name = self
            .dwarf
            .die_name(die)?
            .ok_or_else(|| malformed("DW_TAG_enumerator has missing or invalid DW_AT_name"))?;
        match self.dwarf.die_int_value(die, gimli::DW_AT_const_value)? {
            // A signed form is the only signedness signal when the enum
            // has no DW_AT_type (GCC before 7.1 also omitted
            // DW_AT_encoding here).
            Some(IntValue::Signed(value)) => {
                builder.add_signed(name, value);
                if value < 0 {
                    *is_signed = true;
                }
            }
            Some(IntValue::Unsigned(value)) => builder.add_unsigned(name, value),
            None => return Err(malformed("DW_TAG_enumerator is missing DW_AT_const_value")),
        }
        Ok(())
    }

    fn typedef_type_from_die(
        &self,
        die: DieId,
        lang: Option<Language>,
        can_be_incomplete_array: bool,
        is_incomplete_array_ret: &mut bool,
    ) -> Result<Rc<Type>, Error> {
        let name = self
            .dwarf
            .die_name(die)?
            .ok_or_else(|| malformed("DW_TAG_typedef has missing or invalid DW_AT_name"))?;
        let aliased = self.type_from_attr(
            die,
            lang,
            gimli::DW_TAG_typedef,
            true,
            can_be_incomplete_array,
            is_incomplete_array_ret,
        )?;
        Ok(Type::new(lang, TypeRepr::Typedef { name, aliased }))
    }

    fn pointer_type_from_die(
        &self,
        die: DieId,
        lang: Option<Language>,
    ) -> Result<Rc<Type>, Error> {
        let referenced =
            self.type_from_attr(die, lang, gimli::DW_TAG_pointer_type, true, true, &mut false)?;
        let size = match self.dwarf.die_byte_size(die)? {
            Some(size) => size,
            None => self.dwarf.die_address_size(die)? as u64,
        };
        Ok(Type::new(lang, TypeRepr::Pointer { referenced, size }))
    }

    fn subrange_dimension(&self, die: DieId) -> Result<ArrayDimension, Error> {
        let (attr, value) = match self.dwarf.die_int_value(die, gimli::DW_AT_upper_bound)? {
            Some(value) => (gimli::DW_AT_upper_bound, value),
            None => match self.dwarf.die_int_value(die, gimli::DW_AT_count)? {
                Some(value) => (gimli::DW_AT_count, value),
                None => {
                    return Ok(ArrayDimension {
                        length: 0,
                        is_complete: false,
                    })
                }
            },
        };

        let length = if attr == gimli::DW_AT_upper_bound {
            match value {
                // GCC emits a DW_FORM_sdata DW_AT_upper_bound of -1 for
                // empty array variables without an explicit size
                // (`int arr[] = {};`).
                IntValue::Signed(-1) => 0,
                IntValue::Signed(bound) if bound < 0 => {
                    return Err(malformed(
                        "DW_TAG_subrange_type has invalid DW_AT_upper_bound",
                    ))
                }
                IntValue::Signed(bound) => bound as u64 + 1,
                IntValue::Unsigned(bound) => bound
                    .checked_add(1)
                    .ok_or(Error::Overflow("DW_AT_upper_bound"))?,
            }
        } else {
            match value {
                IntValue::Signed(count) if count < 0 => {
                    return Err(malformed("DW_TAG_subrange_type has invalid DW_AT_count"))
                }
                IntValue::Signed(count) => count as u64,
                IntValue::Unsigned(count) => count,
            }
        };
        Ok(ArrayDimension {
            length,
            is_complete: true,
        })
    }

    fn array_type_from_die(
        &self,
        die: DieId,
        lang: Option<Language>,
        can_be_incomplete_array: bool,
        is_incomplete_array_ret: &mut bool,
    ) -> Result<Rc<Type>, Error> {
        let mut dimensions: SmallVec<[ArrayDimension; 4]> = SmallVec::new();
        for (tag, child) in self.dwarf.die_children(die)? {
            if tag == gimli::DW_TAG_subrange_type {
                dimensions.push(self.subrange_dimension(child)?);
            }
        }
        if dimensions.is_empty() {
            dimensions.push(ArrayDimension {
                length: 0,
                is_complete: false,
            });
        }

        let element =
            self.type_from_attr(die, lang, gimli::DW_TAG_array_type, false, false, &mut false)?;

        // Reported regardless of whether the caller allowed it; the caller
        // uses this to decide which memo map the entry belongs in.
        *is_incomplete_array_ret = !dimensions[0].is_complete;

        let mut qualified = element;
        for (i, dimension) in dimensions.iter().enumerate().rev() {
            let length = if dimension.is_complete {
                Some(dimension.length)
            } else if i > 0 || !can_be_incomplete_array {
                // Unsized inner dimensions, and unsized outer dimensions
                // in contexts that require a complete array, must really
                // be zero length.
                Some(0)
            } else {
                None
            };
            qualified = QualifiedType::unqualified(Type::new(
                lang,
                TypeRepr::Array {
                    element: qualified,
                    length,
                },
            ));
        }
        Ok(qualified.typ)
    }

    fn function_type_from_die(
        &self,
        die: DieId,
        tag: DwTag,
        lang: Option<Language>,
    ) -> Result<Rc<Type>, Error> {
        let mut builder = FunctionBuilder::new();
        let mut is_variadic = false;
        for (child_tag, child) in self.dwarf.die_children(die)? {
            match child_tag {
                gimli::DW_TAG_formal_parameter => {
                    if is_variadic {
                        return Err(malformed(format!(
                            "{tag} has DW_TAG_formal_parameter child after DW_TAG_unspecified_parameters child"
                        )));
                    }
                    let name = self.dwarf.die_name(child)?;
                    let typ =
                        self.lazy_type_from_attr(child, gimli::DW_TAG_formal_parameter, true)?;
                    builder.add_parameter(name, typ);
                }
                gimli::DW_TAG_unspecified_parameters => {
                    if is_variadic {
                        return Err(malformed(format!(
                            "{tag} has multiple DW_TAG_unspecified_parameters children"
                        )));
                    }
                    is_variadic = true;
                }
                _ => {}
            }
        }
        let return_type = self.type_from_attr(die, lang, tag, true, true, &mut false)?;
        Ok(builder.build(return_type, is_variadic, lang))
    }

    // The kinds that can be asked for by name map onto a single DWARF
    // tag; everything else (pointers, arrays, ...) has no name to index.
    fn tag_for_kind(kind: TypeKind) -> Result<DwTag, Error> {
        match kind {
            TypeKind::Int | TypeKind::Bool | TypeKind::Float => Ok(gimli::DW_TAG_base_type),
            TypeKind::Struct => Ok(gimli::DW_TAG_structure_type),
            TypeKind::Union => Ok(gimli::DW_TAG_union_type),
            TypeKind::Class => Ok(gimli::DW_TAG_class_type),
            TypeKind::Enum => Ok(gimli::DW_TAG_enumeration_type),
            TypeKind::Typedef => Ok(gimli::DW_TAG_typedef),
            _ => Err(Error::Lookup(format!(
                "cannot look up {kind:?} types by name"
            ))),
        }
    }

    /// Look up a type by kind and name, optionally restricted to one
    /// translation unit (path-suffix match on the unit's source name).
    /// Returns the first complete match the index yields.
    pub fn find_type(
        &self,
        kind: TypeKind,
        name: &str,
        filename: Option<&str>,
    ) -> Result<Option<QualifiedType>, Error> {
        let tags = [Self::tag_for_kind(kind)?];
        for entry in self.index.iterate(name, &tags) {
            if !self.index.unit_matches(entry.die, filename) {
                continue;
            }
            let qualified = self.type_from_die(entry.die)?;
            // One DWARF tag covers int, bool, and float; only accept the
            // kind that was asked for.
            if qualified.typ.kind() == kind {
                return Ok(Some(qualified));
            }
        }
        Ok(None)
    }

    /// Materialize every named definition of the given kind, sorted by
    /// name. Useful for dump-style output.
    pub fn named_types(&self, kind: TypeKind) -> Result<Vec<(String, QualifiedType)>, Error> {
        let tag = Self::tag_for_kind(kind)?;
        let mut types = Vec::new();
        for (name, die) in self.index.names_with_tag(tag) {
            let qualified = self.type_from_die(die)?;
            if qualified.typ.kind() == kind {
                types.push((name.to_string(), qualified));
            }
        }
        Ok(types)
    }
}
