//! Loading of DWARF information and typed access to DIE attributes
use std::borrow::Cow;
use std::collections::HashMap;

use fallible_iterator::FallibleIterator;
use gimli::{AttributeValue, DwAt, DwTag, RunTimeEndian, UnitOffset};
use object::{Object, ObjectSection, ReadRef};

use crate::types::Language;
use crate::{malformed, Error};

// Abbreviations for some lengthy gimli types
pub(crate) type R<'a> = gimli::EndianSlice<'a, RunTimeEndian>;
pub(crate) type Die<'a> = gimli::DebuggingInformationEntry<'a, 'a, R<'a>, usize>;
pub(crate) type Cu<'a> = gimli::Unit<R<'a>, usize>;
pub(crate) type GimliDwarf<'a> = gimli::Dwarf<R<'a>>;

/// Identifies a DIE by its compilation unit and its offset within it.
///
/// Two ids compare equal iff they denote the same entry in the loaded
/// debugging information, which is what makes them usable as memoization
/// keys.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct DieId {
    pub(crate) unit: usize,
    pub(crate) offset: UnitOffset<usize>,
}

/// Byte order of a piece of program data.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ByteOrder {
    Little,
    Big,
}

impl ByteOrder {
    pub fn is_little(self) -> bool {
        matches!(self, ByteOrder::Little)
    }
}

/// A constant attribute value, preserving whether the producer used a
/// signed or an unsigned form.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum IntValue {
    Signed(i64),
    Unsigned(u64),
}

/// A decoded DW_AT_const_value.
#[derive(Clone, Debug)]
pub(crate) enum ConstValue {
    Int(IntValue),
    Block(Vec<u8>),
}

// Real producers chain at most a couple of specification links; the
// bound terminates malformed link cycles.
const INTEGRATE_LINK_LIMIT: usize = 16;

/// Look up an attribute, following DW_AT_specification and
/// DW_AT_abstract_origin links when the entry itself lacks it.
pub(crate) fn attr_integrate<'a>(
    unit: &Cu<'a>,
    entry: &Die<'a>,
    name: DwAt,
) -> Result<Option<gimli::Attribute<R<'a>>>, Error> {
    if let Some(attr) = entry.attr(name)? {
        return Ok(Some(attr));
    }
    let mut current = entry.offset();
    for hop in 0..INTEGRATE_LINK_LIMIT {
        let here;
        let target = if hop == 0 {
            entry
        } else {
            here = unit.entry(current)?;
            if let Some(attr) = here.attr(name)? {
                return Ok(Some(attr));
            }
            &here
        };
        let link = match target.attr_value(gimli::DW_AT_specification)? {
            Some(value) => Some(value),
            None => target.attr_value(gimli::DW_AT_abstract_origin)?,
        };
        match link {
            Some(AttributeValue::UnitRef(offset)) => current = offset,
            Some(_) => {
                return Err(malformed(format!(
                    "{} has unsupported indirect attribute form",
                    target.tag()
                )))
            }
            None => return Ok(None),
        }
    }
    Ok(None)
}

// Try to retrieve a string attribute value through whichever string
// section the form refers to
pub(crate) fn attr_to_string(dwarf: &GimliDwarf, value: AttributeValue<R>) -> Option<String> {
    match value {
        AttributeValue::String(str) => str.to_string().ok().map(|str| str.to_string()),
        AttributeValue::DebugStrRef(strref) => dwarf
            .debug_str
            .get_str(strref)
            .ok()
            .map(|str| str.to_string_lossy().to_string()),
        AttributeValue::DebugLineStrRef(strref) => dwarf
            .debug_line_str
            .get_str(strref)
            .ok()
            .map(|str| str.to_string_lossy().to_string()),
        _ => None,
    }
}

// Try to retrieve the name attribute as a string for a DIE if one exists
pub(crate) fn entry_name(dwarf: &GimliDwarf, entry: &Die) -> Option<String> {
    let mut attrs = entry.attrs();
    while let Ok(Some(attr)) = attrs.next() {
        if attr.name() == gimli::DW_AT_name {
            return attr_to_string(dwarf, attr.value());
        }
    }
    None
}

/// Represents DWARF data
pub struct Dwarf<'a> {
    dwarf_cow: gimli::Dwarf<Cow<'a, [u8]>>,
    endianness: RunTimeEndian,
}

impl<'a> Dwarf<'a> {
    /// Load DWARF information from an object file (ELF etc...)
    pub fn load(data: impl ReadRef<'a>) -> Result<Self, Error> {
        let object = object::File::parse(data)?;

        let endianness = if object.is_little_endian() {
            RunTimeEndian::Little
        } else {
            RunTimeEndian::Big
        };

        let load_section =
            |id: gimli::SectionId| -> Result<Cow<'a, [u8]>, gimli::Error> {
                match object.section_by_name(id.name()) {
                    Some(ref section) => Ok(section
                        .uncompressed_data()
                        .unwrap_or(Cow::Borrowed(&[][..]))),
                    None => Ok(Cow::Borrowed(&[][..])),
                }
            };

        // Load all of the sections
        let dwarf_cow = gimli::Dwarf::load(&load_section)?;

        Ok(Self {
            dwarf_cow,
            endianness,
        })
    }

    /// Load DWARF information from raw section contents keyed by section
    /// name. Absent sections are treated as empty.
    pub fn from_sections(
        sections: HashMap<&'static str, Vec<u8>>,
        byte_order: ByteOrder,
    ) -> Result<Dwarf<'static>, Error> {
        let endianness = if byte_order.is_little() {
            RunTimeEndian::Little
        } else {
            RunTimeEndian::Big
        };

        let load_section =
            |id: gimli::SectionId| -> Result<Cow<'static, [u8]>, gimli::Error> {
                match sections.get(id.name()) {
                    Some(data) => Ok(Cow::Owned(data.clone())),
                    None => Ok(Cow::Borrowed(&[][..])),
                }
            };

        let dwarf_cow = gimli::Dwarf::load(&load_section)?;

        Ok(Dwarf {
            dwarf_cow,
            endianness,
        })
    }

    /// Byte order of the loaded image.
    pub fn byte_order(&self) -> ByteOrder {
        match self.endianness {
            RunTimeEndian::Little => ByteOrder::Little,
            RunTimeEndian::Big => ByteOrder::Big,
        }
    }

    pub(crate) fn borrow_dwarf(&self) -> GimliDwarf {
        let borrow_section: &dyn for<'b> Fn(
            &'b Cow<[u8]>,
        ) -> gimli::EndianSlice<'b, RunTimeEndian> =
            &|section| gimli::EndianSlice::new(section, self.endianness);

        self.dwarf_cow.borrow(borrow_section)
    }

    pub(crate) fn unit_context<F, T>(&self, die: &DieId, f: F) -> Result<T, Error>
    where
        F: FnOnce(&Cu) -> T,
    {
        let dwarf = self.borrow_dwarf();
        let mut unit_headers = dwarf.units();
        let unit = if let Ok(Some(header)) = unit_headers.nth(die.unit) {
            if let Ok(unit) = dwarf.unit(header) {
                unit
            } else {
                return Err(Error::CUError(format!(
                    "failed to find CU for DIE at: {die:?}"
                )));
            }
        } else {
            return Err(Error::CUError(format!(
                "failed to find CU header for DIE at: {die:?}"
            )));
        };
        Ok(f(&unit))
    }

    // The workhorse behind the attribute accessors: seek to the DIE and
    // hand the closure everything it could need to decode a value.
    pub(crate) fn die_context<F, T>(&self, die: DieId, f: F) -> Result<T, Error>
    where
        F: FnOnce(&GimliDwarf, &Cu, &Die) -> Result<T, Error>,
    {
        let dwarf = self.borrow_dwarf();
        let mut unit_headers = dwarf.units();
        let unit = if let Ok(Some(header)) = unit_headers.nth(die.unit) {
            if let Ok(unit) = dwarf.unit(header) {
                unit
            } else {
                return Err(Error::CUError(format!(
                    "failed to find CU for DIE at: {die:?}"
                )));
            }
        } else {
            return Err(Error::CUError(format!(
                "failed to find CU header for DIE at: {die:?}"
            )));
        };
        let entry = match unit.entry(die.offset) {
            Ok(entry) => entry,
            Err(_) => {
                return Err(Error::DIEError(format!(
                    "failed to find DIE at: {die:?}"
                )));
            }
        };
        f(&dwarf, &unit, &entry)
    }

    pub(crate) fn die_tag(&self, die: DieId) -> Result<DwTag, Error> {
        self.die_context(die, |_, _, entry| Ok(entry.tag()))
    }

    /// Integrated DW_AT_name of a DIE, if it has one.
    pub(crate) fn die_name(&self, die: DieId) -> Result<Option<String>, Error> {
        self.die_context(die, |dwarf, unit, entry| {
            match attr_integrate(unit, entry, gimli::DW_AT_name)? {
                None => Ok(None),
                Some(attr) => match attr_to_string(dwarf, attr.value()) {
                    Some(name) => Ok(Some(name)),
                    None => Err(malformed(format!(
                        "{} has invalid DW_AT_name",
                        entry.tag()
                    ))),
                },
            }
        })
    }

    /// Integrated read of a constant-valued attribute as unsigned data.
    pub(crate) fn die_udata(&self, die: DieId, name: DwAt) -> Result<Option<u64>, Error> {
        self.die_context(die, |_, unit, entry| {
            match attr_integrate(unit, entry, name)? {
                None => Ok(None),
                Some(attr) => match attr.udata_value() {
                    Some(value) => Ok(Some(value)),
                    None => Err(malformed(format!(
                        "{} has invalid {}",
                        entry.tag(),
                        name
                    ))),
                },
            }
        })
    }

    /// Integrated read of a constant-valued attribute, preserving the
    /// signedness of the form the producer chose.
    pub(crate) fn die_int_value(
        &self,
        die: DieId,
        name: DwAt,
    ) -> Result<Option<IntValue>, Error> {
        self.die_context(die, |_, unit, entry| {
            match attr_integrate(unit, entry, name)? {
                None => Ok(None),
                Some(attr) => match attr.value() {
                    AttributeValue::Sdata(value) => Ok(Some(IntValue::Signed(value))),
                    AttributeValue::Data1(value) => Ok(Some(IntValue::Unsigned(value.into()))),
                    AttributeValue::Data2(value) => Ok(Some(IntValue::Unsigned(value.into()))),
                    AttributeValue::Data4(value) => Ok(Some(IntValue::Unsigned(value.into()))),
                    AttributeValue::Data8(value) => Ok(Some(IntValue::Unsigned(value))),
                    AttributeValue::Udata(value) => Ok(Some(IntValue::Unsigned(value))),
                    _ => Err(malformed(format!(
                        "{} has invalid {}",
                        entry.tag(),
                        name
                    ))),
                },
            }
        })
    }

    /// Integrated flag attribute; absent means unset.
    pub(crate) fn die_flag(&self, die: DieId, name: DwAt) -> Result<bool, Error> {
        self.die_context(die, |_, unit, entry| {
            match attr_integrate(unit, entry, name)? {
                None => Ok(false),
                Some(attr) => match attr.value() {
                    AttributeValue::Flag(flag) => Ok(flag),
                    _ => Err(malformed(format!(
                        "{} has invalid {}",
                        entry.tag(),
                        name
                    ))),
                },
            }
        })
    }

    /// Integrated reference attribute resolved to the referenced DIE.
    pub(crate) fn die_attr_ref(&self, die: DieId, name: DwAt) -> Result<Option<DieId>, Error> {
        self.die_context(die, |_, unit, entry| {
            match attr_integrate(unit, entry, name)? {
                None => Ok(None),
                Some(attr) => match attr.value() {
                    AttributeValue::UnitRef(offset) => Ok(Some(DieId {
                        unit: die.unit,
                        offset,
                    })),
                    _ => Err(malformed(format!(
                        "{} has invalid {}",
                        entry.tag(),
                        name
                    ))),
                },
            }
        })
    }

    // DW_AT_type : reference
    pub(crate) fn die_type_ref(&self, die: DieId) -> Result<Option<DieId>, Error> {
        self.die_attr_ref(die, gimli::DW_AT_type)
    }

    // DW_AT_byte_size : constant
    pub(crate) fn die_byte_size(&self, die: DieId) -> Result<Option<u64>, Error> {
        self.die_udata(die, gimli::DW_AT_byte_size)
    }

    // DW_AT_encoding : constant
    pub(crate) fn die_encoding(&self, die: DieId) -> Result<Option<gimli::DwAte>, Error> {
        self.die_context(die, |_, unit, entry| {
            match attr_integrate(unit, entry, gimli::DW_AT_encoding)? {
                None => Ok(None),
                Some(attr) => match attr.value() {
                    AttributeValue::Encoding(encoding) => Ok(Some(encoding)),
                    _ => match attr.udata_value() {
                        Some(value) => Ok(Some(gimli::DwAte(value as u8))),
                        None => Err(malformed(
                            "DW_TAG_base_type has missing or invalid DW_AT_encoding",
                        )),
                    },
                },
            }
        })
    }

    /// Byte order governing a DIE: DW_AT_endianity when `check_attr` is
    /// set and present, otherwise the byte order of the loaded image.
    pub(crate) fn die_byte_order(
        &self,
        die: DieId,
        check_attr: bool,
    ) -> Result<ByteOrder, Error> {
        let endianity = if check_attr {
            self.die_context(die, |_, unit, entry| {
                match attr_integrate(unit, entry, gimli::DW_AT_endianity)? {
                    None => Ok(None),
                    Some(attr) => match attr.value() {
                        AttributeValue::Endianity(endianity) => Ok(Some(endianity)),
                        _ => match attr.udata_value() {
                            Some(value) => Ok(Some(gimli::DwEnd(value as u8))),
                            None => Err(malformed("invalid DW_AT_endianity")),
                        },
                    },
                }
            })?
        } else {
            None
        };
        match endianity {
            None | Some(gimli::DW_END_default) => Ok(self.byte_order()),
            Some(gimli::DW_END_little) => Ok(ByteOrder::Little),
            Some(gimli::DW_END_big) => Ok(ByteOrder::Big),
            Some(_) => Err(malformed("unknown DW_AT_endianity")),
        }
    }

    /// Source language of the DIE's compilation unit.
    pub(crate) fn die_language(&self, die: DieId) -> Result<Option<Language>, Error> {
        self.unit_context(&die, |unit| -> Result<Option<Language>, Error> {
            let mut tree = unit.entries_tree(None)?;
            let root = tree.root()?;
            match root.entry().attr_value(gimli::DW_AT_language)? {
                None => Ok(None),
                Some(AttributeValue::Language(language)) => {
                    Ok(Language::from_dwarf(language))
                }
                Some(AttributeValue::Data1(code)) => {
                    Ok(Language::from_dwarf(gimli::DwLang(code.into())))
                }
                Some(AttributeValue::Data2(code)) => {
                    Ok(Language::from_dwarf(gimli::DwLang(code)))
                }
                Some(AttributeValue::Udata(code)) => {
                    Ok(Language::from_dwarf(gimli::DwLang(code as u16)))
                }
                Some(_) => Err(malformed(
                    "DW_TAG_compile_unit has invalid DW_AT_language",
                )),
            }
        })?
    }

    // DW_AT_low_pc : address
    pub(crate) fn die_low_pc(&self, die: DieId) -> Result<Option<u64>, Error> {
        self.die_context(die, |_, unit, entry| {
            match attr_integrate(unit, entry, gimli::DW_AT_low_pc)? {
                None => Ok(None),
                Some(attr) => match attr.value() {
                    AttributeValue::Addr(address) => Ok(Some(address)),
                    AttributeValue::Udata(address) => Ok(Some(address)),
                    _ => Err(malformed(format!(
                        "{} has invalid DW_AT_low_pc",
                        entry.tag()
                    ))),
                },
            }
        })
    }

    /// Address of a variable's location. The only location description
    /// understood is a single DW_OP_addr operation; anything else is a
    /// producer the materializer does not support.
    pub(crate) fn die_location_address(&self, die: DieId) -> Result<Option<u64>, Error> {
        self.die_context(die, |_, unit, entry| {
            let attr = match attr_integrate(unit, entry, gimli::DW_AT_location)? {
                None => return Ok(None),
                Some(attr) => attr,
            };
            let expression = match attr.value() {
                AttributeValue::Exprloc(expression) => expression,
                AttributeValue::Block(data) => gimli::Expression(data),
                _ => return Err(malformed("DW_AT_location has unimplemented form")),
            };
            let mut operations = expression.operations(unit.header.encoding());
            let address = match operations.next()? {
                Some(gimli::Operation::Address { address }) => address,
                _ => {
                    return Err(malformed(
                        "DW_AT_location has unimplemented operation",
                    ))
                }
            };
            if operations.next()?.is_some() {
                return Err(malformed("DW_AT_location has unimplemented operation"));
            }
            Ok(Some(address))
        })
    }

    // DW_AT_const_value : constant,block
    pub(crate) fn die_const_value(&self, die: DieId) -> Result<Option<ConstValue>, Error> {
        self.die_context(die, |_, unit, entry| {
            match attr_integrate(unit, entry, gimli::DW_AT_const_value)? {
                None => Ok(None),
                Some(attr) => match attr.value() {
                    AttributeValue::Block(data) => {
                        Ok(Some(ConstValue::Block(data.slice().to_vec())))
                    }
                    AttributeValue::Sdata(value) => {
                        Ok(Some(ConstValue::Int(IntValue::Signed(value))))
                    }
                    AttributeValue::Data1(value) => {
                        Ok(Some(ConstValue::Int(IntValue::Unsigned(value.into()))))
                    }
                    AttributeValue::Data2(value) => {
                        Ok(Some(ConstValue::Int(IntValue::Unsigned(value.into()))))
                    }
                    AttributeValue::Data4(value) => {
                        Ok(Some(ConstValue::Int(IntValue::Unsigned(value.into()))))
                    }
                    AttributeValue::Data8(value) => {
                        Ok(Some(ConstValue::Int(IntValue::Unsigned(value))))
                    }
                    AttributeValue::Udata(value) => {
                        Ok(Some(ConstValue::Int(IntValue::Unsigned(value))))
                    }
                    _ => Err(malformed("unknown DW_AT_const_value form")),
                },
            }
        })
    }

    /// Direct children of a DIE, in order.
    pub(crate) fn die_children(&self, die: DieId) -> Result<Vec<(DwTag, DieId)>, Error> {
        self.unit_context(&die, |unit| -> Result<Vec<(DwTag, DieId)>, Error> {
            let mut children = Vec::new();
            let mut tree = unit.entries_tree(Some(die.offset))?;
            let root = tree.root()?;
            let mut iter = root.children();
            while let Some(child) = iter.next()? {
                children.push((
                    child.entry().tag(),
                    DieId {
                        unit: die.unit,
                        offset: child.entry().offset(),
                    },
                ));
            }
            Ok(children)
        })?
    }

    /// Address size of the DIE's compilation unit, used as the pointer
    /// size when a pointer DIE omits DW_AT_byte_size.
    pub(crate) fn die_address_size(&self, die: DieId) -> Result<u8, Error> {
        self.unit_context(&die, |unit| unit.header.encoding().address_size)
    }
}
