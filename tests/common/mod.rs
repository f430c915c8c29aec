//! Helpers that synthesize DWARF images in memory.
//!
//! Tests build exactly the DIEs they need with `gimli::write`, serialize
//! them, and load the result back through `Dwarf::from_sections`, so the
//! suite does not depend on a C toolchain.
#![allow(dead_code)]

use std::collections::HashMap;

use dwmat::{ByteOrder, Dwarf};
use gimli::write::{Address, AttributeValue, DwarfUnit, EndianVec, Sections, UnitEntryId};
use gimli::RunTimeEndian;

pub const ENCODING: gimli::Encoding = gimli::Encoding {
    format: gimli::Format::Dwarf32,
    version: 4,
    address_size: 8,
};

/// Name given to the synthetic compilation unit; the filename-filter
/// tests match against it.
pub const CU_NAME: &str = "synthetic.c";

pub fn build_dwarf(f: impl FnOnce(&mut DwarfUnit)) -> Dwarf<'static> {
    build_dwarf_endian(ByteOrder::Little, f)
}

pub fn build_dwarf_endian(
    byte_order: ByteOrder,
    f: impl FnOnce(&mut DwarfUnit),
) -> Dwarf<'static> {
    let mut dwarf = DwarfUnit::new(ENCODING);
    let root = dwarf.unit.root();
    let entry = dwarf.unit.get_mut(root);
    entry.set(
        gimli::DW_AT_name,
        AttributeValue::String(CU_NAME.as_bytes().to_vec()),
    );
    entry.set(
        gimli::DW_AT_language,
        AttributeValue::Udata(gimli::DW_LANG_C99.0.into()),
    );
    f(&mut dwarf);

    let endian = match byte_order {
        ByteOrder::Little => RunTimeEndian::Little,
        ByteOrder::Big => RunTimeEndian::Big,
    };
    let mut sections = Sections::new(EndianVec::new(endian));
    dwarf.write(&mut sections).expect("failed to write DWARF");

    let mut contents: HashMap<&'static str, Vec<u8>> = HashMap::new();
    sections
        .for_each(|id, data| {
            contents.insert(id.name(), data.slice().to_vec());
            Ok::<_, gimli::Error>(())
        })
        .expect("failed to collect sections");
    Dwarf::from_sections(contents, byte_order).expect("failed to load sections")
}

pub fn add_base_type(
    dwarf: &mut DwarfUnit,
    name: &str,
    encoding: gimli::DwAte,
    size: u64,
) -> UnitEntryId {
    let root = dwarf.unit.root();
    let id = dwarf.unit.add(root, gimli::DW_TAG_base_type);
    let entry = dwarf.unit.get_mut(id);
    entry.set(
        gimli::DW_AT_name,
        AttributeValue::String(name.as_bytes().to_vec()),
    );
    entry.set(
        gimli::DW_AT_encoding,
        AttributeValue::Udata(encoding.0.into()),
    );
    entry.set(gimli::DW_AT_byte_size, AttributeValue::Udata(size));
    id
}

pub fn add_int(dwarf: &mut DwarfUnit, name: &str, size: u64, signed: bool) -> UnitEntryId {
    let encoding = if signed {
        gimli::DW_ATE_signed
    } else {
        gimli::DW_ATE_unsigned
    };
    add_base_type(dwarf, name, encoding, size)
}

pub fn set_type(dwarf: &mut DwarfUnit, id: UnitEntryId, type_id: UnitEntryId) {
    dwarf
        .unit
        .get_mut(id)
        .set(gimli::DW_AT_type, AttributeValue::UnitRef(type_id));
}

pub fn set_name(dwarf: &mut DwarfUnit, id: UnitEntryId, name: &str) {
    dwarf.unit.get_mut(id).set(
        gimli::DW_AT_name,
        AttributeValue::String(name.as_bytes().to_vec()),
    );
}

pub fn add_typedef(
    dwarf: &mut DwarfUnit,
    name: &str,
    target: Option<UnitEntryId>,
) -> UnitEntryId {
    let root = dwarf.unit.root();
    let id = dwarf.unit.add(root, gimli::DW_TAG_typedef);
    set_name(dwarf, id, name);
    if let Some(target) = target {
        set_type(dwarf, id, target);
    }
    id
}

pub fn add_struct(dwarf: &mut DwarfUnit, name: Option<&str>, size: u64) -> UnitEntryId {
    let root = dwarf.unit.root();
    let id = dwarf.unit.add(root, gimli::DW_TAG_structure_type);
    if let Some(name) = name {
        set_name(dwarf, id, name);
    }
    dwarf
        .unit
        .get_mut(id)
        .set(gimli::DW_AT_byte_size, AttributeValue::Udata(size));
    id
}

pub fn add_struct_declaration(dwarf: &mut DwarfUnit, name: &str) -> UnitEntryId {
    let root = dwarf.unit.root();
    let id = dwarf.unit.add(root, gimli::DW_TAG_structure_type);
    set_name(dwarf, id, name);
    dwarf
        .unit
        .get_mut(id)
        .set(gimli::DW_AT_declaration, AttributeValue::Flag(true));
    id
}

pub fn add_member(
    dwarf: &mut DwarfUnit,
    parent: UnitEntryId,
    name: Option<&str>,
    type_id: UnitEntryId,
    byte_offset: u64,
) -> UnitEntryId {
    let id = dwarf.unit.add(parent, gimli::DW_TAG_member);
    if let Some(name) = name {
        set_name(dwarf, id, name);
    }
    let entry = dwarf.unit.get_mut(id);
    entry.set(gimli::DW_AT_type, AttributeValue::UnitRef(type_id));
    entry.set(
        gimli::DW_AT_data_member_location,
        AttributeValue::Udata(byte_offset),
    );
    id
}

/// An array DIE with one subrange per entry of `bounds`; `None` means a
/// subrange with neither DW_AT_upper_bound nor DW_AT_count.
pub fn add_array(
    dwarf: &mut DwarfUnit,
    element: UnitEntryId,
    bounds: &[Option<AttributeValue>],
) -> UnitEntryId {
    let root = dwarf.unit.root();
    let id = dwarf.unit.add(root, gimli::DW_TAG_array_type);
    set_type(dwarf, id, element);
    for bound in bounds {
        let subrange = dwarf.unit.add(id, gimli::DW_TAG_subrange_type);
        if let Some(bound) = bound {
            dwarf
                .unit
                .get_mut(subrange)
                .set(gimli::DW_AT_upper_bound, bound.clone());
        }
    }
    id
}

pub fn add_enum(
    dwarf: &mut DwarfUnit,
    name: Option<&str>,
    size: u64,
    enumerators: &[(&str, AttributeValue)],
) -> UnitEntryId {
    let root = dwarf.unit.root();
    let id = dwarf.unit.add(root, gimli::DW_TAG_enumeration_type);
    if let Some(name) = name {
        set_name(dwarf, id, name);
    }
    dwarf
        .unit
        .get_mut(id)
        .set(gimli::DW_AT_byte_size, AttributeValue::Udata(size));
    for (enumerator_name, value) in enumerators {
        let enumerator = dwarf.unit.add(id, gimli::DW_TAG_enumerator);
        set_name(dwarf, enumerator, enumerator_name);
        dwarf
            .unit
            .get_mut(enumerator)
            .set(gimli::DW_AT_const_value, value.clone());
    }
    id
}

pub fn add_variable(dwarf: &mut DwarfUnit, name: &str, type_id: UnitEntryId) -> UnitEntryId {
    let root = dwarf.unit.root();
    let id = dwarf.unit.add(root, gimli::DW_TAG_variable);
    set_name(dwarf, id, name);
    set_type(dwarf, id, type_id);
    id
}

/// DW_AT_location holding a single DW_OP_addr operation.
pub fn set_location_addr(dwarf: &mut DwarfUnit, id: UnitEntryId, address: u64) {
    let mut ops = vec![gimli::DW_OP_addr.0];
    ops.extend_from_slice(&address.to_le_bytes());
    dwarf
        .unit
        .get_mut(id)
        .set(gimli::DW_AT_location, AttributeValue::Block(ops));
}

pub fn add_subprogram(
    dwarf: &mut DwarfUnit,
    name: &str,
    return_type: Option<UnitEntryId>,
    low_pc: Option<u64>,
) -> UnitEntryId {
    let root = dwarf.unit.root();
    let id = dwarf.unit.add(root, gimli::DW_TAG_subprogram);
    set_name(dwarf, id, name);
    if let Some(return_type) = return_type {
        set_type(dwarf, id, return_type);
    }
    if let Some(low_pc) = low_pc {
        dwarf.unit.get_mut(id).set(
            gimli::DW_AT_low_pc,
            AttributeValue::Address(Address::Constant(low_pc)),
        );
    }
    id
}
