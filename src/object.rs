//! Program objects: named constants, functions, and variables
use gimli::DwTag;
use smallvec::SmallVec;

use crate::dwarf::{ByteOrder, ConstValue, DieId, IntValue};
use crate::materialize::TypeCache;
use crate::types::{EnumValue, QualifiedType, Storage};
use crate::{malformed, Error};

bitflags::bitflags! {
    /// Selects which kinds of objects a lookup considers.
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct FindObjectFlags: u8 {
        const CONSTANT = 1 << 0;
        const FUNCTION = 1 << 1;
        const VARIABLE = 1 << 2;
    }
}

/// A named program entity: an enumerator constant, a function, or a
/// variable, together with its materialized type.
#[derive(Clone, Debug)]
pub struct Object {
    pub typ: QualifiedType,
    pub value: ObjectValue,
}

/// Where an object's value lives.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ObjectValue {
    /// The object lives in program memory at a fixed (bias-adjusted)
    /// address.
    Reference { address: u64, byte_order: ByteOrder },
    Signed(i64),
    Unsigned(u64),
    /// Raw constant bytes in the recorded byte order.
    Buffer { data: Vec<u8>, byte_order: ByteOrder },
}

impl Object {
    /// The object's address, when it is a reference.
    pub fn address(&self) -> Option<u64> {
        match self.value {
            ObjectValue::Reference { address, .. } => Some(address),
            _ => None,
        }
    }

    /// Decode the object's constant value as an unsigned integer, when it
    /// has one that fits.
    pub fn to_u64(&self) -> Option<u64> {
        match &self.value {
            ObjectValue::Signed(value) => Some(*value as u64),
            ObjectValue::Unsigned(value) => Some(*value),
            ObjectValue::Buffer { data, byte_order } => {
                if data.len() > 8 {
                    return None;
                }
                let mut bytes = [0u8; 8];
                match byte_order {
                    ByteOrder::Little => {
                        bytes[..data.len()].copy_from_slice(data);
                        Some(u64::from_le_bytes(bytes))
                    }
                    ByteOrder::Big => {
                        bytes[8 - data.len()..].copy_from_slice(data);
                        Some(u64::from_be_bytes(bytes))
                    }
                }
            }
            ObjectValue::Reference { .. } => None,
        }
    }
}

impl<'d> TypeCache<'d> {
    /// Look up a named constant, function, or variable. Returns the first
    /// match the index yields, honoring the filename filter.
    pub fn find_object(
        &self,
        name: &str,
        filename: Option<&str>,
        flags: FindObjectFlags,
    ) -> Result<Option<Object>, Error> {
        let mut tags: SmallVec<[DwTag; 3]> = SmallVec::new();
        if flags.contains(FindObjectFlags::CONSTANT) {
            tags.push(gimli::DW_TAG_enumerator);
        }
        if flags.contains(FindObjectFlags::FUNCTION) {
            tags.push(gimli::DW_TAG_subprogram);
        }
        if flags.contains(FindObjectFlags::VARIABLE) {
            tags.push(gimli::DW_TAG_variable);
        }

        for entry in self.index().iterate(name, &tags) {
            if !self.index().unit_matches(entry.die, filename) {
                continue;
            }
            let object = match entry.tag {
                gimli::DW_TAG_enumerator => self.object_from_enumerator(entry.die, name)?,
                gimli::DW_TAG_subprogram => {
                    self.object_from_subprogram(entry.die, entry.bias, name)?
                }
                gimli::DW_TAG_variable => {
                    self.object_from_variable(entry.die, entry.bias, name)?
                }
                _ => continue,
            };
            return Ok(Some(object));
        }
        Ok(None)
    }

    // The index entry points at the parent enumeration; materialize it
    // and pick the matching enumerator out of the descriptor.
    fn object_from_enumerator(&self, die: DieId, name: &str) -> Result<Object, Error> {
        let qualified = self.type_from_die(die)?;
        let enumerators = qualified.typ.enumerators().ok_or_else(|| {
            malformed("indexed enumerator does not belong to a complete enumeration type")
        })?;
        let is_signed = qualified.typ.is_signed();
        for enumerator in enumerators {
            if enumerator.name != name {
                continue;
            }
            let value = match (enumerator.value, is_signed) {
                (EnumValue::Signed(value), true) => ObjectValue::Signed(value),
                (EnumValue::Signed(value), false) => ObjectValue::Unsigned(value as u64),
                (EnumValue::Unsigned(value), true) => ObjectValue::Signed(value as i64),
                (EnumValue::Unsigned(value), false) => ObjectValue::Unsigned(value),
            };
            return Ok(Object {
                typ: qualified.clone(),
                value,
            });
        }
        Err(malformed(format!(
            "enumeration type has no enumerator named '{name}'"
        )))
    }

    fn object_from_subprogram(
        &self,
        die: DieId,
        bias: u64,
        name: &str,
    ) -> Result<Object, Error> {
        let qualified = self.type_from_die(die)?;
        let low_pc = self
            .dwarf()
            .die_low_pc(die)?
            .ok_or_else(|| Error::Lookup(format!("could not find address of '{name}'")))?;
        let byte_order = self.dwarf().die_byte_order(die, false)?;
        Ok(Object {
            typ: qualified,
            value: ObjectValue::Reference {
                address: low_pc.wrapping_add(bias),
                byte_order,
            },
        })
    }

    fn object_from_variable(&self, die: DieId, bias: u64, name: &str) -> Result<Object, Error> {
        let qualified = self.variable_type(die)?;
        if let Some(address) = self.dwarf().die_location_address(die)? {
            let byte_order = self.dwarf().die_byte_order(die, true)?;
            return Ok(Object {
                typ: qualified,
                value: ObjectValue::Reference {
                    address: address.wrapping_add(bias),
                    byte_order,
                },
            });
        }
        if let Some(value) = self.dwarf().die_const_value(die)? {
            return self.object_from_constant(die, qualified, value);
        }
        Err(Error::Lookup(format!(
            "could not find address or value of '{name}'"
        )))
    }

    fn object_from_constant(
        &self,
        die: DieId,
        qualified: QualifiedType,
        value: ConstValue,
    ) -> Result<Object, Error> {
        let size = qualified.typ.size().ok_or_else(|| {
            malformed("DW_AT_const_value on a variable whose type has no size")
        })?;
        match value {
            ConstValue::Block(mut data) => {
                let byte_order = self.dwarf().die_byte_order(die, true)?;
                if (data.len() as u64) < size {
                    return Err(malformed("DW_AT_const_value block is too small"));
                }
                data.truncate(size as usize);
                Ok(Object {
                    typ: qualified,
                    value: ObjectValue::Buffer { data, byte_order },
                })
            }
            ConstValue::Int(value) => match qualified.typ.storage() {
                Storage::Signed => {
                    let value = match value {
                        IntValue::Signed(value) => value,
                        IntValue::Unsigned(value) => value as i64,
                    };
                    Ok(Object {
                        typ: qualified,
                        value: ObjectValue::Signed(value),
                    })
                }
                Storage::Unsigned => {
                    let value = match value {
                        IntValue::Signed(value) => value as u64,
                        IntValue::Unsigned(value) => value,
                    };
                    Ok(Object {
                        typ: qualified,
                        value: ObjectValue::Unsigned(value),
                    })
                }
                _ => Err(malformed("unknown DW_AT_const_value form")),
            },
        }
    }
}
