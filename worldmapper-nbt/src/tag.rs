use std::io::{Read, Write};
use std::ops::{Deref, DerefMut};

use crate::compound::NbtCompound;
use crate::reader::ReadAdaptor;
use crate::writer::{self, WriteAdaptor};
use crate::*;

#[derive(Clone, Debug, PartialEq, PartialOrd)]
#[repr(u8)]
pub enum NbtTag {
    End = END_ID,
    Byte(i8) = BYTE_ID,
    Short(i16) = SHORT_ID,
    Int(i32) = INT_ID,
    Long(i64) = LONG_ID,
    Float(f32) = FLOAT_ID,
    Double(f64) = DOUBLE_ID,
    ByteArray(Box<[u8]>) = BYTE_ARRAY_ID,
    String(String) = STRING_ID,
    List(NbtList) = LIST_ID,
    Compound(NbtCompound) = COMPOUND_ID,
    IntArray(Box<[i32]>) = INT_ARRAY_ID,
    LongArray(Box<[i64]>) = LONG_ARRAY_ID,
}

/// A homogeneous list that remembers its declared element type, so an empty
/// list is written back exactly as it was read.
#[derive(Clone, Debug, PartialEq, PartialOrd)]
pub struct NbtList {
    element_type: u8,
    items: Vec<NbtTag>,
}

impl NbtList {
    pub fn empty(element_type: u8) -> Self {
        Self {
            element_type,
            items: Vec::new(),
        }
    }

    pub fn element_type(&self) -> u8 {
        self.element_type
    }

    pub fn push(&mut self, tag: NbtTag) -> Result<(), Error> {
        if self.items.is_empty() && self.element_type == END_ID {
            self.element_type = tag.get_type_id();
        }
        if tag.get_type_id() != self.element_type {
            return Err(Error::ListTypeMismatch {
                expected: self.element_type,
                found: tag.get_type_id(),
            });
        }
        self.items.push(tag);
        Ok(())
    }

    pub fn remove(&mut self, index: usize) -> NbtTag {
        self.items.remove(index)
    }

    /// Iterates the compound elements, skipping anything else.
    pub fn compounds(&self) -> impl Iterator<Item = &NbtCompound> {
        self.items.iter().filter_map(NbtTag::extract_compound)
    }
}

impl From<Vec<NbtTag>> for NbtList {
    fn from(items: Vec<NbtTag>) -> Self {
        Self {
            element_type: items.first().map_or(END_ID, NbtTag::get_type_id),
            items,
        }
    }
}

impl Deref for NbtList {
    type Target = [NbtTag];

    fn deref(&self) -> &Self::Target {
        &self.items
    }
}

impl DerefMut for NbtList {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.items
    }
}

impl NbtTag {
    /// Returns the numeric id associated with the data type.
    pub const fn get_type_id(&self) -> u8 {
        // See https://doc.rust-lang.org/reference/items/enumerations.html#pointer-casting
        unsafe { *(self as *const Self as *const u8) }
    }

    pub fn serialize_data<W>(&self, w: &mut WriteAdaptor<W>) -> writer::Result<()>
    where
        W: Write,
    {
        match self {
            NbtTag::End => {}
            NbtTag::Byte(byte) => w.write_i8_be(*byte)?,
            NbtTag::Short(short) => w.write_i16_be(*short)?,
            NbtTag::Int(int) => w.write_i32_be(*int)?,
            NbtTag::Long(long) => w.write_i64_be(*long)?,
            NbtTag::Float(float) => w.write_f32_be(*float)?,
            NbtTag::Double(double) => w.write_f64_be(*double)?,
            NbtTag::ByteArray(byte_array) => {
                w.write_length(byte_array.len())?;
                w.write_slice(byte_array)?;
            }
            NbtTag::String(string) => write_nbt_string(w, string)?,
            NbtTag::List(list) => {
                w.write_u8_be(list.element_type())?;
                w.write_length(list.len())?;
                for nbt_tag in list.iter() {
                    nbt_tag.serialize_data(w)?;
                }
            }
            NbtTag::Compound(compound) => {
                compound.serialize_content(w)?;
            }
            NbtTag::IntArray(int_array) => {
                w.write_length(int_array.len())?;
                for int in int_array {
                    w.write_i32_be(*int)?;
                }
            }
            NbtTag::LongArray(long_array) => {
                w.write_length(long_array.len())?;
                for long in long_array {
                    w.write_i64_be(*long)?;
                }
            }
        };
        Ok(())
    }

    pub fn deserialize_data<R>(reader: &mut ReadAdaptor<R>, tag_id: u8) -> Result<NbtTag, Error>
    where
        R: Read,
    {
        match tag_id {
            END_ID => Ok(NbtTag::End),
            BYTE_ID => Ok(NbtTag::Byte(reader.get_i8_be()?)),
            SHORT_ID => Ok(NbtTag::Short(reader.get_i16_be()?)),
            INT_ID => Ok(NbtTag::Int(reader.get_i32_be()?)),
            LONG_ID => Ok(NbtTag::Long(reader.get_i64_be()?)),
            FLOAT_ID => Ok(NbtTag::Float(reader.get_f32_be()?)),
            DOUBLE_ID => Ok(NbtTag::Double(reader.get_f64_be()?)),
            BYTE_ARRAY_ID => {
                let len = reader.get_length()?;
                let byte_array = reader.read_boxed_slice(len)?;
                Ok(NbtTag::ByteArray(byte_array))
            }
            STRING_ID => Ok(NbtTag::String(get_nbt_string(reader)?)),
            LIST_ID => {
                let element_type = reader.get_u8_be()?;
                let len = reader.get_length()?;

                // Capacity is capped so a corrupt length can't trigger a huge allocation
                let mut items = Vec::with_capacity(len.min(1024));
                for _ in 0..len {
                    let tag = NbtTag::deserialize_data(reader, element_type)?;
                    items.push(tag);
                }
                Ok(NbtTag::List(NbtList {
                    element_type,
                    items,
                }))
            }
            COMPOUND_ID => Ok(NbtTag::Compound(NbtCompound::deserialize_content(reader)?)),
            INT_ARRAY_ID => {
                let len = reader.get_length()?;
                let mut int_array = Vec::with_capacity(len.min(4096));
                for _ in 0..len {
                    int_array.push(reader.get_i32_be()?);
                }
                Ok(NbtTag::IntArray(int_array.into_boxed_slice()))
            }
            LONG_ARRAY_ID => {
                let len = reader.get_length()?;
                let mut long_array = Vec::with_capacity(len.min(4096));
                for _ in 0..len {
                    long_array.push(reader.get_i64_be()?);
                }
                Ok(NbtTag::LongArray(long_array.into_boxed_slice()))
            }
            _ => Err(Error::UnknownTagId(tag_id)),
        }
    }

    pub fn extract_byte(&self) -> Option<i8> {
        match self {
            NbtTag::Byte(byte) => Some(*byte),
            _ => None,
        }
    }

    pub fn extract_int(&self) -> Option<i32> {
        match self {
            NbtTag::Int(int) => Some(*int),
            _ => None,
        }
    }

    pub fn extract_byte_array(&self) -> Option<&[u8]> {
        match self {
            NbtTag::ByteArray(byte_array) => Some(byte_array),
            _ => None,
        }
    }

    pub fn extract_byte_array_mut(&mut self) -> Option<&mut Box<[u8]>> {
        match self {
            NbtTag::ByteArray(byte_array) => Some(byte_array),
            _ => None,
        }
    }

    pub fn extract_string(&self) -> Option<&String> {
        match self {
            NbtTag::String(string) => Some(string),
            _ => None,
        }
    }

    pub fn extract_list(&self) -> Option<&NbtList> {
        match self {
            NbtTag::List(list) => Some(list),
            _ => None,
        }
    }

    pub fn extract_list_mut(&mut self) -> Option<&mut NbtList> {
        match self {
            NbtTag::List(list) => Some(list),
            _ => None,
        }
    }

    pub fn extract_compound(&self) -> Option<&NbtCompound> {
        match self {
            NbtTag::Compound(compound) => Some(compound),
            _ => None,
        }
    }

    pub fn extract_compound_mut(&mut self) -> Option<&mut NbtCompound> {
        match self {
            NbtTag::Compound(compound) => Some(compound),
            _ => None,
        }
    }

}

impl From<&str> for NbtTag {
    fn from(value: &str) -> Self {
        NbtTag::String(value.to_string())
    }
}

impl From<&[u8]> for NbtTag {
    fn from(value: &[u8]) -> Self {
        NbtTag::ByteArray(value.into())
    }
}

impl From<Vec<u8>> for NbtTag {
    fn from(value: Vec<u8>) -> Self {
        NbtTag::ByteArray(value.into_boxed_slice())
    }
}

impl From<NbtList> for NbtTag {
    fn from(value: NbtList) -> Self {
        NbtTag::List(value)
    }
}

impl From<NbtCompound> for NbtTag {
    fn from(value: NbtCompound) -> Self {
        NbtTag::Compound(value)
    }
}

impl From<i32> for NbtTag {
    fn from(value: i32) -> Self {
        NbtTag::Int(value)
    }
}
