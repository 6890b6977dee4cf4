use std::{
    io::{self, Read, Write},
    ops::{Deref, DerefMut},
};

use bytes::Bytes;
use compound::NbtCompound;
use reader::ReadAdaptor;
use thiserror::Error;
use writer::WriteAdaptor;

pub mod compound;
pub mod reader;
pub mod tag;
pub mod writer;

pub use tag::NbtList;

pub const END_ID: u8 = 0x00;
pub const BYTE_ID: u8 = 0x01;
pub const SHORT_ID: u8 = 0x02;
pub const INT_ID: u8 = 0x03;
pub const LONG_ID: u8 = 0x04;
pub const FLOAT_ID: u8 = 0x05;
pub const DOUBLE_ID: u8 = 0x06;
pub const BYTE_ARRAY_ID: u8 = 0x07;
pub const STRING_ID: u8 = 0x08;
pub const LIST_ID: u8 = 0x09;
pub const COMPOUND_ID: u8 = 0x0A;
pub const INT_ARRAY_ID: u8 = 0x0B;
pub const LONG_ARRAY_ID: u8 = 0x0C;

#[derive(Error, Debug)]
pub enum Error {
    #[error("The root tag of the NBT file is not a compound tag. Received tag id: {0}")]
    NoRootCompound(u8),
    #[error("Encountered an unknown NBT tag id {0}.")]
    UnknownTagId(u8),
    #[error("Failed to Cesu 8 Decode")]
    Cesu8DecodingError,
    #[error("NBT reading was cut short {0}")]
    Incomplete(io::Error),
    #[error("Negative list length {0}")]
    NegativeLength(i32),
    #[error("Length too large {0}")]
    LargeLength(usize),
    #[error("List declared element type {expected} but contains a tag of type {found}")]
    ListTypeMismatch { expected: u8, found: u8 },
    #[error("Missing required field \"{0}\"")]
    MissingField(String),
    #[error("Field \"{field}\" has tag type {found}, expected {expected}")]
    WrongTagType {
        field: String,
        expected: u8,
        found: u8,
    },
}

/// A named root compound, as stored in region files and `.dat` files.
#[derive(Clone, Debug, Default, PartialEq, PartialOrd)]
pub struct Nbt {
    pub name: String,
    pub root_tag: NbtCompound,
}

impl Nbt {
    pub fn new(name: String, tag: NbtCompound) -> Self {
        Nbt {
            name,
            root_tag: tag,
        }
    }

    pub fn read<R>(reader: &mut ReadAdaptor<R>) -> Result<Nbt, Error>
    where
        R: Read,
    {
        let tag_type_id = reader.get_u8_be()?;

        if tag_type_id != COMPOUND_ID {
            return Err(Error::NoRootCompound(tag_type_id));
        }

        Ok(Nbt {
            name: get_nbt_string(reader)?,
            root_tag: NbtCompound::deserialize_content(reader)?,
        })
    }

    /// Parses a complete uncompressed NBT document.
    pub fn from_bytes(bytes: &[u8]) -> Result<Nbt, Error> {
        let mut reader = ReadAdaptor::new(bytes);
        Self::read(&mut reader)
    }

    pub fn write(&self) -> Result<Bytes, Error> {
        let mut bytes = Vec::new();
        self.write_to_writer(&mut bytes)?;
        Ok(bytes.into())
    }

    pub fn write_to_writer<W: Write>(&self, writer: W) -> Result<(), Error> {
        let mut writer = WriteAdaptor::new(writer);
        writer.write_u8_be(COMPOUND_ID)?;
        write_nbt_string(&mut writer, &self.name)?;
        self.root_tag.serialize_content(&mut writer)
    }
}

impl Deref for Nbt {
    type Target = NbtCompound;

    fn deref(&self) -> &Self::Target {
        &self.root_tag
    }
}

impl DerefMut for Nbt {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.root_tag
    }
}

pub fn get_nbt_string<R: Read>(bytes: &mut ReadAdaptor<R>) -> Result<String, Error> {
    let len = bytes.get_u16_be()? as usize;
    let string_bytes = bytes.read_boxed_slice(len)?;
    let string = cesu8::from_java_cesu8(&string_bytes).map_err(|_| Error::Cesu8DecodingError)?;
    Ok(string.to_string())
}

pub fn write_nbt_string<W: Write>(w: &mut WriteAdaptor<W>, string: &str) -> Result<(), Error> {
    let java_string = cesu8::to_java_cesu8(string);
    let len = java_string.len();
    if len > u16::MAX as usize {
        return Err(Error::LargeLength(len));
    }

    w.write_u16_be(len as u16)?;
    w.write_slice(&java_string)
}
