use crate::reader::ReadAdaptor;
use crate::tag::{NbtList, NbtTag};
use crate::writer::WriteAdaptor;
use crate::{
    BYTE_ARRAY_ID, BYTE_ID, COMPOUND_ID, END_ID, Error, INT_ID, LIST_ID, get_nbt_string,
    write_nbt_string,
};
use std::io::{Read, Write};

/// An ordered compound. Children keep the order they were read or inserted in,
/// which makes writing back an unmodified compound byte-identical.
#[derive(Clone, Debug, Default, PartialEq, PartialOrd)]
pub struct NbtCompound {
    pub child_tags: Vec<(String, NbtTag)>,
}

macro_rules! typed_getter {
    ($try_name:ident, $opt_name:ident, $extract:ident, $id:expr, $ty:ty) => {
        pub fn $opt_name(&self, name: &str) -> Option<$ty> {
            self.get(name).and_then(|tag| tag.$extract())
        }

        pub fn $try_name(&self, name: &str) -> Result<$ty, Error> {
            let tag = self.require(name)?;
            tag.$extract().ok_or_else(|| wrong_type(name, $id, tag))
        }
    };
}

fn wrong_type(name: &str, expected: u8, tag: &NbtTag) -> Error {
    Error::WrongTagType {
        field: name.to_string(),
        expected,
        found: tag.get_type_id(),
    }
}

impl NbtCompound {
    pub fn new() -> NbtCompound {
        NbtCompound {
            child_tags: Vec::new(),
        }
    }

    pub fn deserialize_content<R>(reader: &mut ReadAdaptor<R>) -> Result<NbtCompound, Error>
    where
        R: Read,
    {
        let mut compound = NbtCompound::new();

        loop {
            let tag_id = reader.get_u8_be()?;
            if tag_id == END_ID {
                break;
            }

            let name = get_nbt_string(reader)?;
            let tag = NbtTag::deserialize_data(reader, tag_id)?;
            compound.child_tags.push((name, tag));
        }

        Ok(compound)
    }

    pub fn serialize_content<W>(&self, w: &mut WriteAdaptor<W>) -> Result<(), Error>
    where
        W: Write,
    {
        for (name, tag) in &self.child_tags {
            w.write_u8_be(tag.get_type_id())?;
            write_nbt_string(w, name)?;
            tag.serialize_data(w)?;
        }
        w.write_u8_be(END_ID)?;
        Ok(())
    }

    /// Adds a child unless one with the same name already exists.
    pub fn put(&mut self, name: &str, value: impl Into<NbtTag>) {
        if !self.contains(name) {
            self.child_tags.push((name.to_string(), value.into()));
        }
    }

    /// Replaces the child with the same name in place, or appends it.
    /// Returns the previous value.
    pub fn insert(&mut self, name: &str, value: impl Into<NbtTag>) -> Option<NbtTag> {
        let value = value.into();
        match self.get_mut(name) {
            Some(existing) => Some(std::mem::replace(existing, value)),
            None => {
                self.child_tags.push((name.to_string(), value));
                None
            }
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<NbtTag> {
        let index = self.child_tags.iter().position(|(key, _)| key == name)?;
        Some(self.child_tags.remove(index).1)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.child_tags.iter().any(|(key, _)| key == name)
    }

    pub fn put_byte(&mut self, name: &str, value: i8) {
        self.put(name, NbtTag::Byte(value));
    }

    pub fn put_int(&mut self, name: &str, value: i32) {
        self.put(name, NbtTag::Int(value));
    }

    pub fn put_long(&mut self, name: &str, value: i64) {
        self.put(name, NbtTag::Long(value));
    }

    pub fn put_component(&mut self, name: &str, value: NbtCompound) {
        self.put(name, NbtTag::Compound(value));
    }

    #[inline]
    pub fn get(&self, name: &str) -> Option<&NbtTag> {
        self.child_tags
            .iter()
            .find(|(key, _)| key.as_str() == name)
            .map(|(_, value)| value)
    }

    #[inline]
    pub fn get_mut(&mut self, name: &str) -> Option<&mut NbtTag> {
        self.child_tags
            .iter_mut()
            .find(|(key, _)| key.as_str() == name)
            .map(|(_, value)| value)
    }

    /// Like [`Self::get`], but a missing child is an error.
    pub fn require(&self, name: &str) -> Result<&NbtTag, Error> {
        self.get(name)
            .ok_or_else(|| Error::MissingField(name.to_string()))
    }

    pub fn require_mut(&mut self, name: &str) -> Result<&mut NbtTag, Error> {
        self.get_mut(name)
            .ok_or_else(|| Error::MissingField(name.to_string()))
    }

    typed_getter!(try_get_byte, get_byte, extract_byte, BYTE_ID, i8);
    typed_getter!(try_get_int, get_int, extract_int, INT_ID, i32);
    typed_getter!(
        try_get_byte_array,
        get_byte_array,
        extract_byte_array,
        BYTE_ARRAY_ID,
        &[u8]
    );
    typed_getter!(try_get_list, get_list, extract_list, LIST_ID, &NbtList);
    typed_getter!(
        try_get_compound,
        get_compound,
        extract_compound,
        COMPOUND_ID,
        &NbtCompound
    );

    pub fn get_string(&self, name: &str) -> Option<&String> {
        self.get(name).and_then(|tag| tag.extract_string())
    }

    pub fn try_get_byte_array_mut(&mut self, name: &str) -> Result<&mut Box<[u8]>, Error> {
        let tag = self.require_mut(name)?;
        let found = tag.get_type_id();
        tag.extract_byte_array_mut().ok_or(Error::WrongTagType {
            field: name.to_string(),
            expected: BYTE_ARRAY_ID,
            found,
        })
    }

    pub fn try_get_list_mut(&mut self, name: &str) -> Result<&mut NbtList, Error> {
        let tag = self.require_mut(name)?;
        let found = tag.get_type_id();
        tag.extract_list_mut().ok_or(Error::WrongTagType {
            field: name.to_string(),
            expected: LIST_ID,
            found,
        })
    }

    pub fn try_get_compound_mut(&mut self, name: &str) -> Result<&mut NbtCompound, Error> {
        let tag = self.require_mut(name)?;
        let found = tag.get_type_id();
        tag.extract_compound_mut().ok_or(Error::WrongTagType {
            field: name.to_string(),
            expected: COMPOUND_ID,
            found,
        })
    }
}
