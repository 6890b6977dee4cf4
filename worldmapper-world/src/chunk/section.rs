use worldmapper_nbt::compound::NbtCompound;

use super::{ChunkParsingError, SUBCHUNK_VOLUME};
use crate::block::BlockKey;

const NIBBLE_ARRAY_LEN: usize = SUBCHUNK_VOLUME / 2;

fn get_nibble(array: &[u8], index: usize) -> u8 {
    let byte = array[index >> 1];
    if index & 1 == 0 { byte & 0xF } else { byte >> 4 }
}

fn set_nibble(array: &mut [u8], index: usize, value: u8) {
    let byte = &mut array[index >> 1];
    if index & 1 == 0 {
        *byte = (*byte & 0xF0) | (value & 0xF);
    } else {
        *byte = (*byte & 0x0F) | (value << 4);
    }
}

pub(super) fn required_array(
    section: &NbtCompound,
    name: &'static str,
    expected: usize,
) -> Result<Box<[u8]>, ChunkParsingError> {
    let array = section.try_get_byte_array(name)?;
    if array.len() < expected {
        return Err(ChunkParsingError::InvalidArrayLength {
            name,
            expected,
            found: array.len(),
        });
    }
    Ok(array.into())
}

/// A working copy of one 16x16x16 section's block arrays.
///
/// Cells are addressed by their YZX index: `x = i & 15`, `z = (i >> 4) & 15`,
/// `y = i >> 8`. Changes stay local until [`ChunkSection::write_to`].
#[derive(Clone, Debug)]
pub struct ChunkSection {
    /// Signed vertical index of the section, from the `Y` tag.
    pub y: i8,
    /// Position in the chunk's `Sections` list.
    pub list_index: usize,
    blocks: Box<[u8]>,
    data: Box<[u8]>,
    add: Option<Box<[u8]>>,
    add_created: bool,
    dirty: bool,
}

impl ChunkSection {
    pub fn from_nbt(section: &NbtCompound, list_index: usize) -> Result<Self, ChunkParsingError> {
        let y = section.try_get_byte("Y")?;
        let blocks = required_array(section, "Blocks", SUBCHUNK_VOLUME)?;
        let data = required_array(section, "Data", NIBBLE_ARRAY_LEN)?;
        let add = match section.get("Add") {
            Some(_) => Some(required_array(section, "Add", NIBBLE_ARRAY_LEN)?),
            None => None,
        };

        Ok(Self {
            y,
            list_index,
            blocks,
            data,
            add,
            add_created: false,
            dirty: false,
        })
    }

    pub fn block(&self, index: usize) -> BlockKey {
        let mut id = self.blocks[index] as u16;
        if let Some(add) = &self.add {
            id |= (get_nibble(add, index) as u16) << 8;
        }
        BlockKey::new(id, get_nibble(&self.data, index))
    }

    /// Ids above 255 allocate the `Add` array on first use.
    pub fn set_block(&mut self, index: usize, key: BlockKey) {
        let id = key.id();
        self.blocks[index] = (id & 0xFF) as u8;
        set_nibble(&mut self.data, index, key.meta());

        let high = (id >> 8) as u8;
        if high != 0 && self.add.is_none() {
            self.add = Some(vec![0; NIBBLE_ARRAY_LEN].into_boxed_slice());
            self.add_created = true;
        }
        if let Some(add) = &mut self.add {
            set_nibble(add, index, high);
        }
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn has_add(&self) -> bool {
        self.add.is_some()
    }

    /// Stores the arrays back into the section compound if anything changed.
    pub fn write_to(self, section: &mut NbtCompound) -> Result<(), ChunkParsingError> {
        if !self.dirty {
            return Ok(());
        }
        section
            .try_get_byte_array_mut("Blocks")?
            .copy_from_slice(&self.blocks);
        section
            .try_get_byte_array_mut("Data")?
            .copy_from_slice(&self.data);
        if let Some(add) = self.add {
            if self.add_created {
                section.insert("Add", add.into_vec());
            } else {
                section.try_get_byte_array_mut("Add")?.copy_from_slice(&add);
            }
        }
        Ok(())
    }
}
