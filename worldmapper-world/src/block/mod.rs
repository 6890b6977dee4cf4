use std::fmt;

pub mod remap;

pub use remap::{BlockRemapTable, RemapFlags};

pub use worldmapper_config::mapping::MAX_BLOCK_ID;

/// Number of distinct `id * 16 + meta` keys.
pub const BLOCK_KEY_COUNT: usize = (MAX_BLOCK_ID as usize + 1) * 16;

/// A block id together with its 4-bit metadata, packed as `id * 16 + meta`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct BlockKey(u16);

impl BlockKey {
    pub const AIR: Self = Self(0);

    pub const fn new(id: u16, meta: u8) -> Self {
        Self(((id & MAX_BLOCK_ID) << 4) | (meta & 0xF) as u16)
    }

    pub const fn from_index(index: usize) -> Self {
        Self(index as u16)
    }

    pub const fn id(self) -> u16 {
        self.0 >> 4
    }

    pub const fn meta(self) -> u8 {
        (self.0 & 0xF) as u8
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Only id 0 counts as air; the meta is ignored.
    pub const fn is_air(self) -> bool {
        self.id() == 0
    }
}

impl fmt::Debug for BlockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockKey({}:{})", self.id(), self.meta())
    }
}

impl fmt::Display for BlockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.id(), self.meta())
    }
}
