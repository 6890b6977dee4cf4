pub mod biome;
pub mod block;
pub mod chunk;

pub use block::{BlockKey, BlockRemapTable, RemapFlags};
pub use chunk::{ChunkTransformer, TransformStats, format::RegionFile};
