use thiserror::Error;

pub mod format;
pub mod section;
pub mod transform;

pub use section::ChunkSection;
pub use transform::{ChunkTransformer, TransformStats};

/// Columns in a chunk, and the length of the `Biomes` array.
pub const CHUNK_AREA: usize = 16 * 16;
/// Cells in one 16 high section.
pub const SUBCHUNK_VOLUME: usize = CHUNK_AREA * 16;

#[derive(Error, Debug)]
pub enum ChunkReadingError {
    #[error("Io error: {0}")]
    IoError(std::io::ErrorKind),
    #[error("Invalid header")]
    InvalidHeader,
    #[error("Region is invalid")]
    RegionIsInvalid,
    #[error("Chunk {0} overlaps sectors already claimed by another chunk")]
    OverlappingSectors(usize),
    #[error("Chunk length {length} does not fit in {sectors} allocated sectors")]
    InvalidLength { length: u32, sectors: u8 },
    #[error("Compression error {0}")]
    Compression(CompressionError),
    #[error("Failed to parse Chunk from bytes: {0}")]
    ParsingError(ChunkParsingError),
}

#[derive(Error, Debug)]
pub enum ChunkWritingError {
    #[error("Io error: {0}")]
    IoError(std::io::ErrorKind),
    #[error("Compression error {0}")]
    Compression(CompressionError),
    #[error("Chunk serializing error: {0}")]
    ChunkSerializingError(String),
    #[error("Chunk needs {0} sectors, at most 255 can be addressed")]
    ChunkTooLarge(usize),
    #[error("Region file is not loaded")]
    NotLoaded,
}

#[derive(Error, Debug)]
pub enum CompressionError {
    #[error("Compression scheme {0} not recognised")]
    UnknownCompression(u8),
    #[error("Error while working with zlib compression: {0}")]
    ZlibError(std::io::Error),
    #[error("Error while working with Gzip compression: {0}")]
    GZipError(std::io::Error),
}

#[derive(Error, Debug)]
pub enum ChunkParsingError {
    #[error("Error deserializing chunk: {0}")]
    ErrorDeserializingChunk(String),
    #[error("Chunk tag tree is malformed: {0}")]
    Nbt(#[from] worldmapper_nbt::Error),
    #[error("Array '{name}' has {found} bytes, expected {expected}")]
    InvalidArrayLength {
        name: &'static str,
        expected: usize,
        found: usize,
    },
}
