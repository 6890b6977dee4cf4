use std::io::Read;

use flate2::bufread::{GzDecoder, GzEncoder, ZlibDecoder, ZlibEncoder};

use super::CompressionError;

pub mod anvil;
pub mod sectors;

pub use anvil::{ChunkSlot, RegionFile};

/// Compression scheme byte stored in front of every chunk body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Compression {
    /// GZip Compression
    GZip = Self::GZIP_ID,
    /// ZLib Compression
    ZLib = Self::ZLIB_ID,
}

impl Compression {
    const GZIP_ID: u8 = 1;
    const ZLIB_ID: u8 = 2;

    pub fn from_byte(byte: u8) -> Result<Self, CompressionError> {
        match byte {
            Self::GZIP_ID => Ok(Self::GZip),
            Self::ZLIB_ID => Ok(Self::ZLib),
            // Uncompressed, LZ4 and custom schemes postdate this layout
            other => Err(CompressionError::UnknownCompression(other)),
        }
    }

    pub fn decompress_data(&self, compressed_data: &[u8]) -> Result<Vec<u8>, CompressionError> {
        let mut chunk_data = Vec::new();
        match self {
            Compression::GZip => {
                let mut decoder = GzDecoder::new(compressed_data);
                decoder
                    .read_to_end(&mut chunk_data)
                    .map_err(CompressionError::GZipError)?;
            }
            Compression::ZLib => {
                let mut decoder = ZlibDecoder::new(compressed_data);
                decoder
                    .read_to_end(&mut chunk_data)
                    .map_err(CompressionError::ZlibError)?;
            }
        }
        Ok(chunk_data)
    }

    pub fn compress_data(
        &self,
        uncompressed_data: &[u8],
        compression_level: u32,
    ) -> Result<Vec<u8>, CompressionError> {
        let mut chunk_data = Vec::new();
        match self {
            Compression::GZip => {
                let mut encoder = GzEncoder::new(
                    uncompressed_data,
                    flate2::Compression::new(compression_level),
                );
                encoder
                    .read_to_end(&mut chunk_data)
                    .map_err(CompressionError::GZipError)?;
            }
            Compression::ZLib => {
                let mut encoder = ZlibEncoder::new(
                    uncompressed_data,
                    flate2::Compression::new(compression_level),
                );
                encoder
                    .read_to_end(&mut chunk_data)
                    .map_err(CompressionError::ZlibError)?;
            }
        }
        Ok(chunk_data)
    }
}
