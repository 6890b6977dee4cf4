use std::{
    fs::{File, OpenOptions},
    io::{ErrorKind, Read, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
};

use bytes::{Buf, BufMut, BytesMut};
use worldmapper_nbt::Nbt;

use super::{
    Compression,
    sectors::{HEADER_SECTORS, SectorBitmap},
};
use crate::chunk::{ChunkParsingError, ChunkReadingError, ChunkWritingError};

/// The side size of a region in chunks (one region is 32x32 chunks)
pub const REGION_SIZE: usize = 32;

/// The number of chunks in a region
pub const CHUNK_COUNT: usize = REGION_SIZE * REGION_SIZE;

/// The number of bytes in a sector (4 KiB)
pub const SECTOR_BYTES: usize = 4096;

const HEADER_BYTES: usize = SECTOR_BYTES * HEADER_SECTORS as usize;

/// Largest count the one byte length field can hold.
const MAX_CHUNK_SECTORS: usize = u8::MAX as usize;

/// Location of one chunk in the file, as stored in the header tables.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ChunkSlot {
    /// In sectors; 0 means the slot is empty.
    pub sector_offset: u32,
    pub sector_count: u8,
    pub timestamp: u32,
}

impl ChunkSlot {
    pub fn is_allocated(&self) -> bool {
        self.sector_offset > 0
    }
}

/// Sectors needed for a frame holding `compressed_len` bytes of body.
///
/// Counts the 4 byte length and the scheme byte, and always rounds up to the
/// next whole sector even when the frame fills the last one exactly.
pub fn sector_count_for(compressed_len: usize) -> usize {
    (compressed_len + 5) / SECTOR_BYTES + 1
}

fn slot_index(x: usize, z: usize) -> Option<usize> {
    (x < REGION_SIZE && z < REGION_SIZE).then_some(x + z * REGION_SIZE)
}

fn io_read(err: std::io::Error) -> ChunkReadingError {
    ChunkReadingError::IoError(err.kind())
}

fn io_write(err: std::io::Error) -> ChunkWritingError {
    ChunkWritingError::IoError(err.kind())
}

/// A single `.mca` region file opened for in-place editing.
///
/// Chunks are framed as `[u32 length][u8 scheme][body]` starting on a sector
/// boundary. Written chunks are always zlib compressed.
pub struct RegionFile {
    path: PathBuf,
    file: Option<File>,
    slots: Box<[ChunkSlot; CHUNK_COUNT]>,
    sectors: SectorBitmap,
    compression_level: u32,
}

impl RegionFile {
    /// Does not touch the disk until [`RegionFile::load`].
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: None,
            slots: Box::new([ChunkSlot::default(); CHUNK_COUNT]),
            sectors: SectorBitmap::new(),
            compression_level: 6,
        }
    }

    pub fn with_compression_level(mut self, compression_level: u32) -> Self {
        self.compression_level = compression_level;
        self
    }

    /// Writes an empty region (zeroed header, no chunks) and loads it.
    pub fn create(path: impl Into<PathBuf>) -> Result<Self, ChunkWritingError> {
        let mut region = Self::new(path);
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&region.path)
            .map_err(io_write)?;
        file.write_all(&[0; HEADER_BYTES]).map_err(io_write)?;
        region.file = Some(file);
        Ok(region)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_loaded(&self) -> bool {
        self.file.is_some()
    }

    /// Opens the file and reads both header tables, rebuilding the sector
    /// bitmap. Fails when the header is truncated or two chunks share a sector.
    pub fn load(&mut self) -> Result<(), ChunkReadingError> {
        self.cleanup();

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&self.path)
            .map_err(io_read)?;
        let length = file.metadata().map_err(io_read)?.len();
        if length < HEADER_BYTES as u64 {
            return Err(ChunkReadingError::InvalidHeader);
        }

        let mut header = vec![0; HEADER_BYTES];
        file.read_exact(&mut header).map_err(io_read)?;
        let (mut locations, mut timestamps) = header.split_at(SECTOR_BYTES);

        let mut overlap = None;
        for (index, slot) in self.slots.iter_mut().enumerate() {
            let location = locations.get_u32();
            slot.sector_offset = location >> 8;
            slot.sector_count = (location & 0xFF) as u8;
            slot.timestamp = timestamps.get_u32();

            if slot.sector_offset > 0
                && self
                    .sectors
                    .claim(slot.sector_offset, u32::from(slot.sector_count))
                    .is_err()
            {
                overlap = Some(index);
                break;
            }
        }
        if let Some(index) = overlap {
            // Leave no half-built tables behind
            self.slots.fill(ChunkSlot::default());
            self.sectors.clear();
            return Err(ChunkReadingError::OverlappingSectors(index));
        }

        self.file = Some(file);
        Ok(())
    }

    /// Closes the file and forgets every slot. Safe to call repeatedly.
    pub fn cleanup(&mut self) {
        self.file = None;
        self.slots.fill(ChunkSlot::default());
        self.sectors.clear();
    }

    pub fn slot(&self, x: usize, z: usize) -> Option<ChunkSlot> {
        slot_index(x, z).map(|index| self.slots[index])
    }

    pub fn chunk_exists(&self, x: usize, z: usize) -> bool {
        self.slot(x, z)
            .is_some_and(|slot| slot.sector_offset > 0 && slot.sector_count > 0)
    }

    /// Number of populated slots.
    pub fn chunk_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| slot.sector_offset > 0 && slot.sector_count > 0)
            .count()
    }

    /// Every slot of the grid holds a chunk.
    pub fn is_full(&self) -> bool {
        self.chunk_count() == CHUNK_COUNT
    }

    pub fn chunk_timestamp(&self, x: usize, z: usize) -> Option<u32> {
        self.slot(x, z).map(|slot| slot.timestamp)
    }

    /// Sectors currently claimed, header included.
    pub fn used_sectors(&self) -> usize {
        self.sectors.used_count()
    }

    /// Reads and decompresses a chunk. `None` for coordinates outside the
    /// region and for empty slots.
    pub fn read_chunk(&mut self, x: usize, z: usize) -> Result<Option<Nbt>, ChunkReadingError> {
        let Some(index) = slot_index(x, z) else {
            return Ok(None);
        };
        let slot = self.slots[index];
        if !slot.is_allocated() {
            return Ok(None);
        }
        let file = self.file.as_mut().ok_or(ChunkReadingError::RegionIsInvalid)?;

        file.seek(SeekFrom::Start(slot.sector_offset as u64 * SECTOR_BYTES as u64))
            .map_err(io_read)?;
        let mut frame_header = [0; 5];
        file.read_exact(&mut frame_header).map_err(|err| match err.kind() {
            ErrorKind::UnexpectedEof => ChunkReadingError::RegionIsInvalid,
            kind => ChunkReadingError::IoError(kind),
        })?;
        let mut frame_header = &frame_header[..];
        let length = frame_header.get_u32();
        let scheme = frame_header.get_u8();

        if length == 0 || length as usize > slot.sector_count as usize * SECTOR_BYTES {
            return Err(ChunkReadingError::InvalidLength {
                length,
                sectors: slot.sector_count,
            });
        }
        let compression = Compression::from_byte(scheme).map_err(ChunkReadingError::Compression)?;

        // The length counts the scheme byte
        let mut compressed = vec![0; length as usize - 1];
        file.read_exact(&mut compressed).map_err(|err| match err.kind() {
            ErrorKind::UnexpectedEof => ChunkReadingError::RegionIsInvalid,
            kind => ChunkReadingError::IoError(kind),
        })?;

        let raw = compression
            .decompress_data(&compressed)
            .map_err(ChunkReadingError::Compression)?;
        Nbt::from_bytes(&raw)
            .map(Some)
            .map_err(|err| ChunkReadingError::ParsingError(ChunkParsingError::Nbt(err)))
    }

    /// Serializes, compresses and stores a chunk, moving it if it grew.
    ///
    /// Returns `false` for coordinates outside the region. The slot's
    /// timestamp is left alone.
    pub fn write_chunk(&mut self, x: usize, z: usize, chunk: &Nbt) -> Result<bool, ChunkWritingError> {
        let Some(index) = slot_index(x, z) else {
            return Ok(false);
        };
        if self.file.is_none() {
            return Err(ChunkWritingError::NotLoaded);
        }

        let raw = chunk
            .write()
            .map_err(|err| ChunkWritingError::ChunkSerializingError(err.to_string()))?;
        let compressed = Compression::ZLib
            .compress_data(&raw, self.compression_level)
            .map_err(ChunkWritingError::Compression)?;

        let new_count = sector_count_for(compressed.len());
        if new_count > MAX_CHUNK_SECTORS {
            return Err(ChunkWritingError::ChunkTooLarge(new_count));
        }
        let new_count = new_count as u32;

        let slot = self.slots[index];
        let current = slot
            .is_allocated()
            .then_some((slot.sector_offset, u32::from(slot.sector_count)));
        let offset = match current {
            Some((offset, count)) if new_count <= count => offset,
            // A grown chunk never extends in place; its old range counts as free
            _ => self.sectors.find_free(new_count, current),
        };
        log::trace!(
            "Chunk {x},{z} in {:?}: {new_count} sectors at {offset} (was {:?})",
            self.path,
            current
        );

        let mut frame = BytesMut::with_capacity(compressed.len() + 5);
        frame.put_u32(compressed.len() as u32 + 1);
        frame.put_u8(Compression::ZLib as u8);
        frame.put_slice(&compressed);

        let Some(file) = self.file.as_mut() else {
            return Err(ChunkWritingError::NotLoaded);
        };
        let end = (offset + new_count) as u64 * SECTOR_BYTES as u64;
        if file.metadata().map_err(io_write)?.len() < end {
            file.set_len(end).map_err(io_write)?;
        }
        file.seek(SeekFrom::Start(offset as u64 * SECTOR_BYTES as u64))
            .map_err(io_write)?;
        file.write_all(&frame).map_err(io_write)?;
        self.write_location(index, offset, new_count as u8)?;

        // The bitmap only changes once frame and header are on disk
        match current {
            Some((_, old_count)) if new_count <= old_count => {
                self.sectors
                    .free(offset + new_count, old_count - new_count);
            }
            Some((old_offset, old_count)) => {
                self.sectors.free(old_offset, old_count);
                self.sectors.mark(offset, new_count);
            }
            None => self.sectors.mark(offset, new_count),
        }
        Ok(true)
    }

    /// Frees the chunk's sectors and clears its header entry. The file is not
    /// shortened.
    pub fn delete_chunk(&mut self, x: usize, z: usize) -> Result<bool, ChunkWritingError> {
        let Some(index) = slot_index(x, z) else {
            return Ok(false);
        };
        let slot = self.slots[index];
        if slot.is_allocated() {
            self.sectors
                .free(slot.sector_offset, u32::from(slot.sector_count));
        }
        self.write_location(index, 0, 0)?;
        Ok(true)
    }

    pub fn write_chunk_timestamp(
        &mut self,
        x: usize,
        z: usize,
        timestamp: u32,
    ) -> Result<bool, ChunkWritingError> {
        let Some(index) = slot_index(x, z) else {
            return Ok(false);
        };
        let file = self.file.as_mut().ok_or(ChunkWritingError::NotLoaded)?;
        file.seek(SeekFrom::Start((SECTOR_BYTES + index * 4) as u64))
            .map_err(io_write)?;
        file.write_all(&timestamp.to_be_bytes()).map_err(io_write)?;
        self.slots[index].timestamp = timestamp;
        Ok(true)
    }

    fn write_location(
        &mut self,
        index: usize,
        offset: u32,
        count: u8,
    ) -> Result<(), ChunkWritingError> {
        let file = self.file.as_mut().ok_or(ChunkWritingError::NotLoaded)?;
        file.seek(SeekFrom::Start((index * 4) as u64))
            .map_err(io_write)?;
        file.write_all(&((offset << 8) | u32::from(count)).to_be_bytes())
            .map_err(io_write)?;

        let slot = &mut self.slots[index];
        slot.sector_offset = offset;
        slot.sector_count = count;
        Ok(())
    }
}

impl Drop for RegionFile {
    fn drop(&mut self) {
        self.cleanup();
    }
}
