use std::path::Path;

use worldmapper_world::{RegionFile, chunk::format::anvil::REGION_SIZE};

use super::{BatchReport, FileOutcome, WorldVisitor, copy_file, prepare_destination, walk};
use crate::error::MapperError;

/// Overlays one world onto another. The destination's own files win except
/// for chunks, which are taken from the source.
pub struct WorldMerger {
    compression_level: u32,
}

impl WorldMerger {
    pub fn new(compression_level: u32) -> Self {
        Self { compression_level }
    }

    fn merge_region(&self, src: &Path, dest: &Path) -> Result<FileOutcome, MapperError> {
        let mut source_region = RegionFile::new(src);
        source_region.load().map_err(MapperError::RegionLoad)?;
        if source_region.is_full() {
            log::info!("Region {} is complete, replacing", dest.display());
            source_region.cleanup();
            copy_file(src, dest)?;
            return Ok(FileOutcome::Copied);
        }

        let mut target =
            RegionFile::new(dest).with_compression_level(self.compression_level);
        target.load().map_err(MapperError::RegionLoad)?;

        let mut merged = 0;
        for x in 0..REGION_SIZE {
            for z in 0..REGION_SIZE {
                let Some(chunk) = source_region
                    .read_chunk(x, z)
                    .map_err(|source| MapperError::ChunkRead { x, z, source })?
                else {
                    continue;
                };
                target
                    .write_chunk(x, z, &chunk)
                    .map_err(|source| MapperError::ChunkWrite { x, z, source })?;
                let timestamp = source_region.chunk_timestamp(x, z).unwrap_or_default();
                target
                    .write_chunk_timestamp(x, z, timestamp)
                    .map_err(|source| MapperError::ChunkWrite { x, z, source })?;
                merged += 1;
            }
        }
        log::info!("Region {}: merged {merged} chunks", dest.display());
        Ok(FileOutcome::Processed)
    }
}

impl WorldVisitor for WorldMerger {
    fn visit_region(&mut self, src: &Path, dest: &Path) -> Result<FileOutcome, MapperError> {
        if !dest.exists() {
            copy_file(src, dest)?;
            return Ok(FileOutcome::Copied);
        }
        self.merge_region(src, dest)
    }

    fn visit_file(&mut self, src: &Path, dest: &Path) -> Result<FileOutcome, MapperError> {
        if dest.exists() {
            log::debug!("Keeping existing {}", dest.display());
            return Ok(FileOutcome::Skipped);
        }
        copy_file(src, dest)?;
        Ok(FileOutcome::Copied)
    }
}

/// Merges `src` into `dest`, creating `dest` when needed. A region that fails
/// to merge is left as it was; it is never deleted.
pub fn run_merge(
    src: &Path,
    dest: &Path,
    compression_level: u32,
) -> Result<BatchReport, MapperError> {
    prepare_destination(src, dest)?;

    let mut merger = WorldMerger::new(compression_level);
    let mut report = BatchReport::default();
    walk(src, dest, &mut merger, &mut report);
    Ok(report)
}
