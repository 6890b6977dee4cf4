use std::{fs, path::Path};

use rand::Rng;
use worldmapper_config::MappingConfig;
use worldmapper_world::{
    BlockRemapTable, ChunkTransformer, RegionFile, chunk::format::anvil::REGION_SIZE,
};

use super::{
    BatchReport, FileOutcome, WorldVisitor, copy_file, is_up_to_date, prepare_destination,
    sync_modified, walk,
};
use crate::error::MapperError;

#[derive(Clone, Copy, Debug)]
pub struct MapOptions {
    /// Skip files whose destination already carries the source's modification
    /// time, and stamp processed files with it.
    pub update: bool,
    pub compression_level: u32,
}

impl Default for MapOptions {
    fn default() -> Self {
        Self {
            update: false,
            compression_level: 6,
        }
    }
}

#[derive(Default)]
struct RegionSummary {
    chunks: usize,
    blocks_mapped: u64,
    chunks_updated: usize,
    tile_entities_scrubbed: u64,
    empty_removed: usize,
}

/// Copies a world while remapping every region file through a
/// [`BlockRemapTable`].
pub struct WorldMapper<'a, R: Rng> {
    table: &'a BlockRemapTable,
    options: MapOptions,
    rng: R,
}

impl<'a, R: Rng> WorldMapper<'a, R> {
    pub fn new(table: &'a BlockRemapTable, options: MapOptions, rng: R) -> Self {
        Self {
            table,
            options,
            rng,
        }
    }

    fn map_region(&mut self, src: &Path, dest: &Path) -> Result<FileOutcome, MapperError> {
        copy_file(src, dest)?;
        let mut region = RegionFile::new(dest).with_compression_level(self.options.compression_level);
        region.load().map_err(MapperError::RegionLoad)?;

        let mut summary = RegionSummary::default();
        for x in 0..REGION_SIZE {
            for z in 0..REGION_SIZE {
                if !region.chunk_exists(x, z) {
                    continue;
                }
                summary.chunks += 1;
                let Some(mut chunk) = region
                    .read_chunk(x, z)
                    .map_err(|source| MapperError::ChunkRead { x, z, source })?
                else {
                    log::warn!("Chunk {x},{z} exists but not read");
                    continue;
                };

                let stats = ChunkTransformer::new(self.table, &mut self.rng)
                    .transform(&mut chunk)
                    .map_err(|source| MapperError::ChunkParse { x, z, source })?;
                summary.blocks_mapped += u64::from(stats.blocks_mapped);
                summary.tile_entities_scrubbed += u64::from(stats.tile_entities_scrubbed);

                if stats.is_empty {
                    region
                        .delete_chunk(x, z)
                        .map_err(|source| MapperError::ChunkWrite { x, z, source })?;
                    summary.empty_removed += 1;
                } else if stats.is_modified() {
                    region
                        .write_chunk(x, z, &chunk)
                        .map_err(|source| MapperError::ChunkWrite { x, z, source })?;
                    summary.chunks_updated += 1;
                }
            }
        }
        let remaining = region.chunk_count();
        region.cleanup();

        log::info!(
            "Region {}, {} chunks: updated {} blocks in {} chunks, {} TileEntities scrubbed, {} empty chunks removed",
            dest.display(),
            summary.chunks,
            summary.blocks_mapped,
            summary.chunks_updated,
            summary.tile_entities_scrubbed,
            summary.empty_removed
        );

        if remaining == 0 {
            log::info!("Region {} has no chunks left, removing", dest.display());
            fs::remove_file(dest).map_err(MapperError::io("Couldn't remove", dest))?;
            return Ok(FileOutcome::Removed);
        }
        Ok(FileOutcome::Processed)
    }
}

impl<R: Rng> WorldVisitor for WorldMapper<'_, R> {
    fn visit_region(&mut self, src: &Path, dest: &Path) -> Result<FileOutcome, MapperError> {
        if self.options.update && is_up_to_date(src, dest) {
            log::debug!("Region {} is up to date", dest.display());
            return Ok(FileOutcome::Skipped);
        }
        let outcome = self.map_region(src, dest)?;
        if self.options.update && outcome == FileOutcome::Processed {
            sync_modified(src, dest)?;
        }
        Ok(outcome)
    }

    fn visit_file(&mut self, src: &Path, dest: &Path) -> Result<FileOutcome, MapperError> {
        if self.options.update && is_up_to_date(src, dest) {
            return Ok(FileOutcome::Skipped);
        }
        copy_file(src, dest)?;
        if self.options.update {
            sync_modified(src, dest)?;
        }
        Ok(FileOutcome::Copied)
    }

    /// Partial output is never left behind.
    fn discard(&mut self, dest: &Path) {
        if dest.exists() {
            if let Err(err) = fs::remove_file(dest) {
                log::warn!("Couldn't remove partial output {}: {err}", dest.display());
            }
        }
    }
}

/// Validates the arguments, builds the remap table and converts `src` into
/// `dest`. Only argument and configuration problems are returned as errors;
/// failures on single files are logged and counted in the report.
pub fn run_map(
    src: &Path,
    map_file: &Path,
    dest: &Path,
    options: MapOptions,
) -> Result<BatchReport, MapperError> {
    if !src.is_dir() {
        return Err(MapperError::InvalidArguments(format!(
            "Source '{}' must be existing world directory.",
            src.display()
        )));
    }
    if !map_file.is_file() {
        return Err(MapperError::InvalidArguments(format!(
            "Mapping file '{}' must be existing JSON encoded mapping file.",
            map_file.display()
        )));
    }
    prepare_destination(src, dest)?;

    let table = BlockRemapTable::from_config(&MappingConfig::load(map_file)?)?;
    if table.is_identity() {
        log::warn!("Mapping file changes no blocks, the world will only be copied");
    }

    let mut mapper = WorldMapper::new(&table, options, rand::rng());
    let mut report = BatchReport::default();
    walk(src, dest, &mut mapper, &mut report);
    Ok(report)
}
