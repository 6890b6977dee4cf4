use rand::Rng;
use worldmapper_nbt::{NbtList, compound::NbtCompound};

use super::{
    CHUNK_AREA, ChunkParsingError, SUBCHUNK_VOLUME, section::ChunkSection, section::required_array,
};
use crate::block::{BlockKey, BlockRemapTable, RemapFlags};

/// Per chunk counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TransformStats {
    pub blocks_mapped: u32,
    pub tile_entities_scrubbed: u32,
    /// No cell in any section holds a non-air block after the transform.
    pub is_empty: bool,
}

impl TransformStats {
    pub fn is_modified(&self) -> bool {
        self.blocks_mapped > 0
    }
}

/// Remaps every block of one chunk tag tree in place.
///
/// Created per chunk and dropped afterwards; the table is shared and the
/// random source is borrowed from the caller.
pub struct ChunkTransformer<'a, R: Rng> {
    table: &'a BlockRemapTable,
    rng: &'a mut R,
}

impl<'a, R: Rng> ChunkTransformer<'a, R> {
    pub fn new(table: &'a BlockRemapTable, rng: &'a mut R) -> Self {
        Self { table, rng }
    }

    /// Expects the pre-flattening layout: `Level` with `Biomes`, `Sections`
    /// and `TileEntities`. A missing field leaves the tree untouched.
    pub fn transform(&mut self, root: &mut NbtCompound) -> Result<TransformStats, ChunkParsingError> {
        let level = root.try_get_compound_mut("Level")?;
        let biomes = required_array(level, "Biomes", CHUNK_AREA)?;
        level.try_get_list("TileEntities")?;

        let mut sections = level
            .try_get_list("Sections")?
            .iter()
            .enumerate()
            .map(|(index, tag)| {
                let compound = tag.extract_compound().ok_or_else(|| {
                    ChunkParsingError::ErrorDeserializingChunk(format!(
                        "section {index} is not a compound"
                    ))
                })?;
                ChunkSection::from_nbt(compound, index)
            })
            .collect::<Result<Vec<_>, _>>()?;
        // Bottom up, so a block can see whether the one below survived
        sections.sort_by_key(|section| section.y);

        let mut stats = TransformStats::default();
        let mut tile_entities: Option<NbtList> = None;
        let mut any_solid = false;

        for current in 0..sections.len() {
            let (lower, rest) = sections.split_at_mut(current);
            let section = &mut rest[0];
            let below = lower
                .last()
                .filter(|below| i16::from(below.y) == i16::from(section.y) - 1);
            let base_y = i32::from(section.y) * 16;

            for index in 0..SUBCHUNK_VOLUME {
                let source = section.block(index);
                if source.is_air() {
                    continue;
                }

                let flags = self.table.flags(source);
                let biome = biomes[index & 0xFF];
                let mut destination = self.table.resolve(source, biome, &mut *self.rng);

                if flags.contains(RemapFlags::DROP_IF_UNSUPPORTED) {
                    let supported = if index >= CHUNK_AREA {
                        !section.block(index - CHUNK_AREA).is_air()
                    } else {
                        below.is_some_and(|below| !below.block(index + 15 * CHUNK_AREA).is_air())
                    };
                    if !supported {
                        destination = BlockKey::AIR;
                    }
                }

                if destination != source {
                    section.set_block(index, destination);
                    stats.blocks_mapped += 1;

                    if flags.contains(RemapFlags::DROP_TILE_ENTITY) {
                        let x = (index & 15) as i32;
                        let y = base_y + (index >> 8) as i32;
                        let z = ((index >> 4) & 15) as i32;
                        if remove_tile_entity(level, &mut tile_entities, x, y, z)? {
                            stats.tile_entities_scrubbed += 1;
                        }
                    }
                }

                if !destination.is_air() {
                    any_solid = true;
                }
            }
        }

        let list = level.try_get_list_mut("Sections")?;
        for section in sections.into_iter().filter(ChunkSection::is_dirty) {
            let index = section.list_index;
            let compound = list[index].extract_compound_mut().ok_or_else(|| {
                ChunkParsingError::ErrorDeserializingChunk(format!(
                    "section {index} is not a compound"
                ))
            })?;
            section.write_to(compound)?;
        }
        if let Some(tile_entities) = tile_entities {
            level.insert("TileEntities", tile_entities);
        }

        stats.is_empty = !any_solid;
        Ok(stats)
    }
}

/// Removes the first tile entity at the given chunk relative column and
/// absolute height. The chunk's list is copied on the first removal.
fn remove_tile_entity(
    level: &NbtCompound,
    tile_entities: &mut Option<NbtList>,
    x: i32,
    y: i32,
    z: i32,
) -> Result<bool, ChunkParsingError> {
    let at_cell = |entity: &NbtCompound| {
        match (entity.get_int("x"), entity.get_int("y"), entity.get_int("z")) {
            (Some(tx), Some(ty), Some(tz)) => tx & 15 == x && ty == y && tz & 15 == z,
            _ => false,
        }
    };

    let current = match tile_entities.as_ref() {
        Some(list) => list,
        None => level.try_get_list("TileEntities")?,
    };
    let Some(found) = current
        .iter()
        .position(|tag| tag.extract_compound().is_some_and(at_cell))
    else {
        return Ok(false);
    };

    if tile_entities.is_none() {
        *tile_entities = Some(level.try_get_list("TileEntities")?.clone());
    }
    if let Some(list) = tile_entities {
        list.remove(found);
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::biome::find_biome_id;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use worldmapper_config::{RemapRule, RuleTarget};
    use worldmapper_nbt::{COMPOUND_ID, tag::NbtTag};

    const PLAINS: u8 = 1;

    fn section(y: i8, cells: &[(usize, BlockKey)]) -> NbtCompound {
        let mut blocks = vec![0u8; SUBCHUNK_VOLUME];
        let mut data = vec![0u8; SUBCHUNK_VOLUME / 2];
        for &(index, key) in cells {
            blocks[index] = key.id() as u8;
            let shift = if index & 1 == 0 { 0 } else { 4 };
            data[index >> 1] |= key.meta() << shift;
        }
        let mut section = NbtCompound::new();
        section.put_byte("Y", y);
        section.put("Blocks", blocks);
        section.put("Data", data);
        section
    }

    fn tile_entity(x: i32, y: i32, z: i32, id: &str) -> NbtTag {
        let mut entity = NbtCompound::new();
        entity.put("id", id);
        entity.put_int("x", x);
        entity.put_int("y", y);
        entity.put_int("z", z);
        NbtTag::Compound(entity)
    }

    fn chunk(sections: Vec<NbtCompound>, tile_entities: Vec<NbtTag>) -> NbtCompound {
        let mut level = NbtCompound::new();
        level.put_int("xPos", 2);
        level.put_int("zPos", -1);
        level.put("Biomes", vec![PLAINS; CHUNK_AREA]);
        let sections: Vec<_> = sections.into_iter().map(NbtTag::Compound).collect();
        level.put(
            "Sections",
            if sections.is_empty() {
                NbtList::empty(COMPOUND_ID)
            } else {
                NbtList::from(sections)
            },
        );
        level.put(
            "TileEntities",
            if tile_entities.is_empty() {
                NbtList::empty(COMPOUND_ID)
            } else {
                NbtList::from(tile_entities)
            },
        );
        let mut root = NbtCompound::new();
        root.put_component("Level", level);
        root
    }

    fn cell(x: usize, y: usize, z: usize) -> usize {
        (y << 8) | (z << 4) | x
    }

    fn block_at(root: &NbtCompound, list_index: usize, index: usize) -> BlockKey {
        let level = root.get_compound("Level").unwrap();
        let sections = level.get_list("Sections").unwrap();
        let section = sections[list_index].extract_compound().unwrap();
        ChunkSection::from_nbt(section, list_index).unwrap().block(index)
    }

    fn rule(source: (u16, u8), target: RuleTarget) -> RemapRule {
        RemapRule {
            source_id: source.0,
            source_meta: Some(source.1),
            target,
            biomes: Vec::new(),
            drop_tile_entity: false,
            drop_if_unsupported: false,
        }
    }

    fn run(table: &BlockRemapTable, root: &mut NbtCompound) -> TransformStats {
        let mut rng = StdRng::seed_from_u64(1);
        ChunkTransformer::new(table, &mut rng).transform(root).unwrap()
    }

    #[test]
    fn test_single_cell_remap() {
        let table =
            BlockRemapTable::from_rules(&[rule((8, 0), RuleTarget::Block { id: 9, meta: 0 })])
                .unwrap();
        let water = cell(4, 2, 9);
        let mut root = chunk(
            vec![section(0, &[(water, BlockKey::new(8, 0)), (0, BlockKey::new(1, 0))])],
            vec![],
        );

        let stats = run(&table, &mut root);
        assert_eq!(stats.blocks_mapped, 1);
        assert!(stats.is_modified());
        assert!(!stats.is_empty);
        assert_eq!(block_at(&root, 0, water), BlockKey::new(9, 0));
        assert_eq!(block_at(&root, 0, 0), BlockKey::new(1, 0));
    }

    #[test]
    fn test_identity_leaves_tree_untouched() {
        let table = BlockRemapTable::identity();
        let mut root = chunk(
            vec![section(3, &[(17, BlockKey::new(2, 0)), (18, BlockKey::new(3, 1))])],
            vec![tile_entity(35, 50, -9, "Chest")],
        );
        let before = root.clone();

        let stats = run(&table, &mut root);
        assert_eq!(stats.blocks_mapped, 0);
        assert_eq!(stats.tile_entities_scrubbed, 0);
        assert!(!stats.is_empty);
        assert_eq!(root, before);
    }

    #[test]
    fn test_all_air_is_empty() {
        let table = BlockRemapTable::identity();
        let mut root = chunk(vec![section(0, &[]), section(1, &[])], vec![]);
        assert!(run(&table, &mut root).is_empty);

        let mut root = chunk(vec![], vec![]);
        assert!(run(&table, &mut root).is_empty);
    }

    #[test]
    fn test_mapping_to_air_empties_chunk() {
        let table =
            BlockRemapTable::from_rules(&[rule((1, 0), RuleTarget::Block { id: 0, meta: 0 })])
                .unwrap();
        let mut root = chunk(
            vec![section(0, &[(5, BlockKey::new(1, 0)), (300, BlockKey::new(1, 0))])],
            vec![],
        );
        let stats = run(&table, &mut root);
        assert_eq!(stats.blocks_mapped, 2);
        assert!(stats.is_empty);
    }

    #[test]
    fn test_unsupported_blocks_cascade() {
        let mut sapling = rule((6, 0), RuleTarget::PreserveMeta { id: 6 });
        sapling.drop_if_unsupported = true;
        let table = BlockRemapTable::from_rules(&[sapling]).unwrap();

        let planted = [
            (cell(1, 0, 1), BlockKey::new(1, 0)),
            (cell(1, 1, 1), BlockKey::new(6, 0)),
        ];
        let floating = [
            (cell(5, 3, 5), BlockKey::new(6, 0)),
            (cell(5, 4, 5), BlockKey::new(6, 0)),
        ];
        let mut cells = planted.to_vec();
        cells.extend_from_slice(&floating);
        let mut root = chunk(vec![section(2, &[]), section(1, &cells)], vec![]);

        let stats = run(&table, &mut root);
        assert_eq!(stats.blocks_mapped, 2);
        assert_eq!(block_at(&root, 1, cell(1, 1, 1)), BlockKey::new(6, 0));
        assert_eq!(block_at(&root, 1, cell(5, 3, 5)), BlockKey::AIR);
        assert_eq!(block_at(&root, 1, cell(5, 4, 5)), BlockKey::AIR);
    }

    #[test]
    fn test_support_across_sections() {
        let mut torch = rule((50, 5), RuleTarget::PreserveMeta { id: 50 });
        torch.drop_if_unsupported = true;
        let table = BlockRemapTable::from_rules(&[torch]).unwrap();
        let torch_cell = cell(7, 0, 7);

        // Top layer of the section below holds stone
        let mut root = chunk(
            vec![
                section(1, &[(torch_cell, BlockKey::new(50, 5))]),
                section(0, &[(cell(7, 15, 7), BlockKey::new(1, 0))]),
            ],
            vec![],
        );
        assert_eq!(run(&table, &mut root).blocks_mapped, 0);
        assert_eq!(block_at(&root, 0, torch_cell), BlockKey::new(50, 5));

        // A missing section below counts as air
        let mut root = chunk(vec![section(1, &[(torch_cell, BlockKey::new(50, 5))])], vec![]);
        let stats = run(&table, &mut root);
        assert_eq!(stats.blocks_mapped, 1);
        assert!(stats.is_empty);
        assert_eq!(block_at(&root, 0, torch_cell), BlockKey::AIR);
    }

    #[test]
    fn test_tile_entity_scrub() {
        let mut chest = rule((54, 2), RuleTarget::Block { id: 1, meta: 0 });
        chest.drop_tile_entity = true;
        let table = BlockRemapTable::from_rules(&[chest]).unwrap();

        // Section 1 covers y 16..31, chunk (2, -1)
        let chest_cell = cell(3, 5, 7);
        let mut root = chunk(
            vec![section(1, &[(chest_cell, BlockKey::new(54, 2))])],
            vec![
                tile_entity(35, 5, -9, "Sign"),
                tile_entity(35, 21, -9, "Chest"),
                tile_entity(35, 21, -9, "Chest"),
            ],
        );

        let stats = run(&table, &mut root);
        assert_eq!(stats.blocks_mapped, 1);
        assert_eq!(stats.tile_entities_scrubbed, 1);

        let level = root.get_compound("Level").unwrap();
        let remaining: Vec<_> = level
            .get_list("TileEntities")
            .unwrap()
            .compounds()
            .map(|entity| (entity.get_string("id").unwrap().clone(), entity.get_int("y").unwrap()))
            .collect();
        assert_eq!(
            remaining,
            vec![("Sign".to_string(), 5), ("Chest".to_string(), 21)]
        );
    }

    #[test]
    fn test_tile_entity_kept_without_flag() {
        let table =
            BlockRemapTable::from_rules(&[rule((54, 0), RuleTarget::Block { id: 1, meta: 0 })])
                .unwrap();
        let mut root = chunk(
            vec![section(0, &[(cell(0, 0, 0), BlockKey::new(54, 0))])],
            vec![tile_entity(32, 0, -16, "Chest")],
        );
        let stats = run(&table, &mut root);
        assert_eq!(stats.tile_entities_scrubbed, 0);
        let level = root.get_compound("Level").unwrap();
        assert_eq!(level.get_list("TileEntities").unwrap().len(), 1);
    }

    #[test]
    fn test_high_ids_use_add_array() {
        let table =
            BlockRemapTable::from_rules(&[rule((1, 0), RuleTarget::Block { id: 300, meta: 2 })])
                .unwrap();
        let mut root = chunk(vec![section(0, &[(9, BlockKey::new(1, 0))])], vec![]);

        run(&table, &mut root);
        assert_eq!(block_at(&root, 0, 9), BlockKey::new(300, 2));
        let level = root.get_compound("Level").unwrap();
        let section = level.get_list("Sections").unwrap()[0]
            .extract_compound()
            .unwrap();
        assert_eq!(section.get_byte_array("Add").unwrap()[4], 0x10);
    }

    #[test]
    fn test_biome_column_selects_override() {
        let mut jungle = rule((2, 0), RuleTarget::Block { id: 3, meta: 0 });
        jungle.biomes = vec!["Jungle".to_string()];
        let table = BlockRemapTable::from_rules(&[
            rule((2, 0), RuleTarget::Block { id: 12, meta: 0 }),
            jungle,
        ])
        .unwrap();

        let mut root = chunk(
            vec![section(
                4,
                &[
                    (cell(0, 0, 0), BlockKey::new(2, 0)),
                    (cell(1, 0, 0), BlockKey::new(2, 0)),
                ],
            )],
            vec![],
        );
        let level = root.try_get_compound_mut("Level").unwrap();
        level.try_get_byte_array_mut("Biomes").unwrap()[1] = find_biome_id("jungle").unwrap();

        run(&table, &mut root);
        assert_eq!(block_at(&root, 0, cell(0, 0, 0)), BlockKey::new(12, 0));
        assert_eq!(block_at(&root, 0, cell(1, 0, 0)), BlockKey::new(3, 0));
    }

    #[test]
    fn test_missing_biomes_is_error() {
        let table = BlockRemapTable::identity();
        let mut root = chunk(vec![section(0, &[])], vec![]);
        root.try_get_compound_mut("Level").unwrap().remove("Biomes");
        let mut rng = StdRng::seed_from_u64(0);
        assert!(matches!(
            ChunkTransformer::new(&table, &mut rng).transform(&mut root),
            Err(ChunkParsingError::Nbt(_))
        ));
    }
}
