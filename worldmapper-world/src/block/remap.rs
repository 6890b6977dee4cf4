use bitflags::bitflags;
use rand::Rng;
use worldmapper_config::{ConfigError, MappingConfig, RemapRule, RuleTarget};

use super::{BLOCK_KEY_COUNT, BlockKey};
use crate::biome::{BIOME_NAMES, find_biome_id};

const BIOME_COUNT: usize = 256;

bitflags! {
    /// Per source key behaviour, independent of which table holds the destination.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct RemapFlags: u8 {
        /// Remove the tile entity of a cell whose block gets replaced.
        const DROP_TILE_ENTITY = 1;
        /// Replace the cell with air when the cell below it is air.
        const DROP_IF_UNSUPPORTED = 1 << 1;
        /// At least one biome override table has an entry for this key.
        const BIOME_SPECIFIC = 1 << 2;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Destination {
    Block(BlockKey),
    /// Index into `BlockRemapTable::random_sets`.
    Random(u32),
}

fn identity_table() -> Box<[Destination]> {
    (0..BLOCK_KEY_COUNT)
        .map(|index| Destination::Block(BlockKey::from_index(index)))
        .collect()
}

/// Immutable `(id, meta, biome) -> (id, meta)` lookup, built once per run.
pub struct BlockRemapTable {
    global: Box<[Destination]>,
    biome_tables: Vec<Option<Box<[Destination]>>>,
    flags: Box<[RemapFlags]>,
    random_sets: Vec<Box<[BlockKey]>>,
}

impl Default for BlockRemapTable {
    fn default() -> Self {
        Self::identity()
    }
}

impl BlockRemapTable {
    /// Maps every key to itself.
    pub fn identity() -> Self {
        Self {
            global: identity_table(),
            biome_tables: vec![None; BIOME_COUNT],
            flags: vec![RemapFlags::empty(); BLOCK_KEY_COUNT].into_boxed_slice(),
            random_sets: Vec::new(),
        }
    }

    pub fn from_config(config: &MappingConfig) -> Result<Self, ConfigError> {
        Self::from_rules(&config.rules()?)
    }

    /// Applies the rules in order on top of the identity mapping; a later rule
    /// for the same key wins. Unknown biome names abort construction.
    pub fn from_rules(rules: &[RemapRule]) -> Result<Self, ConfigError> {
        let mut table = Self::identity();

        for rule in rules {
            let destinations = match &rule.target {
                RuleTarget::Random(candidates) => {
                    let set = candidates
                        .iter()
                        .map(|&(id, meta)| BlockKey::new(id, meta))
                        .collect();
                    table.random_sets.push(set);
                    Some(Destination::Random(table.random_sets.len() as u32 - 1))
                }
                _ => None,
            };

            if rule.biomes.is_empty() {
                apply_rule(rule, destinations, &mut table.global);
            } else {
                for name in &rule.biomes {
                    let biome = find_biome_id(name)
                        .ok_or_else(|| ConfigError::UnknownBiome(name.clone()))?;
                    let biome_table = table.biome_tables[biome as usize]
                        .get_or_insert_with(identity_table);
                    apply_rule(rule, destinations, biome_table);
                }
            }

            let mut flags = RemapFlags::empty();
            flags.set(RemapFlags::DROP_TILE_ENTITY, rule.drop_tile_entity);
            flags.set(RemapFlags::DROP_IF_UNSUPPORTED, rule.drop_if_unsupported);
            flags.set(RemapFlags::BIOME_SPECIFIC, !rule.biomes.is_empty());
            for key in source_keys(rule) {
                table.flags[key.index()] |= flags;
            }
        }

        table.log_mappings();
        Ok(table)
    }

    pub fn flags(&self, key: BlockKey) -> RemapFlags {
        self.flags[key.index()]
    }

    /// Resolves the destination of `key` in a column of the given biome.
    ///
    /// A biome override only applies when it differs from the identity for
    /// this key; otherwise the global destination is used. Random candidate
    /// sets draw a fresh candidate on every call.
    pub fn resolve<R: Rng>(&self, key: BlockKey, biome: u8, rng: &mut R) -> BlockKey {
        if key == BlockKey::AIR {
            return key;
        }

        let mut destination = self.global[key.index()];
        if self.flags(key).contains(RemapFlags::BIOME_SPECIFIC) {
            if let Some(biome_table) = &self.biome_tables[biome as usize] {
                let overridden = biome_table[key.index()];
                if overridden != Destination::Block(key) {
                    destination = overridden;
                }
            }
        }

        match destination {
            Destination::Block(target) => target,
            Destination::Random(set) => {
                let candidates = &self.random_sets[set as usize];
                candidates[rng.random_range(0..candidates.len())]
            }
        }
    }

    /// True when no rule changes anything.
    pub fn is_identity(&self) -> bool {
        self.random_sets.is_empty()
            && self.biome_tables.iter().all(Option::is_none)
            && self
                .global
                .iter()
                .enumerate()
                .all(|(index, dest)| *dest == Destination::Block(BlockKey::from_index(index)))
    }

    fn describe(&self, destination: Destination) -> String {
        match destination {
            Destination::Block(key) => key.to_string(),
            Destination::Random(set) => {
                let candidates: Vec<_> = self.random_sets[set as usize]
                    .iter()
                    .map(ToString::to_string)
                    .collect();
                format!("random [{}]", candidates.join(", "))
            }
        }
    }

    fn log_table(&self, prefix: &str, table: &[Destination]) {
        for (index, destination) in table.iter().enumerate() {
            let source = BlockKey::from_index(index);
            if *destination == Destination::Block(source) {
                continue;
            }
            let flags = self.flags(source);
            log::info!(
                "{prefix}Map {source} to {}{}{}",
                self.describe(*destination),
                if flags.contains(RemapFlags::DROP_TILE_ENTITY) {
                    ", discard tile entity"
                } else {
                    ""
                },
                if flags.contains(RemapFlags::DROP_IF_UNSUPPORTED) {
                    ", drop if unsupported"
                } else {
                    ""
                }
            );
        }
    }

    fn log_mappings(&self) {
        self.log_table("", &self.global);
        for (biome, table) in self.biome_tables.iter().enumerate() {
            if let Some(table) = table {
                let name = BIOME_NAMES.get(biome).copied().unwrap_or("unknown");
                self.log_table(&format!("[{name}] "), table);
            }
        }
        // Flag-only rules (identity destination) still change behaviour
        let pruned = self
            .flags
            .iter()
            .filter(|flags| flags.contains(RemapFlags::DROP_IF_UNSUPPORTED))
            .count();
        if pruned > 0 {
            log::debug!("{pruned} block keys are dropped when unsupported");
        }
    }
}

fn source_keys(rule: &RemapRule) -> impl Iterator<Item = BlockKey> + '_ {
    let metas = match rule.source_meta {
        Some(meta) => meta..=meta,
        None => 0..=15,
    };
    metas.map(|meta| BlockKey::new(rule.source_id, meta))
}

fn apply_rule(rule: &RemapRule, random: Option<Destination>, table: &mut [Destination]) {
    for source in source_keys(rule) {
        table[source.index()] = match (&rule.target, random) {
            (_, Some(random)) => random,
            (RuleTarget::Block { id, meta }, None) => Destination::Block(BlockKey::new(*id, *meta)),
            (RuleTarget::PreserveMeta { id }, None) => {
                Destination::Block(BlockKey::new(*id, source.meta()))
            }
            // Random targets always carry a destination
            (RuleTarget::Random(_), None) => Destination::Block(source),
        };
    }
}
