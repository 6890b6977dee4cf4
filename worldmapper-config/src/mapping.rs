//! The block mapping file.
//!
//! ```json
//! { "blocks": [
//!     { "blkid": 8, "meta": 0, "newblkid": 9, "newmeta": 0 },
//!     { "blkid": 54, "newblkid": 1, "tosstileentity": true },
//!     { "blkid": 2, "newRandomIDMeta": [1, 0, 3, 0], "biomes": ["Desert"] }
//! ] }
//! ```
use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Highest block id representable with the base byte plus the `Add` nibble.
pub const MAX_BLOCK_ID: u16 = 4095;
pub const MAX_META: u8 = 15;

#[derive(Deserialize, Serialize, Debug, Default)]
pub struct MappingConfig {
    pub blocks: Option<Vec<Option<BlockMapping>>>,
}

/// One rule as written in the mapping file. A negative `meta`/`newmeta` is
/// treated the same as leaving the field out.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct BlockMapping {
    #[serde(rename = "blkid")]
    pub block_id: Option<i32>,
    #[serde(default)]
    pub meta: Option<i32>,
    #[serde(rename = "newblkid", default)]
    pub new_block_id: Option<i32>,
    #[serde(rename = "newmeta", default)]
    pub new_meta: Option<i32>,
    #[serde(rename = "newRandomIDMeta", default)]
    pub new_random_id_meta: Option<Vec<i32>>,
    #[serde(default)]
    pub biomes: Option<Vec<String>>,
    #[serde(rename = "tosstileentity", default)]
    pub toss_tile_entity: bool,
    #[serde(rename = "dropifunsupported", alias = "dropIfUnsupported", default)]
    pub drop_if_unsupported: bool,
}

/// Where a rule sends its source blocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleTarget {
    /// Fixed destination id and meta.
    Block { id: u16, meta: u8 },
    /// Destination id, source meta preserved.
    PreserveMeta { id: u16 },
    /// One candidate picked per cell.
    Random(Vec<(u16, u8)>),
}

/// A validated [`BlockMapping`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemapRule {
    pub source_id: u16,
    /// `None` applies the rule to all 16 metas.
    pub source_meta: Option<u8>,
    pub target: RuleTarget,
    /// Empty for global rules.
    pub biomes: Vec<String>,
    pub drop_tile_entity: bool,
    pub drop_if_unsupported: bool,
}

impl MappingConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(content)?)
    }

    /// Validates every entry, skipping `null` ones.
    pub fn rules(&self) -> Result<Vec<RemapRule>, ConfigError> {
        let blocks = self.blocks.as_ref().ok_or(ConfigError::MissingBlocks)?;
        blocks
            .iter()
            .enumerate()
            .filter_map(|(index, mapping)| mapping.as_ref().map(|m| m.validate(index)))
            .collect()
    }
}

fn block_id(index: usize, id: i32) -> Result<u16, ConfigError> {
    if !(0..=i32::from(MAX_BLOCK_ID)).contains(&id) {
        return Err(ConfigError::InvalidBlockId { index, id });
    }
    Ok(id as u16)
}

fn meta(index: usize, meta: i32) -> Result<u8, ConfigError> {
    if !(0..=i32::from(MAX_META)).contains(&meta) {
        return Err(ConfigError::InvalidMeta { index, meta });
    }
    Ok(meta as u8)
}

impl BlockMapping {
    pub fn validate(&self, index: usize) -> Result<RemapRule, ConfigError> {
        let source_id = block_id(
            index,
            self.block_id.ok_or(ConfigError::MissingField {
                index,
                field: "blkid",
            })?,
        )?;
        let source_meta = match self.meta {
            Some(m) if m >= 0 => Some(meta(index, m)?),
            _ => None,
        };

        let target = if let Some(random) = &self.new_random_id_meta {
            if random.is_empty() || random.len() % 2 != 0 {
                return Err(ConfigError::InvalidRandomList { index });
            }
            let candidates = random
                .chunks_exact(2)
                .map(|pair| Ok((block_id(index, pair[0])?, meta(index, pair[1])?)))
                .collect::<Result<Vec<_>, ConfigError>>()?;
            RuleTarget::Random(candidates)
        } else {
            let id = block_id(
                index,
                self.new_block_id.ok_or(ConfigError::MissingField {
                    index,
                    field: "newblkid",
                })?,
            )?;
            match self.new_meta {
                Some(m) if m >= 0 => RuleTarget::Block {
                    id,
                    meta: meta(index, m)?,
                },
                _ => RuleTarget::PreserveMeta { id },
            }
        };

        Ok(RemapRule {
            source_id,
            source_meta,
            target,
            biomes: self.biomes.clone().unwrap_or_default(),
            drop_tile_entity: self.toss_tile_entity,
            drop_if_unsupported: self.drop_if_unsupported,
        })
    }
}
