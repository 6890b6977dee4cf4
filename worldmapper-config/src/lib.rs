use log::warn;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use thiserror::Error;

use std::{
    fs, io,
    path::{Path, PathBuf},
};

pub mod chunk;
pub mod logging;
pub mod mapping;

pub use chunk::ChunkConfig;
pub use logging::LoggingConfig;
pub use mapping::{BlockMapping, MappingConfig, RemapRule, RuleTarget};

const CONFIG_ROOT_FOLDER: &str = "config/";

/// Everything that can go wrong before the first world file is touched.
/// Any of these aborts the whole run.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Couldn't read {path:?}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("Mapping file syntax error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Couldn't parse config at {path:?}. Reason: {message}")]
    Toml { path: PathBuf, message: String },
    #[error("'blocks' array not found.")]
    MissingBlocks,
    #[error("Mapping #{index} is missing required field '{field}'")]
    MissingField { index: usize, field: &'static str },
    #[error("Mapping #{index}: block id {id} is outside 0..4095")]
    InvalidBlockId { index: usize, id: i32 },
    #[error("Mapping #{index}: meta {meta} is outside 0..15")]
    InvalidMeta { index: usize, meta: i32 },
    #[error("Mapping #{index}: 'newRandomIDMeta' must be a non-empty list of id/meta pairs")]
    InvalidRandomList { index: usize },
    #[error("Invalid biome name: {0}")]
    UnknownBiome(String),
    #[error("Invalid log level '{0}'")]
    InvalidLogLevel(String),
    #[error("Compression level must be between 0 and 9, got {0}")]
    InvalidCompressionLevel(u32),
}

/// Tool-wide settings, stored as TOML next to the working directory.
/// Defaults are written out the first time the tool runs.
#[derive(Deserialize, Serialize, Default)]
#[serde(default)]
pub struct MapperConfiguration {
    pub logging: LoggingConfig,
    pub chunk: ChunkConfig,
}

pub trait LoadConfiguration {
    fn load(exec_dir: &Path) -> Result<Self, ConfigError>
    where
        Self: Sized + Default + Serialize + DeserializeOwned,
    {
        let config_dir = exec_dir.join(CONFIG_ROOT_FOLDER);
        let path = config_dir.join(Self::get_path());

        let config = if path.exists() {
            let file_content = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
                path: path.clone(),
                source,
            })?;

            toml::from_str(&file_content).map_err(|err| ConfigError::Toml {
                path: path.clone(),
                message: err.message().to_string(),
            })?
        } else {
            let content = Self::default();

            if !config_dir.exists() {
                log::debug!("creating new config root folder");
                if let Err(err) = fs::create_dir_all(&config_dir) {
                    warn!("Couldn't create config folder {:?}. Reason: {}", &config_dir, err);
                }
            }
            match toml::to_string(&content) {
                Ok(text) => {
                    if let Err(err) = fs::write(&path, text) {
                        warn!("Couldn't write default config to {:?}. Reason: {}", &path, err);
                    }
                }
                Err(err) => warn!("Couldn't serialize default config. Reason: {}", err),
            }

            content
        };

        config.validate()?;
        Ok(config)
    }

    fn get_path() -> &'static Path;

    fn validate(&self) -> Result<(), ConfigError>;
}

impl LoadConfiguration for MapperConfiguration {
    fn get_path() -> &'static Path {
        Path::new("worldmapper.toml")
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.logging.validate()?;
        self.chunk.validate()
    }
}
