use std::{io, path::PathBuf};

use thiserror::Error;
use worldmapper_config::ConfigError;
use worldmapper_world::chunk::{ChunkParsingError, ChunkReadingError, ChunkWritingError};

#[derive(Error, Debug)]
pub enum MapperError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("{0}")]
    InvalidArguments(String),
    #[error("Couldn't initialise logging: {0}")]
    Logger(#[from] log::SetLoggerError),
    #[error("{action} {path:?}: {source}")]
    Io {
        action: &'static str,
        path: PathBuf,
        source: io::Error,
    },
    #[error("Couldn't load region: {0}")]
    RegionLoad(ChunkReadingError),
    #[error("Couldn't read chunk {x},{z}: {source}")]
    ChunkRead {
        x: usize,
        z: usize,
        source: ChunkReadingError,
    },
    #[error("Couldn't write chunk {x},{z}: {source}")]
    ChunkWrite {
        x: usize,
        z: usize,
        source: ChunkWritingError,
    },
    #[error("Chunk {x},{z} is malformed: {source}")]
    ChunkParse {
        x: usize,
        z: usize,
        source: ChunkParsingError,
    },
}

impl MapperError {
    pub(crate) fn io(action: &'static str, path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io {
            action,
            path,
            source,
        }
    }

    /// Fatal errors abort the run before any world file is touched; everything
    /// else is confined to the file being processed.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Config(_) | Self::InvalidArguments(_) | Self::Logger(_)
        )
    }
}
