use serde::{Deserialize, Serialize};

use crate::ConfigError;

#[derive(Deserialize, Serialize)]
#[serde(default)]
pub struct ChunkConfig {
    /// Deflate level used when re-encoding chunks (0-9).
    pub compression_level: u32,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            compression_level: 6,
        }
    }
}

impl ChunkConfig {
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.compression_level > 9 {
            return Err(ConfigError::InvalidCompressionLevel(self.compression_level));
        }
        Ok(())
    }
}
