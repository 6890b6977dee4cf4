use std::str::FromStr;

use log::LevelFilter;
use serde::{Deserialize, Serialize};

use crate::ConfigError;

#[derive(Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub enabled: bool,
    /// One of `off`, `error`, `warn`, `info`, `debug`, `trace`.
    pub level: String,
    pub threads: bool,
    pub color: bool,
    pub timestamp: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: "info".to_string(),
            threads: false,
            color: true,
            timestamp: true,
        }
    }
}

impl LoggingConfig {
    pub fn level_filter(&self) -> LevelFilter {
        if !self.enabled {
            return LevelFilter::Off;
        }
        LevelFilter::from_str(&self.level).unwrap_or(LevelFilter::Info)
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        LevelFilter::from_str(&self.level)
            .map(|_| ())
            .map_err(|_| ConfigError::InvalidLogLevel(self.level.clone()))
    }
}
