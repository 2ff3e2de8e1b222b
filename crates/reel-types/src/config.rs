use std::{fs, path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{ReelError, Result};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// JSON file holding an array of movies loaded at startup.
    pub seed_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Minimum spacing between two deliveries on one event stream.
    pub pace_ms: u64,
    /// Capacity of the channel between a generator task and its consumer.
    /// Above one, the generator may run ahead of a slow reader; deliveries
    /// stay one pace apart regardless.
    pub buffer: usize,
}

impl StreamConfig {
    pub fn pace(&self) -> Duration {
        Duration::from_millis(self.pace_ms)
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            pace_ms: 1_000,
            buffer: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpsConfig {
    pub log_level: String,
}

impl Default for OpsConfig {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReelConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub stream: StreamConfig,
    #[serde(default)]
    pub ops: OpsConfig,
}

impl ReelConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref).map_err(|err| {
            ReelError::Configuration(format!(
                "unable to read config file {}: {err}",
                path_ref.display()
            ))
        })?;
        toml::from_str(&contents).map_err(|err| {
            ReelError::Configuration(format!(
                "failed to parse config file {}: {err}",
                path_ref.display()
            ))
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.stream.pace_ms == 0 {
            return Err(ReelError::Configuration(
                "stream.pace_ms must be greater than zero".into(),
            ));
        }
        if self.stream.buffer == 0 {
            return Err(ReelError::Configuration(
                "stream.buffer must be greater than zero".into(),
            ));
        }
        if self.ops.log_level.trim().is_empty() {
            return Err(ReelError::Configuration(
                "ops.log_level must not be empty".into(),
            ));
        }
        if let Some(seed) = &self.storage.seed_path {
            if seed.trim().is_empty() {
                return Err(ReelError::Configuration(
                    "storage.seed_path must not be blank when set".into(),
                ));
            }
        }
        Ok(())
    }
}
