//! Server configuration file (TOML).

use std::path::Path;

use serde::Deserialize;

use straffic_parking::ParkingConfig;
use straffic_transit::TransitConfig;

/// Top-level `strafficd` configuration.
///
/// Only `[storage]` is required; every other section has defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub storage: StorageConfig,
    #[serde(default)]
    pub parking: ParkingConfig,
    #[serde(default)]
    pub transit: TransitConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Directory holding `straffic.sqlite`.
    pub data_dir: String,
}

impl ServerConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read {}: {}", path.display(), e))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }
}
