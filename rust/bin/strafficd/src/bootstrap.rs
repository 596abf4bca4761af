//! Startup checks run before any store is opened.

use crate::config::ServerConfig;

/// Refuse to start on a configuration the services cannot run with.
pub fn verify_config(config: &ServerConfig) -> anyhow::Result<()> {
    if config.storage.data_dir.trim().is_empty() {
        anyhow::bail!("Storage data_dir is empty in configuration.");
    }
    config
        .parking
        .validate()
        .map_err(|e| anyhow::anyhow!("invalid parking configuration: {}", e))?;
    if config.transit.timeout_secs == 0 {
        anyhow::bail!("transit.timeout_secs must be at least 1.");
    }
    Ok(())
}
