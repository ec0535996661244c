use anyhow::{Context, Result};
use log::info;
use std::fs;

use crate::config::Config;

/// Loads and parses the TOML configuration file.
pub fn load_config(path: &str) -> Result<Config> {
    let config_str = fs::read_to_string(path)
        .with_context(|| format!("Failed to read configuration file: {}", path))?;
    let config = toml::from_str(&config_str)
        .with_context(|| format!("Failed to parse configuration file: {}", path))?;
    Ok(config)
}

/// Logs the effective configuration at startup.
pub fn log_config(config: &Config) {
    info!(
        "listen port {}, idle timeout {}s, parallelism ceiling {}",
        config.server.listen_port,
        config.server.idle_timeout_secs,
        config.server.parallelism_ceiling
    );
    for mount in &config.mounts {
        info!("mount {} -> {} ({})", mount.prefix, mount.root, mount.backend);
    }
}
