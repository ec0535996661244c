use serde::Deserialize;
use std::collections::HashMap;

use crate::constants::{
    DEFAULT_BUFFER_SIZE, DEFAULT_DATA_GRACE_SECS, DEFAULT_IDLE_TIMEOUT_SECS,
    DEFAULT_MAX_AGGREGATE, PARALLELISM_CEILING,
};

/// Fully parsed server configuration, handed to session setup as-is.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub mounts: Vec<MountConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub listen_port: u16,
    /// Egress ("firewall") address advertised in PASV/SPAS responses in
    /// place of the locally bound address.
    pub pasv_address: Option<String>,
    #[serde(default = "default_banner")]
    pub banner: String,
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
    #[serde(default = "default_data_grace")]
    pub data_grace_secs: u64,
    #[serde(default = "default_parallelism_ceiling")]
    pub parallelism_ceiling: u32,
    #[serde(default = "default_buffer_size")]
    pub default_buffer_size: usize,
    #[serde(default = "default_max_aggregate")]
    pub max_aggregate_buffer: usize,
}

/// One virtual-prefix -> backend binding from the mount list.
#[derive(Debug, Clone, Deserialize)]
pub struct MountConfig {
    /// Virtual path prefix, e.g. "/" or "/jobs".
    pub prefix: String,
    /// Backend kind resolved through the registry, e.g. "localfs".
    pub backend: String,
    /// Backend root (physical path for localfs).
    pub root: String,
    #[serde(default)]
    pub options: HashMap<String, String>,
}

fn default_banner() -> String {
    "grilleftpd server ready.".to_string()
}

fn default_idle_timeout() -> u64 {
    DEFAULT_IDLE_TIMEOUT_SECS
}

fn default_data_grace() -> u64 {
    DEFAULT_DATA_GRACE_SECS
}

fn default_parallelism_ceiling() -> u32 {
    PARALLELISM_CEILING
}

fn default_buffer_size() -> usize {
    DEFAULT_BUFFER_SIZE
}

fn default_max_aggregate() -> usize {
    DEFAULT_MAX_AGGREGATE
}
