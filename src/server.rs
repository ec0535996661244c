use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use log::{error, info};

use crate::config::Config;
use crate::core_network::network;
use crate::core_vfs::registry::BackendRegistry;
use crate::core_watchdog::{self, SessionRegistry};

/// Runs the FTP server: wires the backend registry and the idle reaper,
/// then enters the accept loop.
pub async fn run(config: Config) -> Result<()> {
    let config = Arc::new(config);
    let backends = Arc::new(BackendRegistry::new());
    let sessions = SessionRegistry::new();

    let idle_timeout = Duration::from_secs(config.server.idle_timeout_secs);
    core_watchdog::spawn_reaper(Arc::clone(&sessions), idle_timeout);

    info!("starting grilleftpd");
    match network::start_server(config, backends, sessions).await {
        Ok(()) => Ok(()),
        Err(e) => {
            error!("server failed: {}", e);
            Err(e)
        }
    }
}
