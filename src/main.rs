mod config;
mod constants;
mod core_cli;
mod core_ftpcommand;
mod core_network;
mod core_transfer;
mod core_vfs;
mod core_watchdog;
mod helpers;
mod server;
mod session;

use anyhow::Result;
use clap::Parser;
use env_logger::{Builder, Env};
use std::io::Write;

use crate::core_cli::Cli;
use crate::helpers::{load_config, log_config};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let args = Cli::parse();

    // Initialize the logger with a custom format
    let default_level = if args.verbose { "debug" } else { "info" };
    Builder::from_env(Env::default().default_filter_or(default_level))
        .format(|buf, record| {
            let timestamp = buf.timestamp();
            writeln!(
                buf,
                "[{}] [{}] {}",
                timestamp,
                record.level(),
                record.args()
            )
        })
        .init();

    let default_config_path = "/etc/grilleftpd.conf";
    let config_path = if args.config.is_empty() {
        default_config_path
    } else {
        args.config.as_str()
    };
    let mut config = load_config(config_path)?;

    // Override the listen port from the CLI if provided
    if let Some(port) = args.port {
        config.server.listen_port = port;
    }
    log_config(&config);

    server::run(config).await?;

    Ok(())
}
