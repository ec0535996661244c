use clap::Parser;

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "grilleftpd", about = "A grid FTP server written in Rust.")]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "")]
    pub config: String,

    /// Listen port override
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Enable verbose mode
    #[arg(short, long)]
    pub verbose: bool,
}
