//! movcap CLI — record a display and audio to a QuickTime movie.
//!
//! Usage:
//!   movcap record [OPTIONS]    Record to ~/Movies/Capture-<timestamp>.mov
//!   movcap displays            List capturable displays
//!   movcap check               Check displays and capture permissions

use clap::{Parser, Subcommand};
use movcap_common::config::{config_file_path, AppConfig};

mod commands;

#[derive(Parser)]
#[command(
    name = "movcap",
    about = "Minimal macOS screen and audio recorder",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record the screen and audio
    Record(commands::record::RecordArgs),

    /// List available displays
    Displays,

    /// Check displays and capture permissions
    Check,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = config_file_path();
    let loaded = config_path
        .exists()
        .then(|| AppConfig::load_from(&config_path));
    let mut config = match loaded {
        Some(Ok(ref config)) => config.clone(),
        _ => AppConfig::default(),
    };

    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    if cli.json_logs {
        config.logging.json = true;
    }
    movcap_common::logging::init_logging(&config.logging);

    if let Some(Err(e)) = loaded {
        tracing::warn!("Ignoring config at {:?}: {}", config_path, e);
    }

    match cli.command {
        Commands::Record(args) => commands::record::run(args, config).await,
        Commands::Displays => commands::displays::run(),
        Commands::Check => commands::check::run(),
    }
}
