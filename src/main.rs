use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use goat_clicker::config::Config;
use goat_clicker::console::render_status;
use goat_clicker::daemon::ClickerDaemon;
use goat_clicker::types::now_ms;

#[derive(Parser, Debug)]
#[command(name = "goat-clicker", version, about = "Idle goat clicker daemon")]
struct Cli {
    /// Path to config.toml
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the data directory
    #[arg(long)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<CliCommand>,
}

#[derive(Subcommand, Debug)]
enum CliCommand {
    /// Run the game (default)
    Run,
    /// Print the saved state and exit
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = Config::resolve_path(cli.config.as_deref(), cli.data_dir.as_deref());
    let first_run = !config_path.exists();
    let config = Config::load_or_init(&config_path, cli.data_dir.as_deref())?;

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log.filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if first_run {
        info!("🆕 First run - wrote default configuration to {:?}", config_path);
    }

    println!("\n╔════════════════════════════════════════════════════════╗");
    println!("║                  GOAT CLICKER v1.0.0                  ║");
    println!("╚════════════════════════════════════════════════════════╝\n");

    info!("📝 Configuration: {:?}", config_path);
    info!("  Data dir: {:?}", config.data_dir);
    info!("  Offline cap: {}s", config.offline.cap_secs);

    let daemon = ClickerDaemon::new(config)?;

    match cli.command.unwrap_or(CliCommand::Run) {
        CliCommand::Status => {
            let state = daemon.engine().store().snapshot();
            println!("{}", render_status(&state, now_ms()));
        }
        CliCommand::Run => {
            info!("\n🚀 All systems ready - Starting game loops...\n");
            daemon.run().await?;
        }
    }

    Ok(())
}
