//! # Tessera
//!
//! Runs a headless frame-manager session from a command script and prints
//! the resulting layout as JSON.

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info};
use std::io::Read;
use std::path::PathBuf;

use tessera::{HeadlessSession, TesseraConfig};

#[derive(Parser)]
#[command(name = "tessera")]
#[command(about = "Binary-tree tiling frame manager driven by a command script")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "~/.config/tessera/tessera.toml")]
    config: String,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Command script to run (reads stdin when omitted)
    #[arg(short, long)]
    script: Option<PathBuf>,

    /// Override the screen width
    #[arg(long)]
    width: Option<u32>,

    /// Override the screen height
    #[arg(long)]
    height: Option<u32>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration before logging so general.debug can take effect
    let loaded = TesseraConfig::load(&cli.config);
    let debug = cli.debug || loaded.as_ref().is_ok_and(|c| c.general.debug);

    // Initialize logging
    let level = if debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    info!("🚀 Starting Tessera");
    info!("📄 Version: {}", tessera::VERSION);

    let mut config = match loaded {
        Ok(config) => {
            info!("✅ Configuration loaded from: {}", cli.config);
            config
        }
        Err(e) => {
            error!("❌ Failed to load configuration: {:#}", e);
            info!("📝 Using default configuration");
            TesseraConfig::default()
        }
    };

    // Override config with CLI flags
    if let Some(width) = cli.width {
        config.screen.width = width;
    }
    if let Some(height) = cli.height {
        config.screen.height = height;
    }
    config.validate().context("Invalid screen override")?;
    info!(
        "🖥️ Screen {}x{}, decoration {}px",
        config.screen.width, config.screen.height, config.frames.decoration_thickness
    );

    let script = match &cli.script {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read script: {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read script from stdin")?;
            buf
        }
    };

    let mut session = HeadlessSession::start(&config);
    session.run_script(&script)?;
    let (report, stats) = session.finish().await?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    info!(
        "✅ {} commands executed, {} dropped, {} stale windows removed",
        stats.executed, stats.failed, stats.stale_removed
    );
    Ok(())
}
