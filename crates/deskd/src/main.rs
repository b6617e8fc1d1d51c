//! Desk Engine Daemon - bounded FIFO ticket queue with auto-escalation.
//!
//! Processes externally-submitted support tickets through a circular
//! FIFO queue, escalates priorities by wait time, and publishes atomic
//! snapshots for the web viewer. Ctrl+C triggers an orderly shutdown.

use anyhow::Result;
use clap::Parser;
use deskd::config::Config;
use deskd::engine::Engine;
use desk_common::EnginePaths;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "deskd", version, about = "Ticket queue engine daemon")]
struct Args {
    /// Config file path (default path is optional; this one is not)
    #[arg(long)]
    config: Option<String>,

    /// Data directory holding queue, archive, and snapshot files
    #[arg(long)]
    data_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    info!("deskd v{} starting", env!("CARGO_PKG_VERSION"));

    // An explicitly-named config that cannot be read is the one fatal
    // startup error; the default path falls back to defaults.
    let config = match &args.config {
        Some(path) => Config::load_required(path)?,
        None => Config::load(),
    };

    let paths = match &args.data_dir {
        Some(dir) => EnginePaths::with_root(dir),
        None => EnginePaths::new(),
    };
    info!("Data directory: {}", paths.root().display());

    let engine = Engine::new(config, paths)?;
    engine.run().await
}
