mod app;
mod auth;
mod cache;
mod cmms;
mod commands;
mod config;
mod event;
mod logging;
mod optimistic;
mod query;
mod ui;

use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "m9s")]
#[command(about = "A terminal UI for maintenance management, inspired by k9s")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/m9s/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Maintenance API base URL, overriding the config file
  #[arg(short, long)]
  base_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  let _log_guard = logging::init()?;

  let explicit_path = args.config.is_some();
  let config = config::Config::resolve(
    config::Config::load(args.config.as_deref()),
    args.base_url,
    explicit_path,
  )?;

  info!(base_url = %config.api.base_url, "starting m9s");

  // Initialize and run the app
  let mut app = app::App::new(config)?;
  app.run().await?;

  Ok(())
}
