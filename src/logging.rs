//! File logging. The terminal belongs to the UI, so nothing is written to
//! stdout or stderr while the app runs.

use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Environment variable holding an `EnvFilter` directive, e.g. `m9s=debug`
const LOG_ENV: &str = "M9S_LOG";
const DEFAULT_DIRECTIVE: &str = "m9s=info";

/// `$XDG_DATA_HOME/m9s/logs`, falling back to the working directory.
pub fn log_dir() -> PathBuf {
  dirs::data_dir()
    .unwrap_or_else(|| PathBuf::from("."))
    .join("m9s")
    .join("logs")
}

/// Install the global subscriber writing to a daily rotated file.
///
/// The returned guard flushes buffered lines when dropped; keep it alive for
/// the whole run.
pub fn init() -> Result<WorkerGuard> {
  let dir = log_dir();
  std::fs::create_dir_all(&dir)
    .map_err(|e| eyre!("Failed to create log directory {}: {}", dir.display(), e))?;

  let (writer, guard) = tracing_appender::non_blocking(rolling::daily(&dir, "m9s.log"));

  let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE));

  tracing_subscriber::registry()
    .with(filter)
    .with(fmt::layer().with_writer(writer).with_ansi(false))
    .try_init()
    .map_err(|e| eyre!("Failed to install logger: {}", e))?;

  Ok(guard)
}
