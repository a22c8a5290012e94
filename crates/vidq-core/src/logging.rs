//! Logging init: append-only log file in the engine's state directory,
//! next to the job store, with a stderr variant for when that directory is
//! unusable.

use anyhow::{Context, Result};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

use crate::store;

const LOG_FILE: &str = "vidq.log";
/// Applied when the environment sets no `RUST_LOG`.
const DEFAULT_FILTER: &str = "info,vidq=debug";

/// Routes tracing output to `<state dir>/vidq.log`. Returns the log path so
/// the CLI can point users at it.
pub fn init_logging() -> Result<PathBuf> {
    let (path, file) = open_log_file(&store::state_dir()?)?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    tracing::info!("logging to {}", path.display());
    Ok(path)
}

/// Stderr-only fallback for when the state directory cannot be written.
pub fn init_logging_stderr() {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Opens the log for appending, creating it on first run.
fn open_log_file(dir: &Path) -> Result<(PathBuf, File)> {
    let path = dir.join(LOG_FILE);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("open log file {}", path.display()))?;
    Ok((path, file))
}
