use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

pub const FILTER_ENV: &str = "FEXP_LOG";
const DEFAULT_FILTER: &str = "fexp=info";

/// `<cache dir>/fexp/fexp.log`.
pub fn default_log_path() -> Option<PathBuf> {
  dirs::cache_dir().map(|d| d.join("fexp").join("fexp.log"))
}

/// Filter from `FEXP_LOG`, falling back to `fexp=info`.
pub fn filter() -> EnvFilter {
  EnvFilter::try_from_env(FILTER_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Sends tracing output to `path`. The terminal belongs to the UI, so
/// nothing is written to stdout or stderr. Without a path, logs are dropped.
pub fn init(path: Option<&Path>) -> Result<()> {
  let Some(path) = path else {
    let _ = tracing_subscriber::fmt().with_env_filter(filter()).with_writer(std::io::sink).try_init();
    return Ok(());
  };

  if let Some(parent) = path.parent() {
    std::fs::create_dir_all(parent).with_context(|| format!("failed to create {}", parent.display()))?;
  }
  let file = OpenOptions::new()
    .create(true)
    .append(true)
    .open(path)
    .with_context(|| format!("failed to open log file {}", path.display()))?;

  let _ = tracing_subscriber::fmt()
    .with_env_filter(filter())
    .with_ansi(false)
    .with_target(false)
    .with_writer(Mutex::new(file))
    .try_init();
  Ok(())
}
