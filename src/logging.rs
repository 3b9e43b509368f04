//! Tracing subscriber setup.
//!
//! The terminal belongs to the UI, so log output goes to a file:
//! `--log-file` when given, otherwise `$XDG_STATE_HOME/fx/fx.log`
//! (falling back to the cache directory on platforms without a state dir).

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::error::Result;

/// Default log file location, if the platform has a state or cache directory.
pub fn default_log_path() -> Option<PathBuf> {
    dirs::state_dir()
        .or_else(dirs::cache_dir)
        .map(|dir| dir.join("fx").join("fx.log"))
}

/// Build a subscriber writing to `log_file`, filtered by `RUST_LOG`
/// (default `info`).
pub fn build_subscriber(log_file: File) -> impl tracing::Subscriber + Send + Sync {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = fmt::layer()
        .with_ansi(false)
        .with_writer(Arc::new(log_file));

    tracing_subscriber::registry().with(env_filter).with(fmt_layer)
}

/// Install the global subscriber. Returns the file being written, or `None`
/// when no location could be determined.
pub fn init(log_file: Option<&Path>) -> Result<Option<PathBuf>> {
    let Some(path) = log_file.map(Path::to_path_buf).or_else(default_log_path) else {
        return Ok(None);
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = File::create(&path)?;
    build_subscriber(file).init();
    Ok(Some(path))
}
