//! Tracing setup
//!
//! The TUI owns the terminal, so while it runs logs go to
//! `<data dir>/orgpulse/orgpulse.log`. Headless commands log to stderr.
//! `ORGPULSE_LOG` takes an `EnvFilter` directive and overrides `--log-level`.

use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

pub const ENV_LOG: &str = "ORGPULSE_LOG";
const LOG_FILE: &str = "orgpulse.log";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTarget {
    Stderr,
    File,
    /// Logging disabled (TUI with `log_to_file = false`)
    Off,
}

pub fn log_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("orgpulse").join(LOG_FILE))
}

fn filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_env(ENV_LOG)
        .unwrap_or_else(|_| EnvFilter::new(format!("orgpulse={}", default_level)))
}

/// Install the global subscriber. Returns the log file path when logging
/// to a file.
pub fn init(target: LogTarget, default_level: &str) -> Result<Option<PathBuf>> {
    match target {
        LogTarget::Off => Ok(None),
        LogTarget::Stderr => {
            tracing_subscriber::registry()
                .with(filter(default_level))
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .try_init()
                .context("Failed to initialize logging")?;
            Ok(None)
        }
        LogTarget::File => {
            let path = log_path().context("Could not determine data directory for logs")?;
            if let Some(dir) = path.parent() {
                std::fs::create_dir_all(dir)
                    .with_context(|| format!("Failed to create {}", dir.display()))?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            tracing_subscriber::registry()
                .with(filter(default_level))
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(Mutex::new(file)),
                )
                .try_init()
                .context("Failed to initialize logging")?;
            Ok(Some(path))
        }
    }
}
