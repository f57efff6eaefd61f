//! File logging setup
//!
//! The library only emits `tracing` events. Applications that want them in
//! a file can call [`init`] once at startup and keep the returned guard.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Environment variable overriding the configured level with filter directives
pub const LOG_ENV: &str = "JAZZ_CLIENT_LOG";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    #[default]
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

/// Install a global subscriber writing to the log file.
///
/// Directives in `JAZZ_CLIENT_LOG` (e.g. `jazz_client::fetch=trace`)
/// take precedence over `level`. Returns `None` when logging is off, the
/// file cannot be opened or a subscriber is already installed.
pub fn init(level: LogLevel) -> Option<WorkerGuard> {
    let tracing_level = level.to_tracing_level()?;

    let log_path = log_path();

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file = match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        Ok(file) => file,
        Err(e) => {
            eprintln!("jazz-client: cannot open log file {:?}: {}", log_path, e);
            return None;
        }
    };

    let (non_blocking, guard) = tracing_appender::non_blocking(file);
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::default().add_directive(tracing_level.into()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .try_init()
        .ok()?;

    tracing::info!("jazz-client logging with level: {:?}", level);
    tracing::info!("Log file: {:?}", log_path);

    Some(guard)
}

/// Location of the log file
pub fn log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("jazz-client").join("jazz-client.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".jazz-client").join("jazz-client.log");
    }
    PathBuf::from("jazz-client.log")
}
