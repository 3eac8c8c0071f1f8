//! # Logging Module
//!
//! Sets up the `tracing` subscriber shared by both bridges.
//!
//! Console output always goes to stdout. When a log directory is configured,
//! a second copy is written to a daily rolling file through a non-blocking
//! writer. `RUST_LOG` overrides the configured level.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingConfig;
use crate::error::{BridgeError, Result};

/// Build the level filter: `RUST_LOG` if set, else `verbose`, else the config.
fn build_filter(config: &LoggingConfig, verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = if verbose { "debug" } else { config.level.as_str() };
        EnvFilter::new(level)
    })
}

/// Install the global subscriber.
///
/// The returned guard must be held for the life of the process when file
/// logging is enabled; dropping it flushes and stops the file writer.
///
/// # Errors
///
/// Returns `Io` if a global subscriber is already installed.
pub fn init_logging(
    config: &LoggingConfig,
    file_prefix: &str,
    verbose: bool,
) -> Result<Option<WorkerGuard>> {
    let (file_layer, guard) = match &config.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, format!("{}.log", file_prefix));
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(build_filter(config, verbose))
        .with(fmt::layer())
        .with(file_layer)
        .try_init()
        .map_err(|e| {
            BridgeError::Io(std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                format!("Failed to install logger: {}", e),
            ))
        })?;

    Ok(guard)
}
