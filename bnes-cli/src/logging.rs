use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use bnes_core::config::LoggingConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Log to stderr and append to the configured log file.
///
/// The returned guard flushes the file writer when dropped, so keep it alive for the whole run.
pub(crate) fn init(config: &LoggingConfig) -> Result<WorkerGuard> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let (file_writer, guard) = tracing_appender::non_blocking(file_appender(config)?);

    let console_layer = fmt::layer().with_writer(io::stderr).with_target(false);

    let file_layer = fmt::layer()
        .with_writer(file_writer)
        .with_target(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .context("failed to install tracing subscriber")?;

    Ok(guard)
}

// Appends to `logging.file` itself; the file is never rotated.
fn file_appender(config: &LoggingConfig) -> Result<RollingFileAppender> {
    let directory = config
        .file
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = config
        .file
        .file_name()
        .and_then(|name| name.to_str())
        .with_context(|| format!("logging.file {} does not name a file", config.file.display()))?;

    RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name)
        .build(directory)
        .with_context(|| format!("cannot open log file {}", config.file.display()))
}
