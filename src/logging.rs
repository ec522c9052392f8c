//! Logging configuration for the bot endpoint

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Registry;

use crate::config::LoggingConfig;
use crate::Result;

/// Initialize console and rolling-file logging from configuration.
///
/// `RUST_LOG` takes precedence over `config.level`. The returned guard flushes
/// the file writer when dropped, so keep it alive for the process lifetime.
pub fn init_logging(config: &LoggingConfig) -> Result<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},crux_bot={}", config.level, config.level)));
    init_with_filter(filter, &config.directory)
}

/// Initialize logging with a fixed level, ignoring `RUST_LOG`
pub fn init_logging_with_level(level: &str, directory: &str) -> Result<WorkerGuard> {
    init_with_filter(EnvFilter::new(format!("{level},crux_bot={level}")), directory)
}

fn init_with_filter(filter: EnvFilter, directory: &str) -> Result<WorkerGuard> {
    let logs_dir = Path::new(directory);
    if !logs_dir.exists() {
        std::fs::create_dir_all(logs_dir)?;
    }

    let file_appender = tracing_appender::rolling::daily(logs_dir, "crux-bot.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let console_layer = fmt::layer()
        .with_target(true)
        .with_line_number(true)
        .with_writer(std::io::stderr);

    let file_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_writer(non_blocking)
        .with_ansi(false);

    Registry::default()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| crate::CruxError::ConfigError(format!("logging already initialized: {e}")))?;

    tracing::debug!("Log files will be saved to: {}/crux-bot.log.YYYY-MM-DD", directory);

    Ok(guard)
}

/// Initialize simple console logging for tests and one-shot commands
pub fn init_simple_logging() {
    let _ = tracing_subscriber::fmt()
        .with_target(true)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .try_init();
}
