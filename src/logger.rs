use std::result::Result;

use snafu::ResultExt;
use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::layer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{registry, EnvFilter, Layer};

use crate::config::Config;
use crate::error::{ApplicationError, InitializeLoggerSnafu};

/// Keeps the background log writers alive, logs written after this is dropped are lost.
#[derive(Debug)]
pub struct LogGuard {
    _app: WorkerGuard,
    _error: WorkerGuard,
}

/// Console output filtered by `RUST_LOG` (default `info`), plus two daily-rotated JSON files in `log_dir`:
/// `app.log` for everything from INFO up and `error.log` for warnings and errors.
pub fn init(config: &Config) -> Result<LogGuard, ApplicationError> {
    let (app_layer, app_guard) = {
        let file_appender = tracing_appender::rolling::daily(&config.log_dir, "app.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        let layer = layer()
            .with_ansi(false)
            .json()
            .with_writer(non_blocking)
            .with_filter(LevelFilter::INFO);

        (layer, guard)
    };

    let (error_layer, error_guard) = {
        let file_appender = tracing_appender::rolling::daily(&config.log_dir, "error.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        let layer = layer()
            .with_ansi(false)
            .json()
            .with_writer(non_blocking)
            .with_filter(LevelFilter::WARN);

        (layer, guard)
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let console_layer = layer()
        .pretty()
        .with_writer(std::io::stdout)
        .with_filter(env_filter);

    let subscriber = registry()
        .with(console_layer)
        .with(app_layer)
        .with(error_layer);
    tracing::subscriber::set_global_default(subscriber).context(InitializeLoggerSnafu)?;

    Ok(LogGuard {
        _app: app_guard,
        _error: error_guard,
    })
}
