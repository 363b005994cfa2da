use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;

const LOG_FILE_PREFIX: &str = "srs.log";

/// Keeps the non-blocking file writer alive; drop it only at process exit.
pub struct FileLogGuard {
    _guard: WorkerGuard,
    pub directory: PathBuf,
}

/// Installs the global subscriber from `config`. Returns a guard when file logging
/// is on.
///
/// Fails softly: a second call, or an unwritable log directory, leaves logging on
/// stdout only.
pub fn init_tracing(config: &Config) -> Option<FileLogGuard> {
    let env_filter =
        EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let stdout_layer = fmt::layer().with_target(true);

    if config.file_logs {
        let directory = config.log_dir.clone();
        if let Err(err) = std::fs::create_dir_all(&directory) {
            eprintln!("failed to create log directory {}: {err}", directory.display());
        } else {
            let file_appender = RollingFileAppender::new(Rotation::DAILY, &directory, LOG_FILE_PREFIX);
            let (file_writer, guard) = tracing_appender::non_blocking(file_appender);
            let file_layer = fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false)
                .with_target(true);

            let installed = tracing_subscriber::registry()
                .with(env_filter)
                .with(stdout_layer)
                .with(file_layer)
                .try_init();
            if installed.is_err() {
                return None;
            }

            return Some(FileLogGuard {
                _guard: guard,
                directory,
            });
        }
    }

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .try_init();

    None
}
