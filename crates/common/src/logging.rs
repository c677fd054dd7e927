//! Tracing initialization for MirrorLink binaries.

use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Arc;

use crate::config::LoggingConfig;

/// Install the global tracing subscriber described by `config`.
///
/// A `RUST_LOG` environment filter takes precedence over the configured
/// level. When `file` is set, output is appended to that file with ANSI
/// colors disabled; otherwise it goes to stdout. Calls after the first
/// installed subscriber are no-ops.
pub fn init_logging(config: &LoggingConfig) {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    match (config.file.as_deref().and_then(open_log_file), config.json) {
        (Some(file), true) => {
            let subscriber = fmt::Subscriber::builder()
                .with_env_filter(env_filter)
                .with_writer(file)
                .with_ansi(false)
                .json()
                .finish();
            tracing::subscriber::set_global_default(subscriber).ok();
        }
        (Some(file), false) => {
            let subscriber = fmt::Subscriber::builder()
                .with_env_filter(env_filter)
                .with_writer(file)
                .with_ansi(false)
                .with_target(true)
                .finish();
            tracing::subscriber::set_global_default(subscriber).ok();
        }
        (None, true) => {
            let subscriber = fmt::Subscriber::builder()
                .with_env_filter(env_filter)
                .json()
                .finish();
            tracing::subscriber::set_global_default(subscriber).ok();
        }
        (None, false) => {
            let subscriber = fmt::Subscriber::builder()
                .with_env_filter(env_filter)
                .with_target(true)
                .finish();
            tracing::subscriber::set_global_default(subscriber).ok();
        }
    }
}

/// Open the configured log file for appending, creating parent directories
/// as needed. An unopenable path is reported on stderr and logging falls
/// back to stdout.
fn open_log_file(path: &Path) -> Option<Arc<File>> {
    let opened = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .map(std::fs::create_dir_all)
        .transpose()
        .and_then(|_| OpenOptions::new().create(true).append(true).open(path));
    match opened {
        Ok(file) => Some(Arc::new(file)),
        Err(e) => {
            eprintln!(
                "mirrorlink: cannot open log file {}: {e}; logging to stdout",
                path.display()
            );
            None
        }
    }
}
