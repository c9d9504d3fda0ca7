//! Tracing setup for the replay binary.
//!
//! stdout carries turn decisions, so every log line goes to stderr and,
//! when a log directory is configured, to a daily-rolling file as well.

use std::io;
use std::path::Path;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const LOG_FILE_PREFIX: &str = "triple-helix.log";

/// Keeps the background file writer alive; drop it last.
pub struct LogGuard {
    _worker: WorkerGuard,
}

pub fn init_tracing(log_level: &str, log_dir: Option<&Path>) -> Option<LogGuard> {
    let filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let stderr_layer = fmt::layer().with_writer(io::stderr).with_target(true);

    let (file_layer, worker) = match log_dir.map(file_writer) {
        Some(Ok((writer, worker))) => (
            Some(fmt::layer().with_writer(writer).with_ansi(false).with_target(true)),
            Some(worker),
        ),
        Some(Err(err)) => {
            eprintln!("file logging disabled: {err}");
            (None, None)
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    worker.map(|worker| LogGuard { _worker: worker })
}

fn file_writer(dir: &Path) -> io::Result<(NonBlocking, WorkerGuard)> {
    std::fs::create_dir_all(dir)?;
    let appender = RollingFileAppender::new(Rotation::DAILY, dir, LOG_FILE_PREFIX);
    Ok(tracing_appender::non_blocking(appender))
}
