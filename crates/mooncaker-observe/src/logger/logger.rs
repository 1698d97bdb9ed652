use std::path::Path;

use tracing::Subscriber;
use tracing_appender::{
    non_blocking::{NonBlocking, WorkerGuard},
    rolling::{RollingFileAppender, Rotation},
};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::logger::{
    config::LoggerConfig,
    error::{LoggerError, LoggerResult},
    object::LoggerRfc3339,
};

/// Keeps the file writer alive; dropping it flushes pending lines.
#[must_use = "dropping the guard stops file logging"]
#[derive(Debug, Default)]
pub struct LoggerGuard {
    _file: Option<WorkerGuard>,
}

impl LoggerGuard {
    /// Whether a log file is being written.
    pub fn has_file(&self) -> bool {
        self._file.is_some()
    }
}

/// Initializes text logger.
pub fn logger_text(cfg: &LoggerConfig) -> LoggerResult<LoggerGuard> {
    let filter = cfg.level.to_env_filter();
    let (file, guard) = split(file_writer(cfg)?);
    let fmt_layer = fmt::layer()
        .with_ansi(cfg.should_use_color())
        .with_target(cfg.with_targets)
        .with_timer(LoggerRfc3339);
    let file_layer = file.map(|w| {
        fmt::layer()
            .with_writer(w)
            .with_ansi(false)
            .with_target(cfg.with_targets)
            .with_timer(LoggerRfc3339)
    });

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .with(file_layer);
    init_subscriber(subscriber)?;
    Ok(LoggerGuard { _file: guard })
}

/// Initializes JSON (structured) logger.
pub fn logger_json(cfg: &LoggerConfig) -> LoggerResult<LoggerGuard> {
    let filter = cfg.level.to_env_filter();
    let (file, guard) = split(file_writer(cfg)?);
    let fmt_layer = fmt::layer()
        .json()
        .with_ansi(false)
        .with_target(cfg.with_targets)
        .with_timer(LoggerRfc3339);
    let file_layer = file.map(|w| {
        fmt::layer()
            .json()
            .with_writer(w)
            .with_ansi(false)
            .with_target(cfg.with_targets)
            .with_timer(LoggerRfc3339)
    });

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .with(file_layer);
    init_subscriber(subscriber)?;
    Ok(LoggerGuard { _file: guard })
}

/// Initializes journald logger (Linux only).
#[cfg(target_os = "linux")]
pub fn logger_journald(cfg: &LoggerConfig) -> LoggerResult<LoggerGuard> {
    let filter = cfg.level.to_env_filter();
    let journald =
        tracing_journald::layer().map_err(|e| LoggerError::JournaldInitFailed(e.to_string()))?;
    let (file, guard) = split(file_writer(cfg)?);
    let file_layer = file.map(|w| {
        fmt::layer()
            .with_writer(w)
            .with_ansi(false)
            .with_target(cfg.with_targets)
            .with_timer(LoggerRfc3339)
    });

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(journald)
        .with(file_layer);
    init_subscriber(subscriber)?;
    Ok(LoggerGuard { _file: guard })
}

/// Stub for journald on non-Linux platforms.
#[cfg(not(target_os = "linux"))]
pub fn logger_journald(_cfg: &LoggerConfig) -> LoggerResult<LoggerGuard> {
    Err(LoggerError::JournaldNotSupported)
}

/// Opens the configured log file for appending.
fn file_writer(cfg: &LoggerConfig) -> LoggerResult<Option<(NonBlocking, WorkerGuard)>> {
    let Some(path) = &cfg.file else {
        return Ok(None);
    };
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| LoggerError::InvalidFile(path.display().to_string()))?;
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(name)
        .build(dir)
        .map_err(|e| LoggerError::FileOpen(e.to_string()))?;
    Ok(Some(tracing_appender::non_blocking(appender)))
}

fn split(w: Option<(NonBlocking, WorkerGuard)>) -> (Option<NonBlocking>, Option<WorkerGuard>) {
    match w {
        Some((writer, guard)) => (Some(writer), Some(guard)),
        None => (None, None),
    }
}

/// Installs the subscriber as the global default.
fn init_subscriber<S>(subscriber: S) -> LoggerResult<()>
where
    S: Subscriber + Send + Sync + 'static,
{
    subscriber
        .try_init()
        .map_err(|_| LoggerError::AlreadyInitialized)
}
