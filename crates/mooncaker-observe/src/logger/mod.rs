mod config;
mod error;
mod logger;
mod object;

pub use config::LoggerConfig;
pub use error::LoggerError;
pub use logger::LoggerGuard;
pub use object::{LoggerFormat, LoggerLevel};

/// Initializes the global tracing subscriber with the given configuration.
///
/// When [`LoggerConfig::file`] is set, log lines are also appended to that file
/// through a non-blocking writer. Keep the returned [`LoggerGuard`] alive for the
/// whole process: dropping it flushes and stops the file writer.
///
/// # Examples
/// ```rust
/// use mooncaker_observe::{LoggerConfig, init_logger};
///
/// let config = LoggerConfig::default();
/// let _guard = init_logger(&config).expect("Failed to initialize logger");
///
/// tracing::info!("Logger initialized successfully");
/// ```
pub fn init_logger(cfg: &LoggerConfig) -> Result<LoggerGuard, LoggerError> {
    match cfg.format {
        LoggerFormat::Text => logger::logger_text(cfg),
        LoggerFormat::Json => logger::logger_json(cfg),
        LoggerFormat::Journald => logger::logger_journald(cfg),
    }
}
