//! Forwards the crate's `log` records to a logger supplied by the host app.

use std::sync::{Arc, OnceLock};

/// Receives log messages from the attestation core.
///
/// Implemented by the host app and installed once with [`set_logger`].
///
/// ```rust
/// use attestkit_core::logger::{LogLevel, Logger};
///
/// struct ConsoleLogger;
///
/// impl Logger for ConsoleLogger {
///     fn log(&self, level: LogLevel, message: String) {
///         println!("[{level:?}] {message}");
///     }
/// }
/// ```
///
/// ## Swift
///
/// ```swift
/// final class AttestKitLoggerBridge: AttestKit.Logger {
///     static let shared = AttestKitLoggerBridge()
///
///     func log(level: AttestKit.LogLevel, message: String) {
///         os_log("%{public}@", log: .attestation, type: level.osLogType, message)
///     }
/// }
///
/// AttestKit.setLogger(logger: AttestKitLoggerBridge.shared) // once, at launch
/// ```
#[uniffi::export(with_foreign)]
pub trait Logger: Sync + Send {
    /// Logs `message` at `level`.
    fn log(&self, level: LogLevel, message: String);
}

/// Severity of a log message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum LogLevel {
    /// Very detailed tracing output.
    Trace,
    /// Debugging information, such as retries and payload sizes.
    Debug,
    /// Lifecycle progress, such as a key being registered.
    Info,
    /// A failed step the caller may retry.
    Warn,
    /// A failure that left something to clean up.
    Error,
}

impl From<log::Level> for LogLevel {
    fn from(level: log::Level) -> Self {
        match level {
            log::Level::Error => Self::Error,
            log::Level::Warn => Self::Warn,
            log::Level::Info => Self::Info,
            log::Level::Debug => Self::Debug,
            log::Level::Trace => Self::Trace,
        }
    }
}

static LOGGER_INSTANCE: OnceLock<Arc<dyn Logger>> = OnceLock::new();

struct ForeignLogger;

/// Debug and trace output from dependencies (HTTP stack, TLS) is dropped;
/// everything from this crate and anything at info or above goes through.
fn is_forwarded(metadata: &log::Metadata) -> bool {
    metadata.level() <= log::Level::Info || metadata.target().starts_with("attestkit")
}

impl log::Log for ForeignLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        is_forwarded(metadata)
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        if let Some(logger) = LOGGER_INSTANCE.get() {
            logger.log(record.level().into(), record.args().to_string());
        }
    }

    fn flush(&self) {}
}

/// Installs the host app's logger.
///
/// Only the first call takes effect; later calls are ignored.
#[uniffi::export]
pub fn set_logger(logger: Arc<dyn Logger>) {
    if LOGGER_INSTANCE.set(logger).is_err() {
        log::warn!("logger already set, ignoring");
        return;
    }

    static LOGGER: ForeignLogger = ForeignLogger;
    match log::set_logger(&LOGGER) {
        Ok(()) => log::set_max_level(log::LevelFilter::Trace),
        Err(e) => eprintln!("failed to install attestkit logger: {e}"),
    }
}
