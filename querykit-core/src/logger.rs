//! Log forwarding.
//!
//! The engine logs through the [`log`] facade: rendered statements at
//! `debug`, cache hits at `trace`, and every recorded failure at `warn`.
//! Applications that already install a `log` implementation see these
//! records directly. Applications that do not can hand a [`Logger`] to
//! [`set_logger`] and receive them as plain `(level, message)` pairs.

use std::sync::{Arc, OnceLock};

/// Receiver for engine log messages.
///
/// ```rust
/// use querykit_core::logger::{LogLevel, Logger};
///
/// struct StderrLogger;
///
/// impl Logger for StderrLogger {
///     fn log(&self, level: LogLevel, message: String) {
///         eprintln!("[{level:?}] {message}");
///     }
/// }
/// ```
pub trait Logger: Sync + Send {
    /// Receives one message.
    fn log(&self, level: LogLevel, message: String);
}

/// Severity of a forwarded message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    /// Per-call detail such as cache hits.
    Trace,
    /// Rendered statements.
    Debug,
    /// Informational messages.
    Info,
    /// Recorded failures.
    Warn,
    /// Errors.
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

/// `log::Log` implementation that hands records to [`LOGGER_INSTANCE`].
struct ForwardingLogger;

/// Debug and trace records are only forwarded when they come from this
/// workspace; other crates stay at info and above.
fn is_forwarded(metadata: &log::Metadata<'_>) -> bool {
    metadata.level() <= log::Level::Info || metadata.target().starts_with("querykit")
}

impl log::Log for ForwardingLogger {
    fn enabled(&self, metadata: &log::Metadata<'_>) -> bool {
        is_forwarded(metadata)
    }

    fn log(&self, record: &log::Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        if let Some(logger) = LOGGER_INSTANCE.get() {
            logger.log(record.level().into(), record.args().to_string());
        } else {
            eprintln!("querykit logger not set: {}", record.args());
        }
    }

    fn flush(&self) {}
}

/// Installs `logger` as the receiver of engine log messages.
///
/// Only the first call takes effect. If another `log` implementation is
/// already installed the messages go there instead, and a note is printed
/// to stderr.
pub fn set_logger(logger: Arc<dyn Logger>) {
    if LOGGER_INSTANCE.set(logger).is_err() {
        eprintln!("querykit logger already set");
        return;
    }
    if let Err(err) = init_logger() {
        eprintln!("failed to install querykit logger: {err}");
    }
}

fn init_logger() -> Result<(), log::SetLoggerError> {
    static LOGGER: ForwardingLogger = ForwardingLogger;
    log::set_logger(&LOGGER)?;
    log::set_max_level(log::LevelFilter::Trace);
    Ok(())
}
