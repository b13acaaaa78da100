//! Forwarding of diagnostics to a host-provided sink.
//!
//! The crate reports every failure through the `log` facade. Hosts that do not
//! run a `log` implementation of their own can install a [`Logger`] here to
//! receive those records, for example to print them to an editor console.

use std::sync::{Arc, OnceLock};

/// Trait representing a sink that receives diagnostic messages.
///
/// # Examples
///
/// ```rust
/// use hostsql::logger::{LogLevel, Logger};
///
/// struct Console;
///
/// impl Logger for Console {
///     fn log(&self, level: LogLevel, message: String) {
///         eprintln!("[{level}] {message}");
///     }
/// }
///
/// hostsql::logger::set_logger(std::sync::Arc::new(Console));
/// ```
pub trait Logger: Sync + Send {
    /// Logs a message at the specified level.
    fn log(&self, level: LogLevel, message: String);
}

/// Severity of a diagnostic message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum LogLevel {
    /// Very low priority, often extremely detailed messages.
    Trace,
    /// Lifecycle transitions and other debugging information.
    Debug,
    /// Informational messages.
    Info,
    /// Recoverable oddities, such as surplus bind values.
    Warn,
    /// Failed operations.
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

/// A `log::Log` implementation forwarding to the installed [`Logger`].
struct HostLogger;

impl log::Log for HostLogger {
    fn enabled(&self, _metadata: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        let from_hostsql = record
            .module_path()
            .is_some_and(|module_path| module_path.starts_with("hostsql"));
        let is_debug_or_trace = record.level() >= log::Level::Debug;

        // Only this crate's debug output is interesting to the host.
        if is_debug_or_trace && !from_hostsql {
            return;
        }

        if let Some(logger) = LOGGER_INSTANCE.get() {
            logger.log(record.level().into(), record.args().to_string());
        } else {
            eprintln!("Logger not set: {}", record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER_INSTANCE: OnceLock<Arc<dyn Logger>> = OnceLock::new();

/// Installs `logger` as the process-wide diagnostic sink.
///
/// Only the first call has an effect; later calls print a note and return.
/// Installation also fails, with a note, if another `log` implementation was
/// registered first.
pub fn set_logger(logger: Arc<dyn Logger>) {
    if LOGGER_INSTANCE.set(logger).is_err() {
        eprintln!("Logger already set");
        return;
    }

    if let Err(e) = init_logger() {
        eprintln!("Failed to set logger: {e}");
    }
}

fn init_logger() -> Result<(), log::SetLoggerError> {
    static LOGGER: HostLogger = HostLogger;
    log::set_logger(&LOGGER)?;
    log::set_max_level(log::LevelFilter::Trace);
    Ok(())
}
