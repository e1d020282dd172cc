//! Forwards crate log output to a logger provided by the host application.
//!
//! Library code logs through `tracing`; with no subscriber installed those
//! events are emitted as `log` records, which [`ForeignLogger`] hands to the
//! registered [`Logger`].

use std::sync::{Arc, OnceLock};

/// Receives log messages from the secure storage library.
///
/// Exported via `UniFFI` so Kotlin and Swift code can route messages into the
/// platform logger.
///
/// ## Kotlin
///
/// ```kotlin
/// object SecureStoreLogcat : Logger {
///     override fun log(level: LogLevel, message: String) {
///         when (level) {
///             LogLevel.ERROR -> Log.e("SecureStorage", message)
///             LogLevel.WARN -> Log.w("SecureStorage", message)
///             else -> Log.i("SecureStorage", message)
///         }
///     }
/// }
///
/// setLogger(SecureStoreLogcat) // once, at startup
/// ```
#[uniffi::export(with_foreign)]
pub trait Logger: Sync + Send {
    /// Logs a message at the specified level.
    fn log(&self, level: LogLevel, message: String);
}

/// Severity of a forwarded log message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum LogLevel {
    /// Very low priority, extremely detailed messages.
    Trace,
    /// Debugging information.
    Debug,
    /// Progress of normal operation.
    Info,
    /// Potentially harmful situations.
    Warn,
    /// Failures.
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

/// `log::Log` implementation that forwards to [`LOGGER_INSTANCE`].
struct ForeignLogger;

impl log::Log for ForeignLogger {
    fn enabled(&self, _metadata: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        if !should_forward(record.level(), record.module_path()) {
            return;
        }

        if let Some(logger) = LOGGER_INSTANCE.get() {
            logger.log(record.level().into(), format!("{}", record.args()));
        } else {
            eprintln!("Logger not set: {}", record.args());
        }
    }

    fn flush(&self) {}
}

/// Debug and trace records are only forwarded when they come from this
/// library; dependencies are limited to info and above.
fn should_forward(level: log::Level, module_path: Option<&str>) -> bool {
    let is_own_record = module_path.is_some_and(|path| path.starts_with("securestore"));
    let is_verbose = matches!(level, log::Level::Debug | log::Level::Trace);
    is_own_record || !is_verbose
}

static LOGGER_INSTANCE: OnceLock<Arc<dyn Logger>> = OnceLock::new();

/// Sets the global logger.
///
/// Should be called once, before any other library call. Subsequent calls
/// are ignored.
#[uniffi::export]
pub fn set_logger(logger: Arc<dyn Logger>) {
    if LOGGER_INSTANCE.set(logger).is_err() {
        println!("Logger already set");
        return;
    }

    if let Err(e) = init_logger() {
        eprintln!("Failed to set logger: {e}");
    }
}

fn init_logger() -> Result<(), log::SetLoggerError> {
    static LOGGER: ForeignLogger = ForeignLogger;
    log::set_logger(&LOGGER)?;
    log::set_max_level(log::LevelFilter::Trace);
    Ok(())
}
