//! SolGfx global facade
//!
//! Holds the process-wide logger used by the `gfx_*` macros. It uses
//! thread-safe static storage with RwLock so a custom logger can be swapped in
//! from any thread.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{OnceLock, RwLock};
use std::time::SystemTime;
use crate::log::{DefaultLogger, LogEntry, LogSeverity, Logger};

// ===== INTERNAL STATE =====

/// Global logger (initialized with DefaultLogger)
static LOGGER: OnceLock<RwLock<Box<dyn Logger>>> = OnceLock::new();

/// Minimum severity forwarded to the logger (stored as the enum ordinal)
static MIN_SEVERITY: AtomicU8 = AtomicU8::new(LogSeverity::Trace as u8);

fn global_logger() -> &'static RwLock<Box<dyn Logger>> {
    LOGGER.get_or_init(|| RwLock::new(Box::new(DefaultLogger)))
}

fn severity_from_ordinal(value: u8) -> LogSeverity {
    match value {
        0 => LogSeverity::Trace,
        1 => LogSeverity::Debug,
        2 => LogSeverity::Info,
        3 => LogSeverity::Warn,
        _ => LogSeverity::Error,
    }
}

// ===== PUBLIC API =====

/// Process-wide SolGfx services
///
/// # Example
///
/// ```no_run
/// use sol_gfx::solgfx::{Gfx, log::LogSeverity};
///
/// Gfx::set_min_severity(LogSeverity::Info);
/// ```
pub struct Gfx;

impl Gfx {
    /// Set a custom logger
    ///
    /// Replace the default logger with a custom implementation (file logger, network logger, etc.)
    ///
    /// ```no_run
    /// use sol_gfx::solgfx::{Gfx, log::{Logger, LogEntry}};
    ///
    /// struct FileLogger;
    /// impl Logger for FileLogger {
    ///     fn log(&self, entry: &LogEntry) {
    ///         // Write to file...
    ///     }
    /// }
    ///
    /// Gfx::set_logger(FileLogger);
    /// ```
    pub fn set_logger<L: Logger + 'static>(custom: L) {
        if let Ok(mut lock) = global_logger().write() {
            *lock = Box::new(custom);
        }
    }

    /// Reset logger to default (DefaultLogger)
    pub fn reset_logger() {
        if let Ok(mut lock) = global_logger().write() {
            *lock = Box::new(DefaultLogger);
        }
    }

    /// Drop every entry below `severity`
    pub fn set_min_severity(severity: LogSeverity) {
        MIN_SEVERITY.store(severity as u8, Ordering::Relaxed);
    }

    /// Current minimum severity
    pub fn min_severity() -> LogSeverity {
        severity_from_ordinal(MIN_SEVERITY.load(Ordering::Relaxed))
    }

    /// Whether an entry of `severity` would reach the logger
    pub fn is_enabled(severity: LogSeverity) -> bool {
        severity >= Self::min_severity()
    }

    /// Internal logging method (for simple logs without file:line)
    ///
    /// Used by macros like gfx_info!, gfx_warn!, etc.
    pub fn log(severity: LogSeverity, source: &str, message: String) {
        if !Self::is_enabled(severity) {
            return;
        }
        if let Ok(lock) = global_logger().read() {
            lock.log(&LogEntry {
                severity,
                timestamp: SystemTime::now(),
                source: source.to_string(),
                message,
                file: None,
                line: None,
            });
        }
    }

    /// Internal logging method with file:line information (for ERROR logs)
    ///
    /// Used by gfx_error! macro to include source location.
    pub fn log_detailed(
        severity: LogSeverity,
        source: &str,
        message: String,
        file: &'static str,
        line: u32,
    ) {
        if !Self::is_enabled(severity) {
            return;
        }
        if let Ok(lock) = global_logger().read() {
            lock.log(&LogEntry {
                severity,
                timestamp: SystemTime::now(),
                source: source.to_string(),
                message,
                file: Some(file),
                line: Some(line),
            });
        }
    }
}
