//! Internal logging system for SolGfx
//!
//! This module provides:
//! - Customizable logger via Logger trait
//! - Severity levels (Trace, Debug, Info, Warn, Error)
//! - Colored console output by default
//! - File and line information for detailed ERROR logs
//! - A bridge so records emitted through the `log` crate reach the same sink
//!
//! The global logger itself lives in [`crate::gfx::Gfx`].

use colored::*;
use std::time::SystemTime;
use chrono::{DateTime, Local};

/// Logger trait for custom logging implementations
///
/// # Example
///
/// ```no_run
/// use sol_gfx::solgfx::log::{Logger, LogEntry};
///
/// struct FileLogger {
///     file: std::fs::File,
/// }
///
/// impl Logger for FileLogger {
///     fn log(&self, entry: &LogEntry) {
///         // Write to file...
///     }
/// }
/// ```
pub trait Logger: Send + Sync {
    /// Log an entry
    fn log(&self, entry: &LogEntry);
}

/// Log entry containing all information about a log message
#[derive(Debug, Clone)]
pub struct LogEntry {
    /// Severity level
    pub severity: LogSeverity,

    /// Timestamp when the log was created
    pub timestamp: SystemTime,

    /// Source component (e.g., "solgfx::Device", "solgfx::vulkan::Swapchain")
    pub source: String,

    /// Log message
    pub message: String,

    /// Source file (only for detailed ERROR logs)
    pub file: Option<&'static str>,

    /// Source line (only for detailed ERROR logs)
    pub line: Option<u32>,
}

/// Log severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogSeverity {
    /// Very verbose information (per-frame events)
    Trace,

    /// Development/debugging information
    Debug,

    /// Important informational messages
    Info,

    /// Warning messages (potential issues)
    Warn,

    /// Error messages (fatal issues with file:line details)
    Error,
}

impl LogSeverity {
    /// Parse a severity name as used by `SOLGFX_LOG` (case-insensitive)
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "trace" => Some(LogSeverity::Trace),
            "debug" => Some(LogSeverity::Debug),
            "info" => Some(LogSeverity::Info),
            "warn" | "warning" => Some(LogSeverity::Warn),
            "error" => Some(LogSeverity::Error),
            _ => None,
        }
    }

    /// Equivalent `log` crate filter
    pub fn to_level_filter(self) -> ::log::LevelFilter {
        match self {
            LogSeverity::Trace => ::log::LevelFilter::Trace,
            LogSeverity::Debug => ::log::LevelFilter::Debug,
            LogSeverity::Info => ::log::LevelFilter::Info,
            LogSeverity::Warn => ::log::LevelFilter::Warn,
            LogSeverity::Error => ::log::LevelFilter::Error,
        }
    }
}

impl From<::log::Level> for LogSeverity {
    fn from(level: ::log::Level) -> Self {
        match level {
            ::log::Level::Trace => LogSeverity::Trace,
            ::log::Level::Debug => LogSeverity::Debug,
            ::log::Level::Info => LogSeverity::Info,
            ::log::Level::Warn => LogSeverity::Warn,
            ::log::Level::Error => LogSeverity::Error,
        }
    }
}

/// Default logger implementation using colored console output
///
/// Format:
/// - Normal: `[timestamp] [SEVERITY] [source] message`
/// - Error: `[timestamp] [ERROR] [source] message (file:line)`
///
/// Warnings and errors go to stderr, the rest to stdout.
pub struct DefaultLogger;

impl DefaultLogger {
    /// Render an entry without colors (used by tests and file sinks)
    pub fn format_plain(entry: &LogEntry) -> String {
        let datetime: DateTime<Local> = entry.timestamp.into();
        let timestamp = datetime.format("%Y-%m-%d %H:%M:%S%.3f");
        let severity = severity_label(entry.severity);
        match (entry.file, entry.line) {
            (Some(file), Some(line)) => format!(
                "[{}] [{}] [{}] {} ({}:{})",
                timestamp, severity, entry.source, entry.message, file, line
            ),
            _ => format!("[{}] [{}] [{}] {}", timestamp, severity, entry.source, entry.message),
        }
    }
}

fn severity_label(severity: LogSeverity) -> &'static str {
    match severity {
        LogSeverity::Trace => "TRACE",
        LogSeverity::Debug => "DEBUG",
        LogSeverity::Info => "INFO ",
        LogSeverity::Warn => "WARN ",
        LogSeverity::Error => "ERROR",
    }
}

impl Logger for DefaultLogger {
    fn log(&self, entry: &LogEntry) {
        let datetime: DateTime<Local> = entry.timestamp.into();
        let timestamp = datetime.format("%Y-%m-%d %H:%M:%S%.3f").to_string();

        let label = severity_label(entry.severity);
        let severity_str = match entry.severity {
            LogSeverity::Trace => label.bright_black(),
            LogSeverity::Debug => label.cyan(),
            LogSeverity::Info => label.green(),
            LogSeverity::Warn => label.yellow(),
            LogSeverity::Error => label.red().bold(),
        };
        let source = entry.source.bright_blue();

        let line = if let (Some(file), Some(line)) = (entry.file, entry.line) {
            format!(
                "[{}] [{}] [{}] {} ({}:{})",
                timestamp, severity_str, source, entry.message, file, line
            )
        } else {
            format!("[{}] [{}] [{}] {}", timestamp, severity_str, source, entry.message)
        };

        if entry.severity >= LogSeverity::Warn {
            eprintln!("{}", line);
        } else {
            println!("{}", line);
        }
    }
}

// ===== LOG CRATE BRIDGE =====

/// Forwards `log` crate records into the SolGfx logger
///
/// Backend dependencies (gpu-allocator, winit) report through the `log`
/// facade; installing the bridge keeps every message in one sink.
struct LogBridge;

impl ::log::Log for LogBridge {
    fn enabled(&self, metadata: &::log::Metadata) -> bool {
        crate::gfx::Gfx::is_enabled(LogSeverity::from(metadata.level()))
    }

    fn log(&self, record: &::log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let severity = LogSeverity::from(record.level());
        let message = record.args().to_string();
        match (severity, record.file_static(), record.line()) {
            (LogSeverity::Error, Some(file), Some(line)) => {
                crate::gfx::Gfx::log_detailed(severity, record.target(), message, file, line)
            }
            _ => crate::gfx::Gfx::log(severity, record.target(), message),
        }
    }

    fn flush(&self) {}
}

static LOG_BRIDGE: LogBridge = LogBridge;

/// Install the `log` crate bridge as the process-wide `log` logger
///
/// Returns `false` when another `log` implementation was installed first.
/// Calling it more than once is harmless.
pub fn install_log_bridge(max_level: LogSeverity) -> bool {
    let installed = ::log::set_logger(&LOG_BRIDGE).is_ok();
    if installed {
        ::log::set_max_level(max_level.to_level_filter());
    }
    installed
}

// ===== LOGGING MACROS =====

/// Log a TRACE message (per-frame events)
///
/// # Example
///
/// ```ignore
/// gfx_trace!("solgfx::Swapchain", "Presented back buffer {}", index);
/// ```
#[macro_export]
macro_rules! gfx_trace {
    ($source:expr, $($arg:tt)*) => {
        $crate::solgfx::Gfx::log(
            $crate::solgfx::log::LogSeverity::Trace,
            $source,
            format!($($arg)*)
        )
    };
}

/// Log a DEBUG message (development information)
#[macro_export]
macro_rules! gfx_debug {
    ($source:expr, $($arg:tt)*) => {
        $crate::solgfx::Gfx::log(
            $crate::solgfx::log::LogSeverity::Debug,
            $source,
            format!($($arg)*)
        )
    };
}

/// Log an INFO message (important events)
///
/// # Example
///
/// ```ignore
/// gfx_info!("solgfx::Device", "Device created on adapter '{}'", name);
/// ```
#[macro_export]
macro_rules! gfx_info {
    ($source:expr, $($arg:tt)*) => {
        $crate::solgfx::Gfx::log(
            $crate::solgfx::log::LogSeverity::Info,
            $source,
            format!($($arg)*)
        )
    };
}

/// Log a WARN message (potential issues)
#[macro_export]
macro_rules! gfx_warn {
    ($source:expr, $($arg:tt)*) => {
        $crate::solgfx::Gfx::log(
            $crate::solgfx::log::LogSeverity::Warn,
            $source,
            format!($($arg)*)
        )
    };
}

/// Log an ERROR message with file:line information
#[macro_export]
macro_rules! gfx_error {
    ($source:expr, $($arg:tt)*) => {
        $crate::solgfx::Gfx::log_detailed(
            $crate::solgfx::log::LogSeverity::Error,
            $source,
            format!($($arg)*),
            file!(),
            line!()
        )
    };
}

/// Log an error and evaluate to it
///
/// # Example
///
/// ```ignore
/// return Err(gfx_err!("solgfx::Device", Error::NoHardwareAdapter));
/// ```
#[macro_export]
macro_rules! gfx_err {
    ($source:expr, $err:expr) => {{
        let err = $err;
        $crate::gfx_error!($source, "{}", err);
        err
    }};
}

/// Log an error and return it from the enclosing function
#[macro_export]
macro_rules! gfx_bail {
    ($source:expr, $err:expr) => {
        return Err($crate::gfx_err!($source, $err))
    };
}

#[cfg(test)]
#[path = "log_tests.rs"]
mod tests;
