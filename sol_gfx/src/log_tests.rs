//! Unit tests for log.rs
//!
//! Tests LogSeverity parsing, LogEntry formatting and DefaultLogger.
//! Global logger routing is covered in tests/logging_integration_tests.rs.

use crate::log::{DefaultLogger, LogEntry, LogSeverity, Logger};
use std::time::SystemTime;

fn entry(severity: LogSeverity, message: &str) -> LogEntry {
    LogEntry {
        severity,
        timestamp: SystemTime::now(),
        source: "solgfx::Test".to_string(),
        message: message.to_string(),
        file: None,
        line: None,
    }
}

// ============================================================================
// LOG SEVERITY TESTS
// ============================================================================

#[test]
fn test_log_severity_ordering() {
    assert!(LogSeverity::Trace < LogSeverity::Debug);
    assert!(LogSeverity::Debug < LogSeverity::Info);
    assert!(LogSeverity::Info < LogSeverity::Warn);
    assert!(LogSeverity::Warn < LogSeverity::Error);
}

#[test]
fn test_log_severity_parse() {
    assert_eq!(LogSeverity::parse("trace"), Some(LogSeverity::Trace));
    assert_eq!(LogSeverity::parse("DEBUG"), Some(LogSeverity::Debug));
    assert_eq!(LogSeverity::parse(" Info "), Some(LogSeverity::Info));
    assert_eq!(LogSeverity::parse("warning"), Some(LogSeverity::Warn));
    assert_eq!(LogSeverity::parse("error"), Some(LogSeverity::Error));
    assert_eq!(LogSeverity::parse("verbose"), None);
    assert_eq!(LogSeverity::parse(""), None);
}

#[test]
fn test_log_severity_from_log_level() {
    assert_eq!(LogSeverity::from(log::Level::Trace), LogSeverity::Trace);
    assert_eq!(LogSeverity::from(log::Level::Warn), LogSeverity::Warn);
    assert_eq!(LogSeverity::from(log::Level::Error), LogSeverity::Error);
}

#[test]
fn test_log_severity_to_level_filter() {
    assert_eq!(LogSeverity::Info.to_level_filter(), log::LevelFilter::Info);
    assert_eq!(LogSeverity::Error.to_level_filter(), log::LevelFilter::Error);
}

// ============================================================================
// LOG ENTRY TESTS
// ============================================================================

#[test]
fn test_log_entry_creation_with_file_line() {
    let entry = LogEntry {
        severity: LogSeverity::Error,
        timestamp: SystemTime::now(),
        source: "solgfx::vulkan".to_string(),
        message: "vkQueueSubmit failed".to_string(),
        file: Some("vulkan_sync.rs"),
        line: Some(42),
    };

    assert_eq!(entry.severity, LogSeverity::Error);
    assert_eq!(entry.source, "solgfx::vulkan");
    assert_eq!(entry.file, Some("vulkan_sync.rs"));
    assert_eq!(entry.line, Some(42));
}

#[test]
fn test_format_plain_without_location() {
    let text = DefaultLogger::format_plain(&entry(LogSeverity::Info, "Device created"));
    assert!(text.contains("[INFO ]"));
    assert!(text.contains("[solgfx::Test]"));
    assert!(text.ends_with("Device created"));
}

#[test]
fn test_format_plain_with_location() {
    let mut e = entry(LogSeverity::Error, "Surface rebuild failed");
    e.file = Some("swapchain.rs");
    e.line = Some(77);

    let text = DefaultLogger::format_plain(&e);
    assert!(text.contains("[ERROR]"));
    assert!(text.ends_with("Surface rebuild failed (swapchain.rs:77)"));
}

#[test]
fn test_format_plain_timestamp_shape() {
    let text = DefaultLogger::format_plain(&entry(LogSeverity::Debug, "x"));
    // [YYYY-MM-DD HH:MM:SS.mmm]
    let stamp = &text[1..24];
    assert_eq!(stamp.len(), 23);
    assert_eq!(&stamp[4..5], "-");
    assert_eq!(&stamp[10..11], " ");
    assert_eq!(&stamp[19..20], ".");
    assert_eq!(&text[24..25], "]");
}

// ============================================================================
// DEFAULT LOGGER TESTS
// ============================================================================

#[test]
fn test_default_logger_all_severities() {
    let logger = DefaultLogger;
    for severity in [
        LogSeverity::Trace,
        LogSeverity::Debug,
        LogSeverity::Info,
        LogSeverity::Warn,
        LogSeverity::Error,
    ] {
        // Just verify it doesn't panic
        logger.log(&entry(severity, &format!("{:?} message", severity)));
    }
}

#[test]
fn test_default_logger_error_with_file_line() {
    let logger = DefaultLogger;
    let mut e = entry(LogSeverity::Error, "Device lost");
    e.file = Some("device.rs");
    e.line = Some(123);
    logger.log(&e);
}

// ============================================================================
// LOGGER TRAIT TESTS
// ============================================================================

struct CountingLogger {
    logged_count: std::sync::Mutex<usize>,
}

impl Logger for CountingLogger {
    fn log(&self, _entry: &LogEntry) {
        *self.logged_count.lock().unwrap() += 1;
    }
}

#[test]
fn test_custom_logger_implementation() {
    let logger = CountingLogger {
        logged_count: std::sync::Mutex::new(0),
    };

    logger.log(&entry(LogSeverity::Info, "a"));
    logger.log(&entry(LogSeverity::Info, "b"));
    assert_eq!(*logger.logged_count.lock().unwrap(), 2);
}

#[test]
fn test_logger_trait_is_send_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<DefaultLogger>();
}
