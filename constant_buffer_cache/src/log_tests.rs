//! Unit tests for log.rs
//!
//! Tests LogSeverity, LogEntry and DefaultLogger formatting.

use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};
use std::time::SystemTime;

fn entry(severity: LogSeverity, message: &str, location: Option<(&'static str, u32)>) -> LogEntry {
    LogEntry {
        severity,
        timestamp: SystemTime::now(),
        source: "cbcache::ConstantBufferCache".to_string(),
        message: message.to_string(),
        file: location.map(|(file, _)| file),
        line: location.map(|(_, line)| line),
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
fn test_log_severity_debug_names() {
    assert_eq!(format!("{:?}", LogSeverity::Trace), "Trace");
    assert_eq!(format!("{:?}", LogSeverity::Error), "Error");
}

// ============================================================================
// LOG ENTRY TESTS
// ============================================================================

#[test]
fn test_log_entry_without_location() {
    let e = entry(LogSeverity::Info, "cache created", None);
    assert_eq!(e.severity, LogSeverity::Info);
    assert_eq!(e.source, "cbcache::ConstantBufferCache");
    assert!(e.file.is_none());
    assert!(e.line.is_none());
}

#[test]
fn test_log_entry_clone_keeps_location() {
    let e1 = entry(LogSeverity::Error, "allocation failed", Some(("buffer_pool.rs", 88)));
    let e2 = e1.clone();
    assert_eq!(e2.file, Some("buffer_pool.rs"));
    assert_eq!(e2.line, Some(88));
    assert_eq!(e1.message, e2.message);
}

// ============================================================================
// DEFAULT LOGGER TESTS
// ============================================================================

#[test]
fn test_format_plain_without_location() {
    let line = DefaultLogger::format_plain(&entry(LogSeverity::Warn, "zero-size map", None));
    assert!(line.contains("[WARN ]"));
    assert!(line.contains("[cbcache::ConstantBufferCache]"));
    assert!(line.ends_with("zero-size map"));
}

#[test]
fn test_format_plain_with_location() {
    let line = DefaultLogger::format_plain(
        &entry(LogSeverity::Error, "bounds violation", Some(("constant_buffer_cache.rs", 210))),
    );
    assert!(line.contains("[ERROR]"));
    assert!(line.ends_with("bounds violation (constant_buffer_cache.rs:210)"));
}

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
        // Must not panic, with or without file:line
        logger.log(&entry(severity, "message", None));
        logger.log(&entry(severity, "message", Some(("log_tests.rs", 1))));
    }
}

#[test]
fn test_logger_trait_is_send_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<DefaultLogger>();
}
