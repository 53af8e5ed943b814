//! Integration tests for cache diagnostics
//!
//! These tests install a capturing logger and check what the cache reports.
//! No GPU required.
//!
//! Run with: cargo test --test logging_integration_tests

use std::sync::{Arc, Mutex};
use constant_buffer_cache::cbcache::Diagnostics;
use constant_buffer_cache::cbcache::cache::ConstantBufferCache;
use constant_buffer_cache::cbcache::device::{HostDevice, Register, ShaderSlot, ShaderStage};
use constant_buffer_cache::cbcache::log::{Logger, LogEntry, LogSeverity};
use serial_test::serial;

// ============================================================================
// TEST LOGGER IMPLEMENTATION
// ============================================================================

/// Test logger that captures log entries for verification
struct TestLogger {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl TestLogger {
    fn new() -> (Self, Arc<Mutex<Vec<LogEntry>>>) {
        let entries = Arc::new(Mutex::new(Vec::new()));
        (Self { entries: entries.clone() }, entries)
    }
}

impl Logger for TestLogger {
    fn log(&self, entry: &LogEntry) {
        self.entries.lock().unwrap().push(entry.clone());
    }
}

fn errors(entries: &Arc<Mutex<Vec<LogEntry>>>) -> Vec<LogEntry> {
    entries.lock().unwrap().iter()
        .filter(|e| e.severity == LogSeverity::Error)
        .cloned()
        .collect()
}

// ============================================================================
// LOGGING TESTS
// ============================================================================

#[test]
#[serial]
fn test_integration_custom_logger() {
    let (test_logger, entries) = TestLogger::new();
    Diagnostics::set_logger(test_logger);

    Diagnostics::log(LogSeverity::Info, "test::module", "Test info message".to_string());
    Diagnostics::log_detailed(LogSeverity::Error, "test::module", "Test error message".to_string(), "file.rs", 7);

    {
        let entries = entries.lock().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].severity, LogSeverity::Info);
        assert_eq!(entries[0].source, "test::module");
        assert_eq!(entries[0].file, None);
        assert_eq!(entries[1].file, Some("file.rs"));
        assert_eq!(entries[1].line, Some(7));
    }

    Diagnostics::reset_logger();
}

#[test]
#[serial]
fn test_integration_bounds_violation_is_logged() {
    let (test_logger, entries) = TestLogger::new();
    Diagnostics::set_logger(test_logger);

    let device = Arc::new(Mutex::new(HostDevice::new()));
    let mut cache = ConstantBufferCache::new(device).unwrap();
    let result = cache.write_constants(ShaderStage::Pixel, ShaderSlot::PerDraw, &[Register::ZERO; 3], 2, 4);
    assert!(result.is_err());

    let errors = errors(&entries);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].source, "cbcache::ConstantBufferCache");
    assert!(errors[0].message.contains("Pixel/PER_BATCH"));
    assert!(errors[0].file.is_some());
    assert!(errors[0].line.is_some());

    Diagnostics::reset_logger();
}

#[test]
#[serial]
fn test_integration_allocation_failure_is_logged() {
    let (test_logger, entries) = TestLogger::new();
    Diagnostics::set_logger(test_logger);

    let device = Arc::new(Mutex::new(HostDevice::new().with_memory_budget(0)));
    let mut cache = ConstantBufferCache::new(device).unwrap();
    assert!(cache.map_constant_buffer(ShaderStage::Geometry, ShaderSlot::PerPass, 2).is_err());

    let errors = errors(&entries);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].source, "cbcache::BufferPool");
    assert!(errors[0].message.contains("Geometry/PER_PASS"));
    assert!(errors[0].message.contains("32 bytes"));

    Diagnostics::reset_logger();
}

#[test]
#[serial]
fn test_integration_double_override_is_logged() {
    let (test_logger, entries) = TestLogger::new();
    Diagnostics::set_logger(test_logger);

    let device = Arc::new(Mutex::new(HostDevice::new()));
    let mut cache = ConstantBufferCache::new(device.clone()).unwrap();
    cache.map_constant_buffer(ShaderStage::Hull, ShaderSlot::PerView, 4).unwrap();
    let external = cache.entry(ShaderStage::Hull, ShaderSlot::PerView).bound_buffer().unwrap().clone();

    cache.begin_external_constant_buffer(ShaderStage::Hull, ShaderSlot::PerView, external.clone(), 4).unwrap();
    assert!(cache.begin_external_constant_buffer(ShaderStage::Hull, ShaderSlot::PerView, external, 4).is_err());

    let errors = errors(&entries);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].message.contains("already using external buffer"));

    Diagnostics::reset_logger();
}

#[test]
#[serial]
fn test_integration_end_external_without_override_warns() {
    let (test_logger, entries) = TestLogger::new();
    Diagnostics::set_logger(test_logger);

    let device = Arc::new(Mutex::new(HostDevice::new()));
    let mut cache = ConstantBufferCache::new(device).unwrap();
    cache.end_external_constant_buffer(ShaderStage::Domain, ShaderSlot::PerFrame);

    {
        let entries = entries.lock().unwrap();
        let warning = entries.iter().find(|e| e.severity == LogSeverity::Warn).unwrap();
        assert!(warning.message.contains("Domain/PER_FRAME"));
        assert!(!entries.iter().any(|e| e.severity == LogSeverity::Error));
    }

    Diagnostics::reset_logger();
}
