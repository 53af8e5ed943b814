//! Internal logging system for the constant buffer cache
//!
//! This module provides a flexible logging system with:
//! - Customizable logger via Logger trait
//! - Severity levels (Trace, Debug, Info, Warn, Error)
//! - Colored console output by default
//! - File and line information for ERROR logs
//!
//! The active logger is held by [`Diagnostics`](crate::diagnostics::Diagnostics).

use colored::*;
use std::fmt;
use std::time::SystemTime;
use chrono::{DateTime, Local};

/// Logger trait for custom logging implementations
///
/// Implement this trait to route cache diagnostics elsewhere (file, test capture, ...).
///
/// # Example
///
/// ```no_run
/// use constant_buffer_cache::cbcache::log::{Logger, LogEntry};
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
    /// Severity level (Trace, Debug, Info, Warn, Error)
    pub severity: LogSeverity,

    /// Timestamp when the log was created
    pub timestamp: SystemTime,

    /// Source module (e.g., "cbcache::ConstantBufferCache", "cbcache::HostDevice")
    pub source: String,

    /// Log message
    pub message: String,

    /// Source file (only for detailed ERROR logs)
    pub file: Option<&'static str>,

    /// Source line (only for detailed ERROR logs)
    pub line: Option<u32>,
}

/// Log severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogSeverity {
    /// Per-map / per-write tracing
    Trace,

    /// Buffer creation, resets
    Debug,

    /// Important informational messages
    Info,

    /// Degenerate requests that are tolerated
    Warn,

    /// Allocation failures, bounds and protocol violations (with file:line)
    Error,
}

/// Default logger implementation using colored console output
///
/// Format:
/// - Normal: `[timestamp] [SEVERITY] [source] message`
/// - Error: `[timestamp] [ERROR] [source] message (file:line)`
pub struct DefaultLogger;

impl DefaultLogger {
    /// Format an entry as a single line, without colors
    pub fn format_plain(entry: &LogEntry) -> String {
        Self::format_line(entry, severity_label(entry.severity), &entry.source)
    }

    fn format_line(entry: &LogEntry, severity: impl fmt::Display, source: impl fmt::Display) -> String {
        let datetime: DateTime<Local> = entry.timestamp.into();
        let timestamp = datetime.format("%Y-%m-%d %H:%M:%S%.3f");
        let mut line = format!("[{}] [{}] [{}] {}", timestamp, severity, source, entry.message);
        if let (Some(file), Some(number)) = (entry.file, entry.line) {
            line.push_str(&format!(" ({}:{})", file, number));
        }
        line
    }
}

/// Fixed-width severity label
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
        let label = severity_label(entry.severity);
        let severity = match entry.severity {
            LogSeverity::Trace => label.bright_black(),
            LogSeverity::Debug => label.cyan(),
            LogSeverity::Info => label.green(),
            LogSeverity::Warn => label.yellow(),
            LogSeverity::Error => label.red().bold(),
        };
        eprintln!("{}", Self::format_line(entry, severity, entry.source.bright_blue()));
    }
}

// ===== LOGGING MACROS =====

/// Log a TRACE message
///
/// ```no_run
/// constant_buffer_cache::rhi_trace!("cbcache::ConstantBufferCache", "map {:?}", 4);
/// ```
#[macro_export]
macro_rules! rhi_trace {
    ($source:expr, $($arg:tt)*) => {
        $crate::cbcache::Diagnostics::log(
            $crate::cbcache::log::LogSeverity::Trace,
            $source,
            format!($($arg)*)
        )
    };
}

/// Log a DEBUG message
#[macro_export]
macro_rules! rhi_debug {
    ($source:expr, $($arg:tt)*) => {
        $crate::cbcache::Diagnostics::log(
            $crate::cbcache::log::LogSeverity::Debug,
            $source,
            format!($($arg)*)
        )
    };
}

/// Log an INFO message
#[macro_export]
macro_rules! rhi_info {
    ($source:expr, $($arg:tt)*) => {
        $crate::cbcache::Diagnostics::log(
            $crate::cbcache::log::LogSeverity::Info,
            $source,
            format!($($arg)*)
        )
    };
}

/// Log a WARN message
#[macro_export]
macro_rules! rhi_warn {
    ($source:expr, $($arg:tt)*) => {
        $crate::cbcache::Diagnostics::log(
            $crate::cbcache::log::LogSeverity::Warn,
            $source,
            format!($($arg)*)
        )
    };
}

/// Log an ERROR message with file:line information
#[macro_export]
macro_rules! rhi_error {
    ($source:expr, $($arg:tt)*) => {
        $crate::cbcache::Diagnostics::log_detailed(
            $crate::cbcache::log::LogSeverity::Error,
            $source,
            format!($($arg)*),
            file!(),
            line!()
        )
    };
}

/// Log an ERROR message and build an `Error::BackendError` from it
///
/// ```no_run
/// # use constant_buffer_cache::{cbcache::Error, rhi_err};
/// let err: Error = rhi_err!("cbcache::HostDevice", "device lost");
/// ```
#[macro_export]
macro_rules! rhi_err {
    ($source:expr, $($arg:tt)*) => {{
        let message = format!($($arg)*);
        $crate::cbcache::Diagnostics::log_detailed(
            $crate::cbcache::log::LogSeverity::Error,
            $source,
            message.clone(),
            file!(),
            line!()
        );
        $crate::cbcache::Error::BackendError(message)
    }};
}

/// Log an ERROR message and build the named `Error` variant from it
///
/// ```no_run
/// # use constant_buffer_cache::{cbcache::Error, rhi_fail};
/// let err: Error = rhi_fail!("cbcache::ConstantBufferCache", OutOfBounds, "{} > {}", 5, 4);
/// ```
#[macro_export]
macro_rules! rhi_fail {
    ($source:expr, $variant:ident, $($arg:tt)*) => {{
        let message = format!($($arg)*);
        $crate::cbcache::Diagnostics::log_detailed(
            $crate::cbcache::log::LogSeverity::Error,
            $source,
            message.clone(),
            file!(),
            line!()
        );
        $crate::cbcache::Error::$variant(message)
    }};
}

/// Log an ERROR message and return `Err(Error::BackendError)` from the enclosing function
#[macro_export]
macro_rules! rhi_bail {
    ($source:expr, $($arg:tt)*) => {
        return Err($crate::rhi_err!($source, $($arg)*))
    };
}

#[cfg(test)]
#[path = "log_tests.rs"]
mod tests;
