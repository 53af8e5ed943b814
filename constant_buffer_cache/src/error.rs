//! Error types for the constant buffer cache
//!
//! This module defines the error types used by the cache and its device
//! collaborators: device failures, allocation failures, bounds violations
//! and protocol misuse.

use std::fmt;

/// Result type for cache and device operations
pub type Result<T> = std::result::Result<T, Error>;

/// Constant buffer cache errors
#[derive(Debug, Clone)]
pub enum Error {
    /// Backend-specific error (device, mapping, lock poisoning)
    BackendError(String),

    /// Out of GPU memory
    OutOfMemory,

    /// Invalid resource (buffer, stage, slot)
    InvalidResource(String),

    /// Initialization failed (cache construction, device capabilities)
    InitializationFailed(String),

    /// The device could not create a constant buffer for a slot
    AllocationFailed(String),

    /// A register write range exceeds the mapped capacity
    OutOfBounds(String),

    /// Programmer error in the map/commit/override protocol
    ProtocolViolation(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::OutOfMemory => write!(f, "Out of GPU memory"),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            Error::AllocationFailed(msg) => write!(f, "Allocation failed: {}", msg),
            Error::OutOfBounds(msg) => write!(f, "Out of bounds: {}", msg),
            Error::ProtocolViolation(msg) => write!(f, "Protocol violation: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
