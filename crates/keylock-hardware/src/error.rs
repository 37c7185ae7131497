//! Error types for hardware operations.
//!
//! This module defines error types for the peripheral collaborators of the
//! lock controller: the key reader bus, the EEPROM, the digital inputs and
//! outputs and the wake line.

/// Result type alias for hardware operations.
pub type Result<T> = std::result::Result<T, HardwareError>;

/// Errors that can occur during hardware device operations.
#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    /// Device is not connected or has been disconnected.
    #[error("Device disconnected: {device}")]
    Disconnected { device: String },

    /// Access outside the addressable EEPROM region.
    #[error("EEPROM access out of range: {len} bytes at 0x{addr:03X} (capacity {capacity})")]
    AddressOutOfRange {
        addr: u16,
        len: usize,
        capacity: usize,
    },

    /// Pin could not be read or driven.
    #[error("Pin error: {message}")]
    PinError { message: String },

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with custom message.
    #[error("{0}")]
    Other(String),
}

impl HardwareError {
    /// Create a new disconnected error.
    pub fn disconnected(device: impl Into<String>) -> Self {
        Self::Disconnected {
            device: device.into(),
        }
    }

    /// Create a new out-of-range error.
    pub fn out_of_range(addr: u16, len: usize, capacity: usize) -> Self {
        Self::AddressOutOfRange {
            addr,
            len,
            capacity,
        }
    }

    /// Create a new pin error.
    pub fn pin(message: impl Into<String>) -> Self {
        Self::PinError {
            message: message.into(),
        }
    }

    /// Create a generic error with custom message.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }
}
