use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    // Key errors
    #[error("Invalid key token: {message}")]
    InvalidToken { message: String },

    #[error("Invalid key frame: {0}")]
    Frame(#[from] FrameError),

    // Mode errors
    #[error("Invalid operating mode code: {code}")]
    InvalidMode { code: u8 },

    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Reasons a frame read from the key reader is not trusted.
///
/// These are reader noise, never user actions: the controller discards the
/// frame without any audible feedback.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    #[error("wrong family code: expected 0x{expected:02X}, got 0x{found:02X}")]
    WrongFamily { expected: u8, found: u8 },

    #[error("checksum mismatch: expected 0x{expected:02X}, got 0x{actual:02X}")]
    ChecksumMismatch { expected: u8, actual: u8 },
}

pub type Result<T> = std::result::Result<T, Error>;
