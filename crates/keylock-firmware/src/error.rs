//! Error types for the controller.

use keylock_hardware::HardwareError;
use keylock_storage::StorageError;
use thiserror::Error;

/// Result type alias for controller operations.
pub type Result<T> = std::result::Result<T, FirmwareError>;

/// Errors raised while booting or cycling the controller.
///
/// Only boot errors are fatal. Inside the main loop an error abandons the
/// current cycle and the controller goes back to sleep.
#[derive(Debug, Error)]
pub enum FirmwareError {
    /// A peripheral failed.
    #[error("Hardware error: {0}")]
    Hardware(#[from] HardwareError),

    /// The key registry failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Invalid configuration or state transition.
    #[error(transparent)]
    Core(#[from] keylock_core::Error),

    /// The wake source is gone; no further cycle can start.
    #[error("Wake source closed: {0}")]
    WakeSourceClosed(HardwareError),
}

impl FirmwareError {
    /// Returns `true` if the main loop cannot continue.
    pub fn is_terminal(&self) -> bool {
        matches!(self, FirmwareError::WakeSourceClosed(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_wake_loss_is_terminal() {
        assert!(FirmwareError::WakeSourceClosed(HardwareError::disconnected("wake")).is_terminal());
        assert!(!FirmwareError::Hardware(HardwareError::disconnected("bus")).is_terminal());
        assert!(!FirmwareError::Storage(StorageError::NotFound).is_terminal());
    }

    #[test]
    fn test_core_errors_are_transparent() {
        let error = FirmwareError::from(keylock_core::Error::Config("zero cooldown".into()));
        assert_eq!(error.to_string(), "Configuration error: zero cooldown");
    }
}
