use keylock_hardware::HardwareError;
use thiserror::Error;

/// Storage-specific error types for the keylock registry.
///
/// The first three variants are rejections: the operation was refused and
/// neither memory nor EEPROM changed. The rest are failures of the storage
/// medium itself.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Key is already registered
    #[error("Key already registered")]
    Duplicate,

    /// Registry holds its maximum number of keys
    #[error("Registry full ({capacity} keys)")]
    Full { capacity: usize },

    /// Key is not registered
    #[error("Key not registered")]
    NotFound,

    /// EEPROM read or write failed
    #[error("EEPROM error: {0}")]
    Hardware(#[from] HardwareError),

    /// EEPROM region too small for the registry layout
    #[error("EEPROM too small: need {required} bytes, have {available}")]
    Layout { required: usize, available: usize },
}

impl StorageError {
    /// Returns `true` if the operation was refused without touching storage.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            StorageError::Duplicate | StorageError::Full { .. } | StorageError::NotFound
        )
    }
}

/// Specialized result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
