//! Mock device implementations for testing and development.
//!
//! This module provides simulated peripherals that can be controlled
//! programmatically without requiring the lock hardware.

pub mod buzzer;
pub mod eeprom;
pub mod jumpers;
pub mod lock;
pub mod reader;

use std::sync::{Mutex, MutexGuard, PoisonError};

// Re-export commonly used types
pub use buzzer::{BuzzerEvent, MockBuzzer};
pub use eeprom::{MemoryEeprom, WriteFault};
pub use jumpers::MockJumpers;
pub use lock::MockLock;
pub use reader::{
    MockKeyReader, MockKeyReaderHandle, MockWakeLine, token_with_serial, valid_token,
};

/// Lock shared mock state, recovering the data if a test thread panicked
/// while holding it.
pub(crate) fn lock_shared<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
