//! Storage layer for the keylock controller.
//!
//! This crate owns the authorized-key registry and its EEPROM layout. The
//! registry is the only writer of the EEPROM; everything else reads keys
//! through it.
//!
//! # Architecture
//!
//! - [`KeyRegistry`] - Bounded, insertion-ordered key set mirrored in EEPROM
//! - [`FileEeprom`] - [`Eeprom`](keylock_hardware::Eeprom) backed by an image file
//! - [`StorageError`] - Rejections (duplicate, full, not found) and medium failures
//!
//! # EEPROM Layout
//!
//! | Address   | Size | Content                          |
//! |-----------|------|----------------------------------|
//! | 0..80     | 80   | Ten 8-byte key slots, in order   |
//! | 80..511   |      | Unused                           |
//! | 511       | 1    | Live key count (0..=10)          |
//!
//! A count above 10 (including the 0xFF of a factory-fresh part) is treated
//! as corruption and triggers a wipe on load.
//!
//! # Examples
//!
//! ```no_run
//! use keylock_storage::{FileEeprom, FileEepromConfig, KeyRegistry, StorageError};
//! use keylock_hardware::mock::token_with_serial;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let eeprom = FileEeprom::open(FileEepromConfig::new("lock.eeprom"))?;
//! let mut registry = KeyRegistry::new(eeprom)?;
//! registry.load()?;
//!
//! let key = token_with_serial([0x10, 0x20, 0x30, 0x40, 0x50, 0x60]);
//! match registry.add(key) {
//!     Ok(()) => println!("Added {}", key),
//!     Err(StorageError::Duplicate) => println!("Already registered"),
//!     Err(e) => return Err(e.into()),
//! }
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod file;
pub mod registry;

pub use error::{StorageError, StorageResult};
pub use file::{FileEeprom, FileEepromConfig};
pub use registry::{KeyRegistry, LoadStatus};
