//! Hardware collaborator layer for the keylock controller.
//!
//! This crate provides trait-based abstractions for every peripheral the
//! lock controller talks to, so the controller logic can run against real
//! drivers or against the mocks in [`mock`] without change.
//!
//! # Design Philosophy
//!
//! - **Async where time passes**: reader bus transfers and waiting for the
//!   wake signal are native `async fn` in traits (Rust 1.90 + Edition 2024
//!   RPITIT). Pin reads and EEPROM access are synchronous.
//! - **Generic, not dynamic**: the async traits are not object-safe; the
//!   controller is generic over its peripherals.
//! - **Error-aware**: every operation returns [`Result<T>`][error::Result]
//!   with a [`HardwareError`].
//!
//! # Collaborators
//!
//! | Trait | Hardware |
//! |---|---|
//! | [`KeyReader`] | single-wire key reader bus |
//! | [`Eeprom`] | byte-addressed non-volatile storage |
//! | [`ConfigInputs`] | two boot-time configuration jumpers |
//! | [`LockSensor`] | lock position switch |
//! | [`RelayBank`] | open and close relay pairs |
//! | [`Buzzer`] | piezo buzzer |
//! | [`WakeSource`] | low-power sleep ended by reader line activity |
//!
//! # Example
//!
//! ```no_run
//! use keylock_hardware::traits::{KeyReader, WakeSource};
//! use keylock_hardware::error::Result;
//!
//! async fn wait_for_key<W: WakeSource, R: KeyReader>(wake: &mut W, reader: &mut R) -> Result<bool> {
//!     wake.sleep_until_wake().await?;
//!     reader.reset().await
//! }
//! ```
//!
//! [`KeyReader`]: traits::KeyReader
//! [`Eeprom`]: traits::Eeprom
//! [`ConfigInputs`]: traits::ConfigInputs
//! [`LockSensor`]: traits::LockSensor
//! [`RelayBank`]: traits::RelayBank
//! [`Buzzer`]: traits::Buzzer
//! [`WakeSource`]: traits::WakeSource

pub mod crc;
pub mod error;
pub mod mock;
pub mod traits;

// Re-export commonly used types for convenience
pub use error::{HardwareError, Result};
pub use traits::{Buzzer, ConfigInputs, Eeprom, KeyReader, LockSensor, RelayBank, WakeSource};
