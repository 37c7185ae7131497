//! Hardware collaborator trait definitions.
//!
//! This module defines the contract between the lock controller and its
//! peripherals: the single-wire key reader, the EEPROM, the configuration
//! jumpers, the lock sensor, the relay bank, the buzzer and the wake line.
//! Each trait can be backed by a real driver or by the mocks in
//! [`crate::mock`].
//!
//! Operations that take bus time or block until an external event (reader
//! transfers, waiting for wake) use native `async fn` methods (Rust 1.90 +
//! Edition 2024 RPITIT). Pin reads and EEPROM access complete immediately
//! and are plain synchronous methods.

#![allow(async_fn_in_trait)]

use keylock_core::{Direction, LockState};

use crate::error::Result;

/// Single-wire key reader bus.
///
/// The electrical protocol (reset pulse, bit timing) is the driver's
/// concern. The controller only sequences reset, command and byte reads.
///
/// # Object Safety
///
/// **NOTE**: This trait is NOT object-safe because `async fn` methods return
/// `impl Future`. Use generic type parameters:
///
/// ```no_run
/// use keylock_hardware::traits::KeyReader;
/// use keylock_hardware::error::Result;
///
/// async fn key_present<R: KeyReader>(reader: &mut R) -> Result<bool> {
///     reader.reset().await
/// }
/// ```
pub trait KeyReader: Send + Sync {
    /// Issue a bus reset.
    ///
    /// Returns `true` if a device answered with a presence pulse.
    ///
    /// # Errors
    ///
    /// Returns an error if the bus cannot be driven.
    async fn reset(&mut self) -> Result<bool>;

    /// Send a one-byte command to the device.
    ///
    /// # Errors
    ///
    /// Returns an error if the bus cannot be driven.
    async fn write_command(&mut self, command: u8) -> Result<()>;

    /// Read the next byte from the device.
    ///
    /// # Errors
    ///
    /// Returns an error if the bus cannot be sampled.
    async fn read_byte(&mut self) -> Result<u8>;

    /// Checksum the device family uses to protect its frames.
    fn checksum(&self, bytes: &[u8]) -> u8;
}

/// Byte-addressed non-volatile storage.
///
/// All writes are synchronous: once a write method returns, the data is
/// persisted.
pub trait Eeprom: Send + Sync {
    /// Size of the addressable region in bytes.
    fn capacity(&self) -> usize;

    /// Read the byte at `addr`.
    ///
    /// # Errors
    ///
    /// Returns `HardwareError::AddressOutOfRange` if `addr` is past the end.
    fn read_byte(&self, addr: u16) -> Result<u8>;

    /// Write `value` at `addr`.
    ///
    /// # Errors
    ///
    /// Returns `HardwareError::AddressOutOfRange` if `addr` is past the end,
    /// or an I/O error from the backing medium.
    fn write_byte(&mut self, addr: u16, value: u8) -> Result<()>;

    /// Fill `buf` with the bytes starting at `addr`.
    ///
    /// # Errors
    ///
    /// Returns `HardwareError::AddressOutOfRange` if the block does not fit.
    fn read_block(&self, addr: u16, buf: &mut [u8]) -> Result<()>;

    /// Write `bytes` starting at `addr`.
    ///
    /// # Errors
    ///
    /// Returns `HardwareError::AddressOutOfRange` if the block does not fit,
    /// or an I/O error from the backing medium.
    fn write_block(&mut self, addr: u16, bytes: &[u8]) -> Result<()>;
}

/// The two boot-time configuration jumper inputs (JP1 = A, JP2 = B).
///
/// Both are pulled up; a jumper to ground asserts the input.
pub trait ConfigInputs: Send + Sync {
    /// Returns `true` if input A reads low.
    fn a_asserted(&mut self) -> Result<bool>;

    /// Returns `true` if input B reads low.
    fn b_asserted(&mut self) -> Result<bool>;

    /// Reconfigure input A as an output and drive it low.
    ///
    /// Used once at boot to detect a jumper bridging A and B.
    fn drive_a_low(&mut self) -> Result<()>;
}

/// Lock position sensor.
pub trait LockSensor: Send + Sync {
    /// Read the current physical lock state.
    fn read_state(&mut self) -> Result<LockState>;
}

/// Relay outputs driving the lock: one pair per direction.
pub trait RelayBank: Send + Sync {
    /// Energize or release both relays of the pair for `direction`.
    fn set_pair(&mut self, direction: Direction, energized: bool) -> Result<()>;
}

/// Piezo buzzer.
pub trait Buzzer: Send + Sync {
    /// Start a continuous tone at `frequency_hz`.
    fn tone(&mut self, frequency_hz: u16) -> Result<()>;

    /// Stop any tone.
    fn silence(&mut self) -> Result<()>;
}

/// Low-power sleep primitive woken by activity on the reader data line.
///
/// The wake event carries no payload and touches no shared state: it only
/// ends the sleep.
pub trait WakeSource: Send + Sync {
    /// Sleep until the next external wake signal.
    ///
    /// # Errors
    ///
    /// Returns `HardwareError::Disconnected` if no further wake signal can
    /// ever arrive.
    async fn sleep_until_wake(&mut self) -> Result<()>;
}
