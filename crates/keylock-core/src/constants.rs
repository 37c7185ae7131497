//! Core constants for the keylock controller.
//!
//! This module defines the fixed values shared by every keylock crate: the
//! key frame shape, the EEPROM layout of the key registry and the default
//! timings and tones of the control loop.
//!
//! # EEPROM Layout
//!
//! The registry lives in a flat, byte-addressed 512-byte region:
//!
//! ```text
//! 0x000                              0x050                 0x1FF
//! ┌──────────────────────────────────┬─────────────────────┬─────┐
//! │ key array (MAX_KEYS × KEY_LENGTH) │ unused              │ cnt │
//! └──────────────────────────────────┴─────────────────────┴─────┘
//! ```
//!
//! The array is always written in full, independent of the live count. Only
//! slots below the count byte are ever treated as valid keys.
//!
//! # Usage
//!
//! ```
//! use keylock_core::constants::*;
//!
//! assert_eq!(KEY_ARRAY_SIZE, 80);
//! assert!(KEY_ARRAY_ADDR as usize + KEY_ARRAY_SIZE <= KEY_COUNT_ADDR as usize);
//! ```

// ============================================================================
// Key Frame
// ============================================================================

/// Length of a key frame in bytes (family + 6 serial bytes + checksum).
pub const KEY_LENGTH: usize = 8;

/// Family code every accepted key frame must start with.
pub const KEY_FAMILY: u8 = 0x01;

/// Number of leading frame bytes covered by the checksum.
pub const KEY_PAYLOAD_LENGTH: usize = KEY_LENGTH - 1;

/// Command sent on the single-wire bus to read a presented key.
pub const READ_KEY_COMMAND: u8 = 0x33;

// ============================================================================
// Key Registry
// ============================================================================

/// Maximum number of keys the registry can hold.
pub const MAX_KEYS: usize = 10;

/// Size of the persisted key array in bytes.
pub const KEY_ARRAY_SIZE: usize = MAX_KEYS * KEY_LENGTH;

// ============================================================================
// EEPROM Layout
// ============================================================================

/// Total size of the EEPROM region in bytes.
pub const EEPROM_SIZE: usize = 512;

/// Start address of the persisted key array.
pub const KEY_ARRAY_ADDR: u16 = 0;

/// Address of the persisted key count byte (last byte of the region).
pub const KEY_COUNT_ADDR: u16 = (EEPROM_SIZE - 1) as u16;

/// Value of every byte in a factory-fresh EEPROM.
pub const ERASED_BYTE: u8 = 0xFF;

// ============================================================================
// Control Loop Timing (milliseconds)
// ============================================================================

/// Delay after waking to let the signal lines settle.
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 50;

/// How long the relay pair stays energized to move the lock.
pub const DEFAULT_PULSE_DURATION_MS: u64 = 500;

/// Outcome tone length; outlasts the reader re-sending the same key.
pub const DEFAULT_COOLDOWN_MS: u64 = 1000;

// ============================================================================
// Audio Feedback
// ============================================================================

/// Tone played when an operation succeeds.
pub const HIGH_TONE_HZ: u16 = 2000;

/// Tone played when an operation fails.
pub const LOW_TONE_HZ: u16 = 200;

/// Tone of each mode announcement pulse.
pub const MODE_BEEP_HZ: u16 = 1000;

/// Sounding part of a mode announcement pulse.
pub const MODE_BEEP_ON_MS: u64 = 50;

/// Silent part of a mode announcement pulse.
pub const MODE_BEEP_OFF_MS: u64 = 50;

/// Tone of the power-on chirp.
pub const STARTUP_TONE_HZ: u16 = 500;

/// Length of the power-on chirp.
pub const STARTUP_TONE_MS: u64 = 50;
