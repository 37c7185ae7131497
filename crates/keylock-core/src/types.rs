use crate::{
    Result,
    constants::{KEY_FAMILY, KEY_LENGTH, KEY_PAYLOAD_LENGTH},
    error::{Error, FrameError},
};
use serde::{Deserialize, Serialize};
use std::fmt;
use subtle::ConstantTimeEq;

/// Key token read from a single-wire key (8 bytes).
///
/// Byte 0 is the family code, bytes 1-6 the serial number and byte 7 the
/// checksum over bytes 0-6. A token is only built from a reader frame after
/// [`KeyToken::from_frame`] has checked both family and checksum.
///
/// # Security
/// This type implements constant-time comparison so that looking a key up in
/// the registry takes the same time wherever two tokens differ.
#[derive(Debug, Clone, Copy, Eq, Serialize, Deserialize)]
pub struct KeyToken([u8; KEY_LENGTH]);

impl KeyToken {
    /// All-zero token, the content of a cleared registry slot.
    pub const ZERO: KeyToken = KeyToken([0; KEY_LENGTH]);

    /// Wrap raw bytes without any frame validation.
    ///
    /// Used for bytes that come from storage, where validity is governed by
    /// the registry count rather than by the frame rules.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; KEY_LENGTH]) -> Self {
        KeyToken(bytes)
    }

    /// Validate a frame read from the key reader.
    ///
    /// `computed_checksum` is the reader's checksum over the first seven
    /// frame bytes.
    ///
    /// # Errors
    /// Returns `FrameError::WrongFamily` if byte 0 is not [`KEY_FAMILY`], or
    /// `FrameError::ChecksumMismatch` if byte 7 differs from `computed_checksum`.
    ///
    /// # Examples
    ///
    /// ```
    /// use keylock_core::KeyToken;
    ///
    /// let frame = [0x01, 0x10, 0x20, 0x30, 0x40, 0x50, 0x60, 0x9C];
    /// assert!(KeyToken::from_frame(frame, 0x9C).is_ok());
    /// assert!(KeyToken::from_frame(frame, 0x9D).is_err());
    /// ```
    pub fn from_frame(
        frame: [u8; KEY_LENGTH],
        computed_checksum: u8,
    ) -> std::result::Result<Self, FrameError> {
        if frame[0] != KEY_FAMILY {
            return Err(FrameError::WrongFamily {
                expected: KEY_FAMILY,
                found: frame[0],
            });
        }

        let actual = frame[KEY_LENGTH - 1];
        if actual != computed_checksum {
            return Err(FrameError::ChecksumMismatch {
                expected: computed_checksum,
                actual,
            });
        }

        Ok(KeyToken(frame))
    }

    /// Get the raw token bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; KEY_LENGTH] {
        &self.0
    }

    /// Bytes covered by the checksum (family and serial number).
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.0[..KEY_PAYLOAD_LENGTH]
    }

    /// Family code (byte 0).
    #[must_use]
    pub fn family(&self) -> u8 {
        self.0[0]
    }

    /// Returns `true` for the all-zero token of a cleared slot.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.ct_eq_token(&Self::ZERO)
    }

    fn ct_eq_token(&self, other: &Self) -> bool {
        self.0.ct_eq(&other.0).into()
    }
}

impl Default for KeyToken {
    fn default() -> Self {
        Self::ZERO
    }
}

/// Constant-time comparison implementation for KeyToken
impl PartialEq for KeyToken {
    fn eq(&self, other: &Self) -> bool {
        self.ct_eq_token(other)
    }
}

impl std::hash::Hash for KeyToken {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl From<[u8; KEY_LENGTH]> for KeyToken {
    fn from(bytes: [u8; KEY_LENGTH]) -> Self {
        KeyToken(bytes)
    }
}

/// Space-separated upper-case hex, e.g. `01 A2 33 00 00 00 00 5C`.
impl fmt::Display for KeyToken {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (i, byte) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{byte:02X}")?;
        }
        Ok(())
    }
}

impl std::str::FromStr for KeyToken {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let digits = strip_separators(s);
        let mut bytes = [0u8; KEY_LENGTH];
        hex::decode_to_slice(&digits, &mut bytes).map_err(|e| match e {
            hex::FromHexError::InvalidStringLength => Error::InvalidToken {
                message: format!(
                    "expected {KEY_LENGTH} bytes, got {} hex digits",
                    digits.len()
                ),
            },
            e => invalid_hex(s, e),
        })?;
        Ok(KeyToken(bytes))
    }
}

/// Decode a hex string into bytes.
///
/// Spaces, colons and dashes between bytes are ignored, so `01:A2:33`,
/// `01 a2 33` and `01A233` all decode to the same three bytes.
///
/// # Errors
/// Returns `Error::InvalidToken` on an odd digit count or a non-hex character.
pub fn decode_hex(s: &str) -> Result<Vec<u8>> {
    hex::decode(strip_separators(s)).map_err(|e| invalid_hex(s, e))
}

fn strip_separators(s: &str) -> String {
    s.chars()
        .filter(|c| !matches!(c, ' ' | ':' | '-'))
        .collect()
}

fn invalid_hex(s: &str, e: hex::FromHexError) -> Error {
    Error::InvalidToken {
        message: format!("invalid hex '{s}': {e}"),
    }
}

/// Operating mode, resolved once per power-on from the configuration jumpers.
///
/// The numeric value is also the number of beeps used to announce the mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Mode {
    /// Registered keys toggle the lock.
    Normal = 0,
    /// Presented keys are added to the registry.
    Add = 1,
    /// Presented keys are removed from the registry.
    Remove = 2,
    /// Reserved; keys are read but nothing is dispatched.
    Unused = 3,
    /// The registry is cleared at boot.
    Wipe = 4,
}

impl Mode {
    /// Create a mode from its numeric code.
    ///
    /// # Errors
    /// Returns `Error::InvalidMode` if the value is greater than 4.
    #[inline]
    pub fn from_u8(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Mode::Normal),
            1 => Ok(Mode::Add),
            2 => Ok(Mode::Remove),
            3 => Ok(Mode::Unused),
            4 => Ok(Mode::Wipe),
            _ => Err(Error::InvalidMode { code: value }),
        }
    }

    /// Convert the mode to its numeric code.
    #[inline]
    #[must_use]
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Number of short pulses that announce this mode.
    #[inline]
    #[must_use]
    pub fn beep_count(self) -> u8 {
        self.to_u8()
    }

    /// Returns `true` if a key presentation in this mode produces an outcome tone.
    #[inline]
    #[must_use]
    pub fn reports_outcome(self) -> bool {
        matches!(self, Mode::Normal | Mode::Add | Mode::Remove)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Mode::Normal => write!(f, "Normal"),
            Mode::Add => write!(f, "Add"),
            Mode::Remove => write!(f, "Remove"),
            Mode::Unused => write!(f, "Unused"),
            Mode::Wipe => write!(f, "Wipe"),
        }
    }
}

/// Physical lock state as reported by the lock sensor.
///
/// Never stored: always read live from the sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockState {
    Closed,
    Opened,
}

impl LockState {
    /// Map the raw sensor level (`true` = opened) to a lock state.
    #[inline]
    #[must_use]
    pub fn from_sensor(opened: bool) -> Self {
        if opened {
            LockState::Opened
        } else {
            LockState::Closed
        }
    }

    /// Returns `true` if the lock is opened.
    #[inline]
    #[must_use]
    pub fn is_opened(self) -> bool {
        matches!(self, LockState::Opened)
    }

    /// Direction that moves the lock out of this state.
    #[inline]
    #[must_use]
    pub fn toggle_direction(self) -> Direction {
        match self {
            LockState::Opened => Direction::Close,
            LockState::Closed => Direction::Open,
        }
    }
}

impl fmt::Display for LockState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LockState::Closed => write!(f, "Closed"),
            LockState::Opened => write!(f, "Opened"),
        }
    }
}

/// Lock movement direction, selecting which relay pair is pulsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Open,
    Close,
}

impl Direction {
    /// State the lock should report after a successful move.
    #[inline]
    #[must_use]
    pub fn target_state(self) -> LockState {
        match self {
            Direction::Open => LockState::Opened,
            Direction::Close => LockState::Closed,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Direction::Open => write!(f, "Open"),
            Direction::Close => write!(f, "Close"),
        }
    }
}
