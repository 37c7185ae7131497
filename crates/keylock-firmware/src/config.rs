//! Controller timing and tone configuration.
//!
//! Every field defaults to the firmware's built-in value, so a partial JSON
//! document only overrides what it names.
//!
//! # Examples
//!
//! ```
//! use keylock_firmware::FirmwareConfig;
//! use std::time::Duration;
//!
//! let config = FirmwareConfig::default();
//! assert_eq!(config.cooldown(), Duration::from_millis(1000));
//! assert!(config.validate().is_ok());
//! ```

use std::time::Duration;

use keylock_core::{
    Error, Result,
    constants::{
        DEFAULT_COOLDOWN_MS, DEFAULT_PULSE_DURATION_MS, DEFAULT_SETTLE_DELAY_MS, HIGH_TONE_HZ,
        LOW_TONE_HZ, MODE_BEEP_HZ, MODE_BEEP_OFF_MS, MODE_BEEP_ON_MS, STARTUP_TONE_HZ,
        STARTUP_TONE_MS,
    },
};
use serde::{Deserialize, Serialize};

/// Fixed delays and buzzer tones used by the controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FirmwareConfig {
    /// Delay after wake before touching the reader bus.
    pub settle_delay_ms: u64,

    /// How long a relay pair stays energized to move the lock.
    pub pulse_duration_ms: u64,

    /// How long the outcome tone is held. Spans the reader's repeated
    /// transmissions of one presentation.
    pub cooldown_ms: u64,

    pub high_tone_hz: u16,
    pub low_tone_hz: u16,

    pub mode_beep_hz: u16,
    pub mode_beep_on_ms: u64,
    pub mode_beep_off_ms: u64,

    pub startup_tone_hz: u16,
    pub startup_tone_ms: u64,
}

impl Default for FirmwareConfig {
    fn default() -> Self {
        Self {
            settle_delay_ms: DEFAULT_SETTLE_DELAY_MS,
            pulse_duration_ms: DEFAULT_PULSE_DURATION_MS,
            cooldown_ms: DEFAULT_COOLDOWN_MS,
            high_tone_hz: HIGH_TONE_HZ,
            low_tone_hz: LOW_TONE_HZ,
            mode_beep_hz: MODE_BEEP_HZ,
            mode_beep_on_ms: MODE_BEEP_ON_MS,
            mode_beep_off_ms: MODE_BEEP_OFF_MS,
            startup_tone_hz: STARTUP_TONE_HZ,
            startup_tone_ms: STARTUP_TONE_MS,
        }
    }
}

impl FirmwareConfig {
    /// Check that every delay and frequency is non-zero.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` naming the first zero field.
    pub fn validate(&self) -> Result<()> {
        let durations = [
            ("settle_delay_ms", self.settle_delay_ms),
            ("pulse_duration_ms", self.pulse_duration_ms),
            ("cooldown_ms", self.cooldown_ms),
            ("mode_beep_on_ms", self.mode_beep_on_ms),
            ("mode_beep_off_ms", self.mode_beep_off_ms),
            ("startup_tone_ms", self.startup_tone_ms),
        ];
        let tones = [
            ("high_tone_hz", self.high_tone_hz),
            ("low_tone_hz", self.low_tone_hz),
            ("mode_beep_hz", self.mode_beep_hz),
            ("startup_tone_hz", self.startup_tone_hz),
        ];

        if let Some((name, _)) = durations.iter().find(|(_, ms)| *ms == 0) {
            return Err(Error::Config(format!("{} must be greater than zero", name)));
        }
        if let Some((name, _)) = tones.iter().find(|(_, hz)| *hz == 0) {
            return Err(Error::Config(format!("{} must be greater than zero", name)));
        }
        Ok(())
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn pulse_duration(&self) -> Duration {
        Duration::from_millis(self.pulse_duration_ms)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    pub fn mode_beep_on(&self) -> Duration {
        Duration::from_millis(self.mode_beep_on_ms)
    }

    pub fn mode_beep_off(&self) -> Duration {
        Duration::from_millis(self.mode_beep_off_ms)
    }

    pub fn startup_tone(&self) -> Duration {
        Duration::from_millis(self.startup_tone_ms)
    }
}
