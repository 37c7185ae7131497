//! Audible feedback.
//!
//! The buzzer is the only user-facing output. Cues, in the order a cycle
//! can produce them:
//!
//! - startup chirp: one short tone at power-on
//! - mode announcement: one short beep per mode number (none for Normal)
//! - outcome: high tone on success, low tone on failure, held for the
//!   cooldown

use std::time::Duration;

use keylock_core::Mode;
use keylock_hardware::{Buzzer, Result};
use tokio::time::sleep;

use crate::config::FirmwareConfig;

/// Plays the controller's audio cues.
///
/// Every cue blocks until it has finished playing and the buzzer is silent.
#[derive(Debug)]
pub struct FeedbackSignaler<Z> {
    buzzer: Z,
    startup: Cue,
    beep: Cue,
    beep_gap: Duration,
    high_tone_hz: u16,
    low_tone_hz: u16,
    cooldown: Duration,
}

/// A tone and how long it plays.
#[derive(Debug, Clone, Copy)]
struct Cue {
    hz: u16,
    length: Duration,
}

impl<Z: Buzzer> FeedbackSignaler<Z> {
    pub fn new(buzzer: Z, config: &FirmwareConfig) -> Self {
        Self {
            buzzer,
            startup: Cue {
                hz: config.startup_tone_hz,
                length: config.startup_tone(),
            },
            beep: Cue {
                hz: config.mode_beep_hz,
                length: config.mode_beep_on(),
            },
            beep_gap: config.mode_beep_off(),
            high_tone_hz: config.high_tone_hz,
            low_tone_hz: config.low_tone_hz,
            cooldown: config.cooldown(),
        }
    }

    /// Short power-on tone.
    pub async fn startup_chirp(&mut self) -> Result<()> {
        self.play(self.startup).await
    }

    /// Beep once per mode number.
    pub async fn announce_mode(&mut self, mode: Mode) -> Result<()> {
        for _ in 0..mode.beep_count() {
            self.play(self.beep).await?;
            sleep(self.beep_gap).await;
        }
        Ok(())
    }

    /// Hold the high or low tone for the cooldown, then go silent.
    pub async fn announce_outcome(&mut self, success: bool) -> Result<()> {
        let hz = if success {
            self.high_tone_hz
        } else {
            self.low_tone_hz
        };

        self.play(Cue {
            hz,
            length: self.cooldown,
        })
        .await
    }

    /// Wait out the cooldown without a tone.
    pub async fn cooldown(&mut self) {
        sleep(self.cooldown).await;
    }

    async fn play(&mut self, cue: Cue) -> Result<()> {
        self.buzzer.tone(cue.hz)?;
        sleep(cue.length).await;
        self.buzzer.silence()
    }
}
