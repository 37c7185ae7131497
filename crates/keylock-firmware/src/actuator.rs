//! Lock actuation.

use std::time::Duration;

use keylock_core::{Direction, LockState};
use keylock_hardware::{LockSensor, RelayBank, Result};
use tokio::time::sleep;
use tracing::trace;

/// Drives the bistable lock through its relay pairs and reads its sensor.
///
/// A move is a single fixed-length pulse on one relay pair. The actuator
/// does not check where the lock ended up; callers compare sensor readings
/// before and after.
#[derive(Debug)]
pub struct LockActuator<B, S> {
    relays: B,
    sensor: S,
    pulse: Duration,
}

impl<B: RelayBank, S: LockSensor> LockActuator<B, S> {
    pub fn new(relays: B, sensor: S, pulse: Duration) -> Self {
        Self {
            relays,
            sensor,
            pulse,
        }
    }

    /// Energize the pair for `direction`, hold for the pulse duration, then
    /// release it.
    ///
    /// # Errors
    ///
    /// Returns an error if a relay cannot be driven.
    pub async fn move_lock(&mut self, direction: Direction) -> Result<()> {
        trace!(%direction, pulse_ms = self.pulse.as_millis() as u64, "Pulsing lock");

        self.relays.set_pair(direction, true)?;
        sleep(self.pulse).await;

        self.relays.set_pair(direction, false)
    }

    pub async fn open(&mut self) -> Result<()> {
        self.move_lock(Direction::Open).await
    }

    pub async fn close(&mut self) -> Result<()> {
        self.move_lock(Direction::Close).await
    }

    /// Current physical state, read live from the sensor.
    pub fn state(&mut self) -> Result<LockState> {
        self.sensor.read_state()
    }
}
