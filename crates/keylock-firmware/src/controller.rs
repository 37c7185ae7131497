//! Lock controller main loop.
//!
//! The controller boots once, then cycles forever:
//!
//! ```text
//! Sleeping -> Waking -> Reading -> Dispatching -> Signaling -> Sleeping
//!                          |
//!                          +-> Sleeping (no valid frame)
//! ```
//!
//! Any state may also fall straight back to `Sleeping` when a peripheral
//! fails mid-cycle. Nothing in a cycle is fatal; only losing the wake source
//! ends [`Controller::run`].
//!
//! # Boot
//!
//! 1. Resolve the mode from the configuration jumpers
//! 2. In Wipe mode, clear the registry
//! 3. Load the registry (a corrupted count self-heals by wiping)
//! 4. Startup chirp, then announce the mode
//!
//! # Dispatch
//!
//! | Mode | Action | Outcome tone |
//! |---|---|---|
//! | Normal | toggle the lock if the key is registered, verify with the sensor | yes |
//! | Add | add the key to the registry | yes |
//! | Remove | remove the key from the registry | yes |
//! | Unused, Wipe | nothing | no, silent cooldown |

use std::collections::VecDeque;
use std::fmt;

use keylock_core::{Error, KeyToken, LockState, Mode};
use keylock_hardware::{Buzzer, ConfigInputs, Eeprom, KeyReader, LockSensor, RelayBank, WakeSource};
use keylock_storage::{KeyRegistry, LoadStatus, StorageError};
use serde::{Deserialize, Serialize};
use tokio::time::{Instant, sleep};
use tracing::{debug, info, trace, warn};

use crate::{
    actuator::LockActuator,
    config::FirmwareConfig,
    error::{FirmwareError, Result},
    feedback::FeedbackSignaler,
    mode::ModeSelector,
    reader::KeyReaderSession,
};

/// Maximum number of state transitions to keep in history.
///
/// A full cycle is five transitions, so this covers the last few cycles.
const MAX_HISTORY_SIZE: usize = 32;

/// Phase of the controller's wake cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControllerState {
    /// Low-power wait for the reader wake signal.
    Sleeping,

    /// Letting the signal lines settle.
    Waking,

    /// Reading and validating a frame.
    Reading,

    /// Acting on a valid key according to the mode.
    Dispatching,

    /// Playing the mode beeps and the outcome tone.
    Signaling,
}

impl fmt::Display for ControllerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state_str = match self {
            ControllerState::Sleeping => "Sleeping",
            ControllerState::Waking => "Waking",
            ControllerState::Reading => "Reading",
            ControllerState::Dispatching => "Dispatching",
            ControllerState::Signaling => "Signaling",
        };
        write!(f, "{}", state_str)
    }
}

impl ControllerState {
    /// Check if transition to target state is valid from this state.
    ///
    /// # Examples
    ///
    /// ```
    /// use keylock_firmware::ControllerState;
    ///
    /// assert!(ControllerState::Sleeping.can_transition_to(&ControllerState::Waking));
    /// assert!(ControllerState::Reading.can_transition_to(&ControllerState::Sleeping));
    /// assert!(!ControllerState::Sleeping.can_transition_to(&ControllerState::Dispatching));
    /// ```
    pub fn can_transition_to(&self, target: &ControllerState) -> bool {
        matches!(
            (self, target),
            (ControllerState::Sleeping, ControllerState::Waking)
                | (ControllerState::Waking, ControllerState::Reading)
                | (ControllerState::Reading, ControllerState::Dispatching)
                | (ControllerState::Dispatching, ControllerState::Signaling)
                // Normal end of a cycle, no frame, or a mid-cycle fault
                | (
                    ControllerState::Waking
                        | ControllerState::Reading
                        | ControllerState::Dispatching
                        | ControllerState::Signaling,
                    ControllerState::Sleeping
                )
        )
    }
}

/// A single state transition with the time it happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateTransition {
    pub from: ControllerState,
    pub to: ControllerState,
    pub at: Instant,
}

/// Result of one wake cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// No key answered, or its frame was discarded as noise.
    NoFrame,

    /// A valid key was dispatched.
    ///
    /// `success` is `None` in modes that play no outcome tone.
    Processed {
        token: KeyToken,
        mode: Mode,
        success: Option<bool>,
    },
}

/// Peripherals the controller owns for its whole life.
///
/// The configuration jumpers are not part of it: they are only read at
/// boot.
#[derive(Debug)]
pub struct Peripherals<R, W, E, B, S, Z> {
    pub reader: R,
    pub wake: W,
    pub eeprom: E,
    pub relays: B,
    pub sensor: S,
    pub buzzer: Z,
}

/// The lock controller.
///
/// # Examples
///
/// ```
/// use keylock_core::LockState;
/// use keylock_firmware::{Controller, CycleOutcome, FirmwareConfig, Peripherals};
/// use keylock_hardware::mock::{MemoryEeprom, MockBuzzer, MockJumpers, MockKeyReader, MockLock};
///
/// #[tokio::main(flavor = "current_thread", start_paused = true)]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let (reader, wake, handle) = MockKeyReader::new();
///     let lock = MockLock::new(LockState::Closed);
///     let peripherals = Peripherals {
///         reader,
///         wake,
///         eeprom: MemoryEeprom::new(),
///         relays: lock.clone(),
///         sensor: lock.clone(),
///         buzzer: MockBuzzer::new(),
///     };
///
///     // Jumper A grounded: Add mode
///     let mut controller =
///         Controller::boot(peripherals, MockJumpers::grounded(true, false), FirmwareConfig::default())
///             .await?;
///
///     let key = handle.present_payload([0x01, 0xA2, 0x33, 0x00, 0x00, 0x00, 0x00]).await?;
///     let outcome = controller.run_cycle().await?;
///
///     assert!(matches!(outcome, CycleOutcome::Processed { success: Some(true), .. }));
///     assert!(controller.registry().contains(&key));
///     Ok(())
/// }
/// ```
pub struct Controller<R, W, E, B, S, Z> {
    mode: Mode,
    config: FirmwareConfig,
    state: ControllerState,
    history: VecDeque<StateTransition>,
    wake: W,
    session: KeyReaderSession<R>,
    registry: KeyRegistry<E>,
    actuator: LockActuator<B, S>,
    feedback: FeedbackSignaler<Z>,
}

impl<R, W, E, B, S, Z> Controller<R, W, E, B, S, Z>
where
    R: KeyReader,
    W: WakeSource,
    E: Eeprom,
    B: RelayBank,
    S: LockSensor,
    Z: Buzzer,
{
    /// Boot the controller.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, the EEPROM is too
    /// small or unreadable, or a boot-time peripheral fails.
    pub async fn boot<C: ConfigInputs>(
        peripherals: Peripherals<R, W, E, B, S, Z>,
        inputs: C,
        config: FirmwareConfig,
    ) -> Result<Self> {
        config.validate()?;

        let mode = ModeSelector::new(inputs).resolve()?;
        info!("Operating mode: {}", mode);

        let mut registry = KeyRegistry::new(peripherals.eeprom)?;
        if mode == Mode::Wipe {
            warn!("Wipe mode: clearing key registry");
            registry.wipe()?;
        }

        match registry.load()? {
            LoadStatus::Loaded { count } => info!("Loaded {} registered keys", count),
            LoadStatus::Recovered { stored_count } => warn!(
                "Key registry corrupted (stored count {}), wiped",
                stored_count
            ),
        }
        for (slot, key) in registry.keys().iter().enumerate() {
            debug!("Key {}: {}", slot, key);
        }

        let mut feedback = FeedbackSignaler::new(peripherals.buzzer, &config);
        feedback.startup_chirp().await?;
        feedback.announce_mode(mode).await?;

        Ok(Self {
            mode,
            state: ControllerState::Sleeping,
            history: VecDeque::with_capacity(MAX_HISTORY_SIZE),
            wake: peripherals.wake,
            session: KeyReaderSession::new(peripherals.reader),
            registry,
            actuator: LockActuator::new(
                peripherals.relays,
                peripherals.sensor,
                config.pulse_duration(),
            ),
            feedback,
            config,
        })
    }

    /// Run cycles until the wake source closes.
    ///
    /// Cycle errors are logged and the controller goes back to sleep.
    ///
    /// # Errors
    ///
    /// Currently never returns an error; a closed wake source is a clean
    /// shutdown.
    pub async fn run(&mut self) -> Result<()> {
        loop {
            match self.run_cycle().await {
                Ok(outcome) => trace!(?outcome, "Cycle finished"),
                Err(e) if e.is_terminal() => {
                    info!("{}, stopping", e);
                    return Ok(());
                }
                Err(e) => warn!("Cycle abandoned: {}", e),
            }
        }
    }

    /// Sleep until woken, then run one full cycle.
    ///
    /// Always leaves the controller in `Sleeping`.
    ///
    /// # Errors
    ///
    /// - `FirmwareError::WakeSourceClosed` if no wake signal can arrive
    /// - `FirmwareError::Hardware` if the reader or buzzer fails
    pub async fn run_cycle(&mut self) -> Result<CycleOutcome> {
        self.wake
            .sleep_until_wake()
            .await
            .map_err(FirmwareError::WakeSourceClosed)?;

        let outcome = self.process_wake().await;
        if self.state != ControllerState::Sleeping {
            self.transition_to(ControllerState::Sleeping)?;
        }
        outcome
    }

    async fn process_wake(&mut self) -> Result<CycleOutcome> {
        self.transition_to(ControllerState::Waking)?;
        sleep(self.config.settle_delay()).await;

        self.transition_to(ControllerState::Reading)?;
        let Some(token) = self.session.read_token().await? else {
            return Ok(CycleOutcome::NoFrame);
        };

        self.transition_to(ControllerState::Dispatching)?;
        let success = self.dispatch(&token).await;

        self.transition_to(ControllerState::Signaling)?;
        self.feedback.announce_mode(self.mode).await?;
        match success {
            Some(success) => self.feedback.announce_outcome(success).await?,
            None => self.feedback.cooldown().await,
        }

        Ok(CycleOutcome::Processed {
            token,
            mode: self.mode,
            success,
        })
    }

    async fn dispatch(&mut self, token: &KeyToken) -> Option<bool> {
        let success = match self.mode {
            Mode::Normal => self.toggle_lock(token).await,
            Mode::Add => self.update_registry(token, |registry, token| registry.add(*token)),
            Mode::Remove => self.update_registry(token, |registry, token| registry.remove(token)),
            Mode::Unused | Mode::Wipe => {
                debug!("Key {} ignored in {} mode", token, self.mode);
                return None;
            }
        };
        Some(success)
    }

    async fn toggle_lock(&mut self, token: &KeyToken) -> bool {
        if !self.registry.contains(token) {
            info!("Key {} not registered, access denied", token);
            return false;
        }

        match self.verified_toggle().await {
            Ok((target, true)) => {
                info!("Key {}: lock {}", token, target);
                true
            }
            Ok((target, false)) => {
                warn!("Key {}: lock did not reach {}", token, target);
                false
            }
            Err(e) => {
                warn!("Key {}: lock actuation failed: {}", token, e);
                false
            }
        }
    }

    /// Move the lock out of its current state and check where it ended up.
    async fn verified_toggle(&mut self) -> keylock_hardware::Result<(LockState, bool)> {
        let direction = self.actuator.state()?.toggle_direction();
        self.actuator.move_lock(direction).await?;

        let target = direction.target_state();
        Ok((target, self.actuator.state()? == target))
    }

    fn update_registry<F>(&mut self, token: &KeyToken, op: F) -> bool
    where
        F: FnOnce(&mut KeyRegistry<E>, &KeyToken) -> std::result::Result<(), StorageError>,
    {
        match op(&mut self.registry, token) {
            Ok(()) => {
                info!(
                    "Key {} {} ({} registered)",
                    token,
                    if self.mode == Mode::Add { "added" } else { "removed" },
                    self.registry.len()
                );
                true
            }
            Err(e) if e.is_rejection() => {
                info!("Key {} rejected: {}", token, e);
                false
            }
            Err(e) => {
                warn!("Key {}: registry update failed: {}", token, e);
                false
            }
        }
    }

    fn transition_to(&mut self, new_state: ControllerState) -> Result<()> {
        if !self.state.can_transition_to(&new_state) {
            return Err(Error::InvalidStateTransition {
                from: self.state.to_string(),
                to: new_state.to_string(),
            }
            .into());
        }

        trace!("{} -> {}", self.state, new_state);
        if self.history.len() >= MAX_HISTORY_SIZE {
            self.history.pop_front();
        }
        self.history.push_back(StateTransition {
            from: self.state,
            to: new_state,
            at: Instant::now(),
        });
        self.state = new_state;
        Ok(())
    }

    /// Mode resolved at boot.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    /// Recent state transitions, oldest first.
    pub fn history(&self) -> &VecDeque<StateTransition> {
        &self.history
    }

    pub fn registry(&self) -> &KeyRegistry<E> {
        &self.registry
    }

    pub fn config(&self) -> &FirmwareConfig {
        &self.config
    }

    /// Reader the controller is using.
    pub fn reader(&self) -> &R {
        self.session.reader()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [ControllerState; 5] = [
        ControllerState::Sleeping,
        ControllerState::Waking,
        ControllerState::Reading,
        ControllerState::Dispatching,
        ControllerState::Signaling,
    ];

    #[test]
    fn test_cycle_transitions_are_valid() {
        let cycle = [
            ControllerState::Sleeping,
            ControllerState::Waking,
            ControllerState::Reading,
            ControllerState::Dispatching,
            ControllerState::Signaling,
            ControllerState::Sleeping,
        ];
        for pair in cycle.windows(2) {
            assert!(pair[0].can_transition_to(&pair[1]), "{} -> {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_every_active_state_can_fall_back_to_sleep() {
        for state in &ALL[1..] {
            assert!(state.can_transition_to(&ControllerState::Sleeping));
        }
        assert!(!ControllerState::Sleeping.can_transition_to(&ControllerState::Sleeping));
    }

    #[test]
    fn test_no_skipping_ahead() {
        assert!(!ControllerState::Sleeping.can_transition_to(&ControllerState::Reading));
        assert!(!ControllerState::Waking.can_transition_to(&ControllerState::Dispatching));
        assert!(!ControllerState::Reading.can_transition_to(&ControllerState::Signaling));
        assert!(!ControllerState::Signaling.can_transition_to(&ControllerState::Waking));
    }

    #[test]
    fn test_state_serialization() {
        let json = serde_json::to_string(&ControllerState::Dispatching).unwrap();
        assert_eq!(json, "\"dispatching\"");
    }
}
