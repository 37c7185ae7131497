//! Mock lock mechanism: relay bank and position sensor in one.

use crate::{
    HardwareError, Result,
    mock::lock_shared,
    traits::{LockSensor, RelayBank},
};
use keylock_core::{Direction, LockState};
use std::sync::{Arc, Mutex};

/// Mock bistable lock.
///
/// Clones share one mechanism, so the same lock can be handed to the
/// controller as relay bank and as sensor while a test keeps a third clone
/// to inspect it. A pulse moves the lock when its relay pair is released
/// after being energized, unless the mechanism is jammed. Relay and sensor
/// faults can be switched on to simulate broken wiring.
///
/// # Examples
///
/// ```
/// use keylock_core::{Direction, LockState};
/// use keylock_hardware::mock::MockLock;
/// use keylock_hardware::traits::{LockSensor, RelayBank};
///
/// let mut lock = MockLock::new(LockState::Closed);
/// lock.set_pair(Direction::Open, true).unwrap();
/// lock.set_pair(Direction::Open, false).unwrap();
/// assert_eq!(lock.read_state().unwrap(), LockState::Opened);
/// ```
#[derive(Debug, Clone)]
pub struct MockLock {
    mechanism: Arc<Mutex<Mechanism>>,
}

#[derive(Debug)]
struct Mechanism {
    state: LockState,
    jammed: bool,
    open_energized: bool,
    close_energized: bool,
    pulses: Vec<Direction>,
    sensor_reads: usize,
    relay_fault: bool,
    sensor_fault: bool,
}

impl MockLock {
    /// Create a lock in the given state.
    pub fn new(state: LockState) -> Self {
        Self {
            mechanism: Arc::new(Mutex::new(Mechanism {
                state,
                jammed: false,
                open_energized: false,
                close_energized: false,
                pulses: Vec::new(),
                sensor_reads: 0,
                relay_fault: false,
                sensor_fault: false,
            })),
        }
    }

    /// Jam or free the mechanism. A jammed lock ignores pulses.
    pub fn set_jammed(&self, jammed: bool) {
        lock_shared(&self.mechanism).jammed = jammed;
    }

    /// Make relay commands fail without touching the mechanism.
    pub fn set_relay_fault(&self, failing: bool) {
        lock_shared(&self.mechanism).relay_fault = failing;
    }

    /// Make sensor reads fail.
    pub fn set_sensor_fault(&self, failing: bool) {
        lock_shared(&self.mechanism).sensor_fault = failing;
    }

    /// Force the physical state, e.g. someone turning the lock by hand.
    pub fn set_state(&self, state: LockState) {
        lock_shared(&self.mechanism).state = state;
    }

    /// Current physical state.
    pub fn state(&self) -> LockState {
        lock_shared(&self.mechanism).state
    }

    /// Completed pulses, oldest first.
    pub fn pulses(&self) -> Vec<Direction> {
        lock_shared(&self.mechanism).pulses.clone()
    }

    /// Returns `true` if the pair for `direction` is currently energized.
    pub fn is_energized(&self, direction: Direction) -> bool {
        let mechanism = lock_shared(&self.mechanism);
        match direction {
            Direction::Open => mechanism.open_energized,
            Direction::Close => mechanism.close_energized,
        }
    }

    /// Number of sensor reads so far.
    pub fn sensor_reads(&self) -> usize {
        lock_shared(&self.mechanism).sensor_reads
    }
}

impl RelayBank for MockLock {
    fn set_pair(&mut self, direction: Direction, energized: bool) -> Result<()> {
        let mut mechanism = lock_shared(&self.mechanism);
        if mechanism.relay_fault {
            return Err(HardwareError::pin(format!("{direction} relay pair not responding")));
        }

        let pair = match direction {
            Direction::Open => &mut mechanism.open_energized,
            Direction::Close => &mut mechanism.close_energized,
        };
        let was_energized = std::mem::replace(pair, energized);

        if was_energized && !energized {
            mechanism.pulses.push(direction);
            if !mechanism.jammed {
                mechanism.state = direction.target_state();
            }
        }
        Ok(())
    }
}

impl LockSensor for MockLock {
    fn read_state(&mut self) -> Result<LockState> {
        let mut mechanism = lock_shared(&self.mechanism);
        if mechanism.sensor_fault {
            return Err(HardwareError::pin("lock sensor not responding"));
        }
        mechanism.sensor_reads += 1;
        Ok(mechanism.state)
    }
}
