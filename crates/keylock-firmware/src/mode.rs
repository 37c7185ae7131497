//! Boot-time operating mode selection.
//!
//! Two pulled-up jumper inputs select the mode. A jumper from either pin to
//! ground asserts that pin; a jumper bridging the two pins asserts neither
//! and is only visible by driving A low and watching B follow.
//!
//! | A | B | B with A driven low | Mode |
//! |---|---|---|---|
//! | - | - | - | Normal |
//! | x | - |   | Add |
//! | - | x |   | Remove |
//! | x | x |   | Unused |
//! | - | - | x | Wipe |

use keylock_core::Mode;
use keylock_hardware::{ConfigInputs, Result};
use tracing::debug;

/// Resolve the mode from the raw input readings.
///
/// `bridged` is the result of the bridge probe and only matters when
/// neither input is asserted.
pub fn mode_from_inputs(a_asserted: bool, b_asserted: bool, bridged: bool) -> Mode {
    match (a_asserted, b_asserted) {
        (false, false) if bridged => Mode::Wipe,
        (false, false) => Mode::Normal,
        (true, false) => Mode::Add,
        (false, true) => Mode::Remove,
        (true, true) => Mode::Unused,
    }
}

/// Reads the configuration jumpers once and resolves the operating mode.
#[derive(Debug)]
pub struct ModeSelector<C> {
    inputs: C,
}

impl<C: ConfigInputs> ModeSelector<C> {
    pub fn new(inputs: C) -> Self {
        Self { inputs }
    }

    /// Read the jumpers, probing for a bridge if neither is asserted.
    ///
    /// The probe leaves input A driven low.
    ///
    /// # Errors
    ///
    /// Returns an error if an input cannot be read or driven.
    pub fn resolve(&mut self) -> Result<Mode> {
        let a = self.inputs.a_asserted()?;
        let b = self.inputs.b_asserted()?;

        let bridged = if !a && !b {
            self.inputs.drive_a_low()?;
            self.inputs.b_asserted()?
        } else {
            false
        };

        let mode = mode_from_inputs(a, b, bridged);
        debug!(a, b, bridged, %mode, "Configuration jumpers read");
        Ok(mode)
    }

    pub fn into_inner(self) -> C {
        self.inputs
    }
}
