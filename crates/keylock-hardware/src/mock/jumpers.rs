//! Mock configuration jumper block.

use crate::{Result, traits::ConfigInputs};

/// Mock two-pin configuration header.
///
/// Each input can be jumpered to ground, or the two inputs can be bridged
/// to each other (the "top" jumper position). A bridge reads as nothing on
/// both pins until input A is driven low, which then pulls B low too.
///
/// # Examples
///
/// ```
/// use keylock_hardware::mock::MockJumpers;
/// use keylock_hardware::traits::ConfigInputs;
///
/// let mut jumpers = MockJumpers::bridged();
/// assert!(!jumpers.b_asserted().unwrap());
/// jumpers.drive_a_low().unwrap();
/// assert!(jumpers.b_asserted().unwrap());
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MockJumpers {
    a_grounded: bool,
    b_grounded: bool,
    bridged: bool,
    a_driven_low: bool,
}

impl MockJumpers {
    /// Header with no jumper fitted.
    pub fn none() -> Self {
        Self::default()
    }

    /// Header with A and/or B jumpered to ground.
    pub fn grounded(a: bool, b: bool) -> Self {
        Self {
            a_grounded: a,
            b_grounded: b,
            ..Self::default()
        }
    }

    /// Header with A bridged to B.
    pub fn bridged() -> Self {
        Self {
            bridged: true,
            ..Self::default()
        }
    }

    /// Returns `true` once input A has been driven low.
    pub fn a_driven_low(&self) -> bool {
        self.a_driven_low
    }
}

impl ConfigInputs for MockJumpers {
    fn a_asserted(&mut self) -> Result<bool> {
        Ok(self.a_grounded || self.a_driven_low)
    }

    fn b_asserted(&mut self) -> Result<bool> {
        Ok(self.b_grounded || (self.bridged && self.a_driven_low))
    }

    fn drive_a_low(&mut self) -> Result<()> {
        self.a_driven_low = true;
        Ok(())
    }
}
