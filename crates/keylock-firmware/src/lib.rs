//! Keylock controller firmware logic.
//!
//! This crate contains the lock controller and its components, generic over
//! the peripheral traits of `keylock-hardware`:
//!
//! - [`ModeSelector`] - resolves the operating mode from the boot jumpers
//! - [`KeyReaderSession`] - reads and validates key frames
//! - [`LockActuator`] - pulses the lock relays and reads the lock sensor
//! - [`FeedbackSignaler`] - buzzer cues
//! - [`Controller`] - boot sequence and the sleep/wake main loop
//! - [`FirmwareConfig`] - timings and tones

pub mod actuator;
pub mod config;
pub mod controller;
pub mod error;
pub mod feedback;
pub mod mode;
pub mod reader;

pub use actuator::LockActuator;
pub use config::FirmwareConfig;
pub use controller::{Controller, ControllerState, CycleOutcome, Peripherals, StateTransition};
pub use error::{FirmwareError, Result};
pub use feedback::FeedbackSignaler;
pub use mode::{ModeSelector, mode_from_inputs};
pub use reader::KeyReaderSession;
