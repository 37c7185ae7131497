//! Mock buzzer recording every tone change.

use crate::{Result, mock::lock_shared, traits::Buzzer};
use std::sync::{Arc, Mutex};
use tokio::time::Instant;

/// A tone change on the buzzer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuzzerEvent {
    /// Tone started at the given frequency in Hz.
    Tone(u16),
    /// Tone stopped.
    Silence,
}

/// Mock buzzer.
///
/// Clones share one event log. Each event is stamped with the tokio clock,
/// so tests running with a paused clock can check tone lengths exactly.
#[derive(Debug, Clone, Default)]
pub struct MockBuzzer {
    log: Arc<Mutex<Vec<(Instant, BuzzerEvent)>>>,
}

impl MockBuzzer {
    /// Create a silent buzzer with an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded events, oldest first.
    pub fn events(&self) -> Vec<BuzzerEvent> {
        lock_shared(&self.log).iter().map(|(_, e)| *e).collect()
    }

    /// Recorded events with the instant each happened.
    pub fn timeline(&self) -> Vec<(Instant, BuzzerEvent)> {
        lock_shared(&self.log).clone()
    }

    /// Frequencies of every tone played, in order.
    pub fn tones(&self) -> Vec<u16> {
        lock_shared(&self.log)
            .iter()
            .filter_map(|(_, event)| match event {
                BuzzerEvent::Tone(hz) => Some(*hz),
                BuzzerEvent::Silence => None,
            })
            .collect()
    }

    /// Forget all recorded events.
    pub fn clear(&self) {
        lock_shared(&self.log).clear();
    }

    fn record(&self, event: BuzzerEvent) {
        lock_shared(&self.log).push((Instant::now(), event));
    }
}

impl Buzzer for MockBuzzer {
    fn tone(&mut self, frequency_hz: u16) -> Result<()> {
        self.record(BuzzerEvent::Tone(frequency_hz));
        Ok(())
    }

    fn silence(&mut self) -> Result<()> {
        self.record(BuzzerEvent::Silence);
        Ok(())
    }
}
