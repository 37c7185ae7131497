//! Mock single-wire key reader and wake line.
//!
//! This module provides a simulated key reader bus that can be controlled
//! programmatically. Presenting a key queues its frame on the bus and raises
//! the wake line, the way a real key touching the reader does.

use crate::{
    HardwareError, Result,
    crc::dallas_crc8,
    mock::lock_shared,
    traits::{KeyReader, WakeSource},
};
use keylock_core::{
    KeyToken,
    constants::{KEY_FAMILY, KEY_LENGTH, KEY_PAYLOAD_LENGTH},
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Level read from an idle bus with nothing driving it.
const IDLE_BUS_BYTE: u8 = 0xFF;

/// Mock key reader for testing and development.
///
/// # Examples
///
/// ```
/// use keylock_hardware::mock::MockKeyReader;
/// use keylock_hardware::traits::{KeyReader, WakeSource};
///
/// #[tokio::main]
/// async fn main() -> keylock_hardware::Result<()> {
///     let (mut reader, mut wake, handle) = MockKeyReader::new();
///
///     let token = handle.present_payload([0x01, 0xA2, 0x33, 0x00, 0x00, 0x00, 0x00]).await?;
///
///     wake.sleep_until_wake().await?;
///     assert!(reader.reset().await?);
///     reader.write_command(0x33).await?;
///
///     let mut frame = [0u8; 8];
///     for byte in &mut frame {
///         *byte = reader.read_byte().await?;
///     }
///     assert_eq!(&frame, token.as_bytes());
///
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct MockKeyReader {
    /// Bus shared with the handle
    bus: Arc<Mutex<BusState>>,
}

#[derive(Debug, Default)]
struct BusState {
    /// Frames waiting for the next reset
    queued: VecDeque<Vec<u8>>,

    /// Bytes the present device will send
    on_bus: VecDeque<u8>,

    /// Commands written by the controller
    commands: Vec<u8>,

    /// Number of bus resets issued
    resets: usize,

    /// Resets still to fail with a bus error
    failing_resets: usize,
}

impl MockKeyReader {
    /// Create a new mock reader.
    ///
    /// Returns the reader, the wake line it raises and a handle used to
    /// present keys.
    pub fn new() -> (Self, MockWakeLine, MockKeyReaderHandle) {
        let (wake_tx, wake_rx) = mpsc::channel(32);
        let bus = Arc::new(Mutex::new(BusState::default()));

        let reader = Self {
            bus: Arc::clone(&bus),
        };
        let wake = MockWakeLine { wake_rx };
        let handle = MockKeyReaderHandle { bus, wake_tx };

        (reader, wake, handle)
    }
}

impl KeyReader for MockKeyReader {
    async fn reset(&mut self) -> Result<bool> {
        let mut bus = lock_shared(&self.bus);
        bus.resets += 1;
        bus.on_bus.clear();

        if bus.failing_resets > 0 {
            bus.failing_resets -= 1;
            return Err(HardwareError::other("key reader bus shorted"));
        }

        match bus.queued.pop_front() {
            Some(frame) => {
                bus.on_bus = frame.into();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn write_command(&mut self, command: u8) -> Result<()> {
        lock_shared(&self.bus).commands.push(command);
        Ok(())
    }

    async fn read_byte(&mut self) -> Result<u8> {
        Ok(lock_shared(&self.bus)
            .on_bus
            .pop_front()
            .unwrap_or(IDLE_BUS_BYTE))
    }

    fn checksum(&self, bytes: &[u8]) -> u8 {
        dallas_crc8(bytes)
    }
}

/// Mock wake line, raised by [`MockKeyReaderHandle`].
#[derive(Debug)]
pub struct MockWakeLine {
    wake_rx: mpsc::Receiver<()>,
}

impl WakeSource for MockWakeLine {
    async fn sleep_until_wake(&mut self) -> Result<()> {
        self.wake_rx
            .recv()
            .await
            .ok_or_else(|| HardwareError::disconnected("wake line closed"))
    }
}

/// Handle for presenting keys to a mock reader.
///
/// Dropping every handle closes the wake line, which ends a controller
/// waiting in [`WakeSource::sleep_until_wake`].
#[derive(Debug, Clone)]
pub struct MockKeyReaderHandle {
    bus: Arc<Mutex<BusState>>,
    wake_tx: mpsc::Sender<()>,
}

impl MockKeyReaderHandle {
    /// Put raw bytes on the bus and raise the wake line.
    ///
    /// The bytes are sent as-is, so truncated or corrupted frames can be
    /// simulated. Reads past the end return the idle bus level.
    ///
    /// # Errors
    ///
    /// Returns an error if the wake line has been dropped.
    pub async fn present_frame(&self, frame: &[u8]) -> Result<()> {
        lock_shared(&self.bus).queued.push_back(frame.to_vec());
        self.wake().await
    }

    /// Present a key token as read from a real key.
    ///
    /// # Errors
    ///
    /// Returns an error if the wake line has been dropped.
    pub async fn present_key(&self, token: &KeyToken) -> Result<()> {
        self.present_frame(token.as_bytes()).await
    }

    /// Build a valid frame from seven payload bytes, present it and return
    /// the resulting token.
    ///
    /// # Errors
    ///
    /// Returns an error if the wake line has been dropped.
    pub async fn present_payload(&self, payload: [u8; KEY_PAYLOAD_LENGTH]) -> Result<KeyToken> {
        let token = valid_token(payload);
        self.present_key(&token).await?;
        Ok(token)
    }

    /// Raise the wake line without any device on the bus (line noise).
    ///
    /// # Errors
    ///
    /// Returns an error if the wake line has been dropped.
    pub async fn wake(&self) -> Result<()> {
        self.wake_tx
            .send(())
            .await
            .map_err(|_| HardwareError::disconnected("wake line closed"))
    }

    /// Make the next `count` bus resets fail.
    ///
    /// Frames already presented stay queued and are picked up by the first
    /// reset that succeeds.
    pub fn fail_next_resets(&self, count: usize) {
        lock_shared(&self.bus).failing_resets = count;
    }

    /// Commands written to the bus so far.
    pub fn commands(&self) -> Vec<u8> {
        lock_shared(&self.bus).commands.clone()
    }

    /// Number of bus resets issued so far.
    pub fn reset_count(&self) -> usize {
        lock_shared(&self.bus).resets
    }

    /// Number of frames presented but not yet picked up by a reset.
    pub fn pending_frames(&self) -> usize {
        lock_shared(&self.bus).queued.len()
    }
}

/// Build a token with a correct checksum from seven payload bytes.
///
/// The family byte is taken from the payload as given; use [`KEY_FAMILY`]
/// as the first byte for a key the controller will accept.
pub fn valid_token(payload: [u8; KEY_PAYLOAD_LENGTH]) -> KeyToken {
    let mut frame = [0u8; KEY_LENGTH];
    frame[..KEY_PAYLOAD_LENGTH].copy_from_slice(&payload);
    frame[KEY_LENGTH - 1] = dallas_crc8(&payload);
    KeyToken::from_bytes(frame)
}

/// Build a valid token of the accepted family from a serial number.
pub fn token_with_serial(serial: [u8; 6]) -> KeyToken {
    let mut payload = [0u8; KEY_PAYLOAD_LENGTH];
    payload[0] = KEY_FAMILY;
    payload[1..].copy_from_slice(&serial);
    valid_token(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use keylock_core::constants::READ_KEY_COMMAND;

    async fn read_frame(reader: &mut MockKeyReader) -> [u8; KEY_LENGTH] {
        let mut frame = [0u8; KEY_LENGTH];
        for byte in &mut frame {
            *byte = reader.read_byte().await.unwrap();
        }
        frame
    }

    #[tokio::test]
    async fn test_present_and_read_key() {
        let (mut reader, mut wake, handle) = MockKeyReader::new();

        let token = token_with_serial([0x10, 0x20, 0x30, 0x40, 0x50, 0x60]);
        handle.present_key(&token).await.unwrap();

        wake.sleep_until_wake().await.unwrap();
        assert!(reader.reset().await.unwrap());
        reader.write_command(READ_KEY_COMMAND).await.unwrap();

        let frame = read_frame(&mut reader).await;
        assert_eq!(&frame, token.as_bytes());
        assert_eq!(handle.commands(), vec![READ_KEY_COMMAND]);
    }

    #[tokio::test]
    async fn test_reset_without_device() {
        let (mut reader, _wake, handle) = MockKeyReader::new();

        assert!(!reader.reset().await.unwrap());
        assert_eq!(handle.reset_count(), 1);
    }

    #[tokio::test]
    async fn test_noise_wake_has_no_device() {
        let (mut reader, mut wake, handle) = MockKeyReader::new();

        handle.wake().await.unwrap();
        wake.sleep_until_wake().await.unwrap();
        assert!(!reader.reset().await.unwrap());
    }

    #[tokio::test]
    async fn test_truncated_frame_reads_idle_level() {
        let (mut reader, _wake, handle) = MockKeyReader::new();

        handle.present_frame(&[0x01, 0x02, 0x03]).await.unwrap();
        assert!(reader.reset().await.unwrap());

        let frame = read_frame(&mut reader).await;
        assert_eq!(frame, [0x01, 0x02, 0x03, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]);
    }

    #[tokio::test]
    async fn test_frames_are_consumed_in_order() {
        let (mut reader, _wake, handle) = MockKeyReader::new();

        let first = token_with_serial([1, 0, 0, 0, 0, 0]);
        let second = token_with_serial([2, 0, 0, 0, 0, 0]);
        handle.present_key(&first).await.unwrap();
        handle.present_key(&second).await.unwrap();
        assert_eq!(handle.pending_frames(), 2);

        reader.reset().await.unwrap();
        assert_eq!(&read_frame(&mut reader).await, first.as_bytes());
        reader.reset().await.unwrap();
        assert_eq!(&read_frame(&mut reader).await, second.as_bytes());
        assert_eq!(handle.pending_frames(), 0);
    }

    #[tokio::test]
    async fn test_bus_fault_keeps_frame_queued() {
        let (mut reader, _wake, handle) = MockKeyReader::new();
        let token = token_with_serial([0x10, 0x20, 0x30, 0x40, 0x50, 0x60]);

        handle.fail_next_resets(1);
        handle.present_key(&token).await.unwrap();

        assert!(matches!(reader.reset().await, Err(HardwareError::Other(_))));
        assert_eq!(handle.pending_frames(), 1);

        assert!(reader.reset().await.unwrap());
        assert_eq!(&read_frame(&mut reader).await, token.as_bytes());
        assert_eq!(handle.reset_count(), 2);
    }

    #[tokio::test]
    async fn test_wake_line_closes_when_handle_dropped() {
        let (_reader, mut wake, handle) = MockKeyReader::new();
        drop(handle);

        let result = wake.sleep_until_wake().await;
        assert!(matches!(result, Err(HardwareError::Disconnected { .. })));
    }

    #[test]
    fn test_valid_token_checksum() {
        let token = token_with_serial([0xDE, 0xAD, 0xBE, 0xEF, 0x00, 0x01]);
        assert_eq!(token.family(), KEY_FAMILY);
        assert_eq!(token.as_bytes()[7], dallas_crc8(token.payload()));
        assert!(KeyToken::from_frame(*token.as_bytes(), dallas_crc8(token.payload())).is_ok());
    }
}
