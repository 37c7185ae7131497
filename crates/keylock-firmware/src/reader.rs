//! Key reading session over the single-wire reader bus.

use keylock_core::{
    KeyToken,
    constants::{KEY_LENGTH, KEY_PAYLOAD_LENGTH, READ_KEY_COMMAND},
};
use keylock_hardware::{KeyReader, Result};
use tracing::{debug, trace};

/// Produces a validated [`KeyToken`] from one presentation, or nothing.
///
/// Wrong-family and bad-checksum frames are reader noise: they are logged
/// at `debug` and reported as "no frame", never as an error.
///
/// # Examples
///
/// ```
/// use keylock_firmware::KeyReaderSession;
/// use keylock_hardware::mock::MockKeyReader;
///
/// #[tokio::main]
/// async fn main() -> keylock_hardware::Result<()> {
///     let (reader, _wake, handle) = MockKeyReader::new();
///     let mut session = KeyReaderSession::new(reader);
///
///     assert_eq!(session.read_token().await?, None);
///
///     let token = handle.present_payload([0x01, 0xA2, 0x33, 0x00, 0x00, 0x00, 0x00]).await?;
///     assert_eq!(session.read_token().await?, Some(token));
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct KeyReaderSession<R> {
    reader: R,
}

impl<R: KeyReader> KeyReaderSession<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    /// Reset the bus and, if a key answers, read and validate its frame.
    ///
    /// # Errors
    ///
    /// Returns an error only if the bus itself fails.
    pub async fn read_token(&mut self) -> Result<Option<KeyToken>> {
        if !self.reader.reset().await? {
            trace!("No device answered the reset pulse");
            return Ok(None);
        }

        self.reader.write_command(READ_KEY_COMMAND).await?;

        let mut frame = [0u8; KEY_LENGTH];
        for byte in &mut frame {
            *byte = self.reader.read_byte().await?;
        }

        let checksum = self.reader.checksum(&frame[..KEY_PAYLOAD_LENGTH]);
        match KeyToken::from_frame(frame, checksum) {
            Ok(token) => Ok(Some(token)),
            Err(e) => {
                debug!("Discarding frame {}: {}", KeyToken::from_bytes(frame), e);
                Ok(None)
            }
        }
    }

    pub fn reader(&self) -> &R {
        &self.reader
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keylock_hardware::mock::{MockKeyReader, token_with_serial, valid_token};
    use rstest::rstest;

    fn corrupt_checksum(token: &KeyToken) -> Vec<u8> {
        let mut frame = token.as_bytes().to_vec();
        frame[KEY_LENGTH - 1] ^= 0x01;
        frame
    }

    #[tokio::test]
    async fn test_no_device_is_no_frame() {
        let (reader, _wake, handle) = MockKeyReader::new();
        let mut session = KeyReaderSession::new(reader);

        assert_eq!(session.read_token().await.unwrap(), None);
        assert_eq!(handle.reset_count(), 1);
        assert!(handle.commands().is_empty());
    }

    #[tokio::test]
    async fn test_valid_frame_yields_token() {
        let (reader, _wake, handle) = MockKeyReader::new();
        let mut session = KeyReaderSession::new(reader);
        let token = token_with_serial([0x10, 0x20, 0x30, 0x40, 0x50, 0x60]);

        handle.present_key(&token).await.unwrap();

        assert_eq!(session.read_token().await.unwrap(), Some(token));
        assert_eq!(handle.commands(), vec![READ_KEY_COMMAND]);
    }

    #[rstest]
    #[case::wrong_family(valid_token([0x02, 0x10, 0x20, 0x30, 0x40, 0x50, 0x60]).as_bytes().to_vec())]
    #[case::bad_checksum(corrupt_checksum(&token_with_serial([0x10, 0x20, 0x30, 0x40, 0x50, 0x60])))]
    #[case::truncated(vec![0x01, 0x10, 0x20])]
    #[case::all_zero(vec![0x00; KEY_LENGTH])]
    #[tokio::test]
    async fn test_invalid_frames_are_discarded(#[case] frame: Vec<u8>) {
        let (reader, _wake, handle) = MockKeyReader::new();
        let mut session = KeyReaderSession::new(reader);

        handle.present_frame(&frame).await.unwrap();

        assert_eq!(session.read_token().await.unwrap(), None);
        assert_eq!(handle.pending_frames(), 0);
    }

    #[tokio::test]
    async fn test_each_presentation_is_read_once() {
        let (reader, _wake, handle) = MockKeyReader::new();
        let mut session = KeyReaderSession::new(reader);
        let first = token_with_serial([1, 0, 0, 0, 0, 0]);
        let second = token_with_serial([2, 0, 0, 0, 0, 0]);

        handle.present_key(&first).await.unwrap();
        handle.present_key(&second).await.unwrap();

        assert_eq!(session.read_token().await.unwrap(), Some(first));
        assert_eq!(session.read_token().await.unwrap(), Some(second));
        assert_eq!(session.read_token().await.unwrap(), None);
    }
}
