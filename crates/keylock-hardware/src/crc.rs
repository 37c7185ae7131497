//! Dallas/Maxim CRC-8 used by single-wire key frames.
//!
//! Polynomial x^8 + x^5 + x^4 + 1, processed LSB first (reflected form
//! `0x8C`), initial value 0, no final XOR. Running the CRC over a frame that
//! ends with its own CRC byte yields zero.

/// Reflected CRC-8 polynomial.
const POLYNOMIAL: u8 = 0x8C;

/// Compute the Dallas/Maxim CRC-8 of `bytes`.
///
/// # Examples
///
/// ```
/// use keylock_hardware::crc::dallas_crc8;
///
/// let rom = [0x02, 0x1C, 0xB8, 0x01, 0x00, 0x00, 0x00];
/// assert_eq!(dallas_crc8(&rom), 0xA2);
/// ```
pub fn dallas_crc8(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |mut crc, &byte| {
        let mut data = byte;
        for _ in 0..8 {
            let mix = (crc ^ data) & 0x01;
            crc >>= 1;
            if mix != 0 {
                crc ^= POLYNOMIAL;
            }
            data >>= 1;
        }
        crc
    })
}
