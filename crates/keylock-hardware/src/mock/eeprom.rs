//! In-memory EEPROM.

use crate::{HardwareError, Result, mock::lock_shared, traits::Eeprom};
use keylock_core::constants::{EEPROM_SIZE, ERASED_BYTE};
use std::sync::{Arc, Mutex};

/// EEPROM image held in memory.
///
/// A new image reads [`ERASED_BYTE`] everywhere, like a factory-fresh part.
/// Every successful write call is counted so tests can assert that an
/// operation left storage untouched. Write failures are injected through
/// the [`WriteFault`] handle; clones of an image share the same handle.
///
/// # Examples
///
/// ```
/// use keylock_hardware::mock::MemoryEeprom;
/// use keylock_hardware::traits::Eeprom;
///
/// let mut eeprom = MemoryEeprom::new();
/// assert_eq!(eeprom.read_byte(511).unwrap(), 0xFF);
///
/// eeprom.write_block(0, &[1, 2, 3]).unwrap();
/// let mut buf = [0u8; 3];
/// eeprom.read_block(0, &mut buf).unwrap();
/// assert_eq!(buf, [1, 2, 3]);
/// assert_eq!(eeprom.write_count(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct MemoryEeprom {
    bytes: Vec<u8>,
    writes: usize,
    fault: WriteFault,
}

/// Handle that makes a [`MemoryEeprom`] reject writes.
///
/// A rejected write changes nothing and returns a hardware error.
///
/// ```
/// use keylock_hardware::mock::MemoryEeprom;
/// use keylock_hardware::traits::Eeprom;
///
/// let mut eeprom = MemoryEeprom::new();
/// eeprom.write_fault().fail_after(1, 1);
///
/// assert!(eeprom.write_byte(0, 1).is_ok());
/// assert!(eeprom.write_byte(1, 2).is_err());
/// assert!(eeprom.write_byte(2, 3).is_ok());
/// assert_eq!(&eeprom.as_bytes()[..3], &[1, 0xFF, 3]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct WriteFault {
    plan: Arc<Mutex<FaultPlan>>,
}

#[derive(Debug, Default)]
struct FaultPlan {
    /// Writes still let through before failures start
    passing: usize,
    /// Writes still to reject
    failing: usize,
}

impl WriteFault {
    /// Reject the next `count` writes.
    pub fn fail_next(&self, count: usize) {
        self.fail_after(0, count);
    }

    /// Let `passing` writes through, then reject the following `count`.
    pub fn fail_after(&self, passing: usize, count: usize) {
        *lock_shared(&self.plan) = FaultPlan {
            passing,
            failing: count,
        };
    }

    /// Reject every write until [`WriteFault::clear`].
    pub fn fail_always(&self) {
        self.fail_next(usize::MAX);
    }

    /// Accept every write again.
    pub fn clear(&self) {
        *lock_shared(&self.plan) = FaultPlan::default();
    }

    fn check(&self, addr: u16) -> Result<()> {
        let mut plan = lock_shared(&self.plan);
        if plan.failing == 0 {
            return Ok(());
        }
        if plan.passing > 0 {
            plan.passing -= 1;
            return Ok(());
        }
        plan.failing -= 1;
        Err(HardwareError::other(format!("EEPROM write at 0x{addr:03X} failed")))
    }
}

impl MemoryEeprom {
    /// Create an erased image of the standard size.
    pub fn new() -> Self {
        Self::with_capacity(EEPROM_SIZE)
    }

    /// Create an erased image of `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::from_bytes(vec![ERASED_BYTE; capacity])
    }

    /// Wrap an existing image.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            writes: 0,
            fault: WriteFault::default(),
        }
    }

    /// Raw image contents.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Number of write calls that modified the image.
    pub fn write_count(&self) -> usize {
        self.writes
    }

    /// Handle for injecting write failures.
    pub fn write_fault(&self) -> WriteFault {
        self.fault.clone()
    }

    /// Translate a block access into an index range.
    ///
    /// # Errors
    ///
    /// Returns `HardwareError::AddressOutOfRange` if the block does not fit.
    pub fn span(&self, addr: u16, len: usize) -> Result<std::ops::Range<usize>> {
        let start = usize::from(addr);
        match start.checked_add(len) {
            Some(end) if end <= self.bytes.len() => Ok(start..end),
            _ => Err(HardwareError::out_of_range(addr, len, self.bytes.len())),
        }
    }
}

impl PartialEq for MemoryEeprom {
    fn eq(&self, other: &Self) -> bool {
        self.bytes == other.bytes && self.writes == other.writes
    }
}

impl Eq for MemoryEeprom {}

impl Default for MemoryEeprom {
    fn default() -> Self {
        Self::new()
    }
}

impl Eeprom for MemoryEeprom {
    fn capacity(&self) -> usize {
        self.bytes.len()
    }

    fn read_byte(&self, addr: u16) -> Result<u8> {
        let range = self.span(addr, 1)?;
        Ok(self.bytes[range.start])
    }

    fn write_byte(&mut self, addr: u16, value: u8) -> Result<()> {
        let range = self.span(addr, 1)?;
        self.fault.check(addr)?;
        self.bytes[range.start] = value;
        self.writes += 1;
        Ok(())
    }

    fn read_block(&self, addr: u16, buf: &mut [u8]) -> Result<()> {
        let range = self.span(addr, buf.len())?;
        buf.copy_from_slice(&self.bytes[range]);
        Ok(())
    }

    fn write_block(&mut self, addr: u16, bytes: &[u8]) -> Result<()> {
        let range = self.span(addr, bytes.len())?;
        self.fault.check(addr)?;
        self.bytes[range].copy_from_slice(bytes);
        self.writes += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_image_is_erased() {
        let eeprom = MemoryEeprom::new();
        assert_eq!(eeprom.capacity(), EEPROM_SIZE);
        assert!(eeprom.as_bytes().iter().all(|&b| b == ERASED_BYTE));
        assert_eq!(eeprom.write_count(), 0);
    }

    #[test]
    fn test_byte_round_trip() {
        let mut eeprom = MemoryEeprom::new();
        eeprom.write_byte(511, 7).unwrap();
        assert_eq!(eeprom.read_byte(511).unwrap(), 7);
    }

    #[test]
    fn test_out_of_range_access() {
        let mut eeprom = MemoryEeprom::with_capacity(16);
        assert!(matches!(
            eeprom.read_byte(16),
            Err(HardwareError::AddressOutOfRange { .. })
        ));
        assert!(eeprom.write_block(10, &[0; 7]).is_err());

        let mut buf = [0u8; 8];
        assert!(eeprom.read_block(9, &mut buf).is_err());
        assert_eq!(eeprom.write_count(), 0);
    }

    #[test]
    fn test_block_at_end_of_region() {
        let mut eeprom = MemoryEeprom::with_capacity(16);
        eeprom.write_block(8, &[0xAA; 8]).unwrap();
        assert_eq!(&eeprom.as_bytes()[8..], &[0xAA; 8]);
    }

    #[test]
    fn test_write_fault_rejects_without_writing() {
        let mut eeprom = MemoryEeprom::with_capacity(16);
        let fault = eeprom.write_fault();
        fault.fail_next(2);

        assert!(matches!(
            eeprom.write_block(0, &[1, 2]),
            Err(HardwareError::Other(_))
        ));
        assert!(eeprom.write_byte(4, 9).is_err());
        assert!(eeprom.as_bytes().iter().all(|&b| b == ERASED_BYTE));
        assert_eq!(eeprom.write_count(), 0);

        eeprom.write_byte(4, 9).unwrap();
        assert_eq!(eeprom.write_count(), 1);
    }

    #[test]
    fn test_write_fault_shared_between_clones() {
        let mut eeprom = MemoryEeprom::with_capacity(16);
        let fault = eeprom.clone().write_fault();

        fault.fail_always();
        for addr in 0..4 {
            assert!(eeprom.write_byte(addr, 1).is_err());
        }

        fault.clear();
        assert!(eeprom.write_byte(0, 1).is_ok());
    }

    #[test]
    fn test_reads_ignore_write_fault() {
        let eeprom = MemoryEeprom::with_capacity(16);
        eeprom.write_fault().fail_always();
        assert_eq!(eeprom.read_byte(0).unwrap(), ERASED_BYTE);
    }
}
