//! Persistent registry of authorized keys.
//!
//! [`KeyRegistry`] is a fixed-capacity, insertion-ordered set of
//! [`KeyToken`]s mirrored in EEPROM. It is the only component that writes to
//! the EEPROM.
//!
//! # Persistence
//!
//! The full key array is stored at [`KEY_ARRAY_ADDR`] and the live count at
//! [`KEY_COUNT_ADDR`]. Slots at or past the count may hold stale or zeroed
//! bytes; they are never treated as keys. Mutations write the array first
//! and the count second, so an interrupted write leaves the count pointing
//! at fully written entries only.
//!
//! The in-memory copy is only updated after both writes succeed, so a
//! failed write never leaves memory ahead of storage.

use keylock_core::{
    KeyToken,
    constants::{KEY_ARRAY_ADDR, KEY_ARRAY_SIZE, KEY_COUNT_ADDR, KEY_LENGTH, MAX_KEYS},
};
use keylock_hardware::Eeprom;
use tracing::{debug, warn};

use crate::error::{StorageError, StorageResult};

/// Outcome of [`KeyRegistry::load`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    /// Stored count was in range and the keys were loaded.
    Loaded { count: usize },

    /// Stored count was out of range; storage was wiped.
    Recovered { stored_count: u8 },
}

/// Bounded, persisted set of authorized keys.
///
/// # Examples
///
/// ```
/// use keylock_core::KeyToken;
/// use keylock_hardware::mock::{MemoryEeprom, token_with_serial};
/// use keylock_storage::{KeyRegistry, LoadStatus};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut registry = KeyRegistry::new(MemoryEeprom::new())?;
///
/// // A factory-fresh EEPROM reads 0xFF, so the first load self-heals
/// assert!(matches!(registry.load()?, LoadStatus::Recovered { stored_count: 0xFF }));
///
/// let key = token_with_serial([0xDE, 0xAD, 0xBE, 0xEF, 0x00, 0x01]);
/// registry.add(key)?;
/// assert!(registry.contains(&key));
///
/// registry.remove(&key)?;
/// assert!(registry.is_empty());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct KeyRegistry<E> {
    eeprom: E,
    keys: [KeyToken; MAX_KEYS],
    count: usize,
}

impl<E: Eeprom> KeyRegistry<E> {
    /// Create an empty registry backed by `eeprom`.
    ///
    /// Nothing is read until [`load`](Self::load) is called.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Layout` if the EEPROM cannot hold the key
    /// array and the count byte.
    pub fn new(eeprom: E) -> StorageResult<Self> {
        let required = usize::from(KEY_COUNT_ADDR) + 1;
        let available = eeprom.capacity();
        if available < required {
            return Err(StorageError::Layout {
                required,
                available,
            });
        }

        Ok(Self {
            eeprom,
            keys: [KeyToken::ZERO; MAX_KEYS],
            count: 0,
        })
    }

    /// Load the registry from EEPROM.
    ///
    /// A stored count above [`MAX_KEYS`] means the store is corrupted (or
    /// was never written): the registry wipes itself before loading.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Hardware` if the EEPROM cannot be read or,
    /// during recovery, written.
    pub fn load(&mut self) -> StorageResult<LoadStatus> {
        let stored_count = self.eeprom.read_byte(KEY_COUNT_ADDR)?;

        let status = if usize::from(stored_count) > MAX_KEYS {
            warn!(
                "Stored key count {} exceeds capacity {}, wiping registry",
                stored_count, MAX_KEYS
            );
            self.wipe()?;
            LoadStatus::Recovered { stored_count }
        } else {
            LoadStatus::Loaded {
                count: usize::from(stored_count),
            }
        };

        let mut raw = [0u8; KEY_ARRAY_SIZE];
        self.eeprom.read_block(KEY_ARRAY_ADDR, &mut raw)?;
        self.keys = decode(&raw);
        self.count = match status {
            LoadStatus::Loaded { count } => count,
            LoadStatus::Recovered { .. } => 0,
        };

        debug!("Loaded {} keys from EEPROM", self.count);
        Ok(status)
    }

    /// Returns `true` if `token` is a live entry.
    pub fn contains(&self, token: &KeyToken) -> bool {
        self.position(token).is_some()
    }

    /// Append `token` to the registry and persist it.
    ///
    /// # Errors
    ///
    /// - `StorageError::Duplicate` if the key is already registered
    /// - `StorageError::Full` if the registry holds [`MAX_KEYS`] keys
    /// - `StorageError::Hardware` if the EEPROM write fails
    ///
    /// Rejections leave memory and EEPROM untouched.
    pub fn add(&mut self, token: KeyToken) -> StorageResult<()> {
        if self.contains(&token) {
            return Err(StorageError::Duplicate);
        }
        if self.is_full() {
            return Err(StorageError::Full { capacity: MAX_KEYS });
        }

        let mut keys = self.keys;
        keys[self.count] = token;
        self.commit(keys, self.count + 1)?;

        debug!("Added key {} ({} registered)", token, self.count);
        Ok(())
    }

    /// Remove `token`, shifting later entries down to keep their order, and
    /// persist the result.
    ///
    /// The slot vacated at the end of the live range is zeroed.
    ///
    /// # Errors
    ///
    /// - `StorageError::NotFound` if the key is not registered
    /// - `StorageError::Hardware` if the EEPROM write fails
    ///
    /// Rejections leave memory and EEPROM untouched.
    pub fn remove(&mut self, token: &KeyToken) -> StorageResult<()> {
        let index = self.position(token).ok_or(StorageError::NotFound)?;
        let last = self.count - 1;

        let mut keys = self.keys;
        keys.copy_within(index + 1..self.count, index);
        keys[last] = KeyToken::ZERO;
        self.commit(keys, last)?;

        debug!("Removed key {} ({} registered)", token, self.count);
        Ok(())
    }

    /// Clear the registry: count to zero and every array byte to zero.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Hardware` if the EEPROM write fails.
    pub fn wipe(&mut self) -> StorageResult<()> {
        self.eeprom.write_byte(KEY_COUNT_ADDR, 0)?;
        self.eeprom.write_block(KEY_ARRAY_ADDR, &[0u8; KEY_ARRAY_SIZE])?;

        self.keys = [KeyToken::ZERO; MAX_KEYS];
        self.count = 0;
        Ok(())
    }

    /// Live entries in insertion order.
    pub fn keys(&self) -> &[KeyToken] {
        &self.keys[..self.count]
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.count
    }

    /// Returns `true` if no key is registered.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Returns `true` if no further key can be added.
    pub fn is_full(&self) -> bool {
        self.count == MAX_KEYS
    }

    /// Maximum number of keys.
    pub fn capacity(&self) -> usize {
        MAX_KEYS
    }

    /// Backing EEPROM.
    pub fn eeprom(&self) -> &E {
        &self.eeprom
    }

    /// Consume the registry and return the backing EEPROM.
    pub fn into_eeprom(self) -> E {
        self.eeprom
    }

    fn position(&self, token: &KeyToken) -> Option<usize> {
        self.keys().iter().position(|key| key == token)
    }

    /// Persist array then count, and adopt them in memory once both landed.
    fn commit(&mut self, keys: [KeyToken; MAX_KEYS], count: usize) -> StorageResult<()> {
        self.eeprom.write_block(KEY_ARRAY_ADDR, &encode(&keys))?;
        // count <= MAX_KEYS, which fits in the count byte
        self.eeprom.write_byte(KEY_COUNT_ADDR, count as u8)?;

        self.keys = keys;
        self.count = count;
        Ok(())
    }
}

fn encode(keys: &[KeyToken; MAX_KEYS]) -> [u8; KEY_ARRAY_SIZE] {
    let mut raw = [0u8; KEY_ARRAY_SIZE];
    for (slot, key) in raw.chunks_exact_mut(KEY_LENGTH).zip(keys) {
        slot.copy_from_slice(key.as_bytes());
    }
    raw
}

fn decode(raw: &[u8; KEY_ARRAY_SIZE]) -> [KeyToken; MAX_KEYS] {
    let mut keys = [KeyToken::ZERO; MAX_KEYS];
    for (key, slot) in keys.iter_mut().zip(raw.chunks_exact(KEY_LENGTH)) {
        let mut bytes = [0u8; KEY_LENGTH];
        bytes.copy_from_slice(slot);
        *key = KeyToken::from_bytes(bytes);
    }
    keys
}

#[cfg(test)]
mod tests {
    use super::*;
    use keylock_core::constants::{EEPROM_SIZE, ERASED_BYTE};
    use keylock_hardware::mock::{MemoryEeprom, token_with_serial};

    fn key(n: u8) -> KeyToken {
        token_with_serial([n, 0x11, 0x22, 0x33, 0x44, 0x55])
    }

    fn empty_image() -> MemoryEeprom {
        let mut bytes = vec![ERASED_BYTE; EEPROM_SIZE];
        bytes[..KEY_ARRAY_SIZE].fill(0);
        bytes[usize::from(KEY_COUNT_ADDR)] = 0;
        MemoryEeprom::from_bytes(bytes)
    }

    fn loaded(eeprom: MemoryEeprom) -> KeyRegistry<MemoryEeprom> {
        let mut registry = KeyRegistry::new(eeprom).unwrap();
        registry.load().unwrap();
        registry
    }

    fn persisted_slot(registry: &KeyRegistry<MemoryEeprom>, index: usize) -> &[u8] {
        let start = usize::from(KEY_ARRAY_ADDR) + index * KEY_LENGTH;
        &registry.eeprom().as_bytes()[start..start + KEY_LENGTH]
    }

    fn persisted_count(registry: &KeyRegistry<MemoryEeprom>) -> u8 {
        registry.eeprom().as_bytes()[usize::from(KEY_COUNT_ADDR)]
    }

    #[test]
    fn test_rejects_small_eeprom() {
        let result = KeyRegistry::new(MemoryEeprom::with_capacity(256));
        assert!(matches!(
            result,
            Err(StorageError::Layout {
                required: 512,
                available: 256
            })
        ));
    }

    #[test]
    fn test_load_empty_image() {
        let mut registry = KeyRegistry::new(empty_image()).unwrap();
        assert_eq!(registry.load().unwrap(), LoadStatus::Loaded { count: 0 });
        assert!(registry.is_empty());
        assert_eq!(registry.eeprom().write_count(), 0);
    }

    #[test]
    fn test_erased_eeprom_self_heals() {
        let mut registry = KeyRegistry::new(MemoryEeprom::new()).unwrap();
        assert_eq!(
            registry.load().unwrap(),
            LoadStatus::Recovered { stored_count: 0xFF }
        );
        assert!(registry.is_empty());
        assert_eq!(persisted_count(&registry), 0);
        assert!(
            registry.eeprom().as_bytes()[..KEY_ARRAY_SIZE]
                .iter()
                .all(|&b| b == 0)
        );
    }

    #[test]
    fn test_out_of_range_count_wipes_before_use() {
        let mut image = empty_image();
        image.write_block(KEY_ARRAY_ADDR, key(1).as_bytes()).unwrap();
        image.write_byte(KEY_COUNT_ADDR, 200).unwrap();

        let mut registry = KeyRegistry::new(image).unwrap();
        assert_eq!(
            registry.load().unwrap(),
            LoadStatus::Recovered { stored_count: 200 }
        );
        assert!(!registry.contains(&key(1)));
        assert_eq!(persisted_count(&registry), 0);
        assert_eq!(persisted_slot(&registry, 0), &[0u8; KEY_LENGTH]);
    }

    #[test]
    fn test_count_at_capacity_is_valid() {
        let mut image = empty_image();
        for i in 0..MAX_KEYS {
            let addr = KEY_ARRAY_ADDR + (i * KEY_LENGTH) as u16;
            image.write_block(addr, key(i as u8).as_bytes()).unwrap();
        }
        image.write_byte(KEY_COUNT_ADDR, MAX_KEYS as u8).unwrap();

        let registry = loaded(image);
        assert_eq!(registry.len(), MAX_KEYS);
        assert!(registry.contains(&key(9)));
    }

    #[test]
    fn test_stale_slots_past_count_are_ignored() {
        let mut image = empty_image();
        image.write_block(KEY_ARRAY_ADDR, key(1).as_bytes()).unwrap();
        image
            .write_block(KEY_ARRAY_ADDR + KEY_LENGTH as u16, key(2).as_bytes())
            .unwrap();
        image.write_byte(KEY_COUNT_ADDR, 1).unwrap();

        let registry = loaded(image);
        assert!(registry.contains(&key(1)));
        assert!(!registry.contains(&key(2)));
        assert_eq!(registry.keys(), &[key(1)]);
    }

    #[test]
    fn test_add_persists_array_and_count() {
        let mut registry = loaded(empty_image());

        registry.add(key(1)).unwrap();
        registry.add(key(2)).unwrap();

        assert_eq!(registry.keys(), &[key(1), key(2)]);
        assert_eq!(persisted_count(&registry), 2);
        assert_eq!(persisted_slot(&registry, 0), key(1).as_bytes());
        assert_eq!(persisted_slot(&registry, 1), key(2).as_bytes());
    }

    #[test]
    fn test_add_duplicate_is_rejected() {
        let mut registry = loaded(empty_image());
        registry.add(key(1)).unwrap();
        let before = registry.eeprom().clone();

        let result = registry.add(key(1));
        assert!(matches!(result, Err(StorageError::Duplicate)));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.eeprom().as_bytes(), before.as_bytes());
        assert_eq!(registry.eeprom().write_count(), before.write_count());
    }

    #[test]
    fn test_eleventh_key_is_rejected() {
        let mut registry = loaded(empty_image());
        for i in 0..MAX_KEYS {
            registry.add(key(i as u8)).unwrap();
        }
        assert!(registry.is_full());
        let before = registry.eeprom().clone();

        let result = registry.add(key(0xAA));
        assert!(matches!(result, Err(StorageError::Full { capacity: 10 })));
        assert_eq!(registry.len(), MAX_KEYS);
        assert_eq!(persisted_count(&registry), MAX_KEYS as u8);
        let expected: Vec<KeyToken> = (0..MAX_KEYS).map(|i| key(i as u8)).collect();
        assert_eq!(registry.keys(), expected.as_slice());
        assert_eq!(registry.eeprom().as_bytes(), before.as_bytes());
    }

    #[test]
    fn test_remove_missing_key_changes_nothing() {
        let mut registry = loaded(empty_image());
        registry.add(key(1)).unwrap();
        let before = registry.eeprom().clone();

        let result = registry.remove(&key(2));
        assert!(matches!(result, Err(StorageError::NotFound)));
        assert_eq!(registry.keys(), &[key(1)]);
        assert_eq!(registry.eeprom().as_bytes(), before.as_bytes());
        assert_eq!(registry.eeprom().write_count(), before.write_count());
    }

    #[test]
    fn test_remove_shifts_and_zeroes_one_trailing_slot() {
        let mut registry = loaded(empty_image());
        for i in 1..=4 {
            registry.add(key(i)).unwrap();
        }

        registry.remove(&key(2)).unwrap();

        assert_eq!(registry.keys(), &[key(1), key(3), key(4)]);
        assert_eq!(persisted_count(&registry), 3);
        assert_eq!(persisted_slot(&registry, 0), key(1).as_bytes());
        assert_eq!(persisted_slot(&registry, 1), key(3).as_bytes());
        assert_eq!(persisted_slot(&registry, 2), key(4).as_bytes());
        assert_eq!(persisted_slot(&registry, 3), &[0u8; KEY_LENGTH]);
    }

    #[test]
    fn test_remove_last_and_only_keys() {
        let mut registry = loaded(empty_image());
        registry.add(key(1)).unwrap();
        registry.add(key(2)).unwrap();

        registry.remove(&key(2)).unwrap();
        assert_eq!(registry.keys(), &[key(1)]);
        assert_eq!(persisted_slot(&registry, 1), &[0u8; KEY_LENGTH]);

        registry.remove(&key(1)).unwrap();
        assert!(registry.is_empty());
        assert_eq!(persisted_count(&registry), 0);
        assert_eq!(persisted_slot(&registry, 0), &[0u8; KEY_LENGTH]);
    }

    #[test]
    fn test_remove_from_full_registry() {
        let mut registry = loaded(empty_image());
        for i in 0..MAX_KEYS {
            registry.add(key(i as u8)).unwrap();
        }

        registry.remove(&key(0)).unwrap();
        assert_eq!(registry.len(), MAX_KEYS - 1);
        assert_eq!(registry.keys()[0], key(1));
        assert_eq!(persisted_slot(&registry, MAX_KEYS - 1), &[0u8; KEY_LENGTH]);

        registry.add(key(0xAA)).unwrap();
        assert!(registry.is_full());
    }

    #[test]
    fn test_failed_add_leaves_registry_unchanged() {
        let mut registry = loaded(empty_image());
        registry.add(key(1)).unwrap();
        registry.eeprom().write_fault().fail_next(1);

        let result = registry.add(key(2));
        assert!(matches!(result, Err(StorageError::Hardware(_))));
        assert!(!result.unwrap_err().is_rejection());
        assert_eq!(registry.keys(), &[key(1)]);
        assert!(!registry.contains(&key(2)));
        assert_eq!(persisted_count(&registry), 1);
        assert_eq!(persisted_slot(&registry, 1), &[0u8; KEY_LENGTH]);

        registry.add(key(2)).unwrap();
        assert_eq!(registry.keys(), &[key(1), key(2)]);
    }

    #[test]
    fn test_add_interrupted_before_count_write() {
        let mut registry = loaded(empty_image());
        registry.add(key(1)).unwrap();
        registry.eeprom().write_fault().fail_after(1, 1);

        assert!(registry.add(key(2)).is_err());

        // The array block landed, the count did not
        assert_eq!(persisted_slot(&registry, 1), key(2).as_bytes());
        assert_eq!(persisted_count(&registry), 1);
        assert_eq!(registry.keys(), &[key(1)]);

        let reloaded = loaded(registry.into_eeprom());
        assert_eq!(reloaded.keys(), &[key(1)]);
        assert!(!reloaded.contains(&key(2)));
    }

    #[test]
    fn test_failed_remove_keeps_key() {
        let mut registry = loaded(empty_image());
        registry.add(key(1)).unwrap();
        registry.add(key(2)).unwrap();
        registry.eeprom().write_fault().fail_next(1);

        assert!(matches!(
            registry.remove(&key(1)),
            Err(StorageError::Hardware(_))
        ));
        assert_eq!(registry.keys(), &[key(1), key(2)]);
        assert_eq!(persisted_slot(&registry, 0), key(1).as_bytes());

        registry.remove(&key(1)).unwrap();
        assert_eq!(registry.keys(), &[key(2)]);
    }

    #[test]
    fn test_membership_follows_add_remove_wipe() {
        let mut registry = loaded(empty_image());

        registry.add(key(1)).unwrap();
        registry.add(key(2)).unwrap();
        assert!(registry.contains(&key(1)));
        assert!(registry.contains(&key(2)));

        registry.remove(&key(1)).unwrap();
        assert!(!registry.contains(&key(1)));
        assert!(registry.contains(&key(2)));

        registry.add(key(1)).unwrap();
        assert_eq!(registry.keys(), &[key(2), key(1)]);

        registry.wipe().unwrap();
        assert!(!registry.contains(&key(1)));
        assert!(!registry.contains(&key(2)));
    }

    #[test]
    fn test_wipe_then_load_is_empty_and_zeroed() {
        let mut registry = loaded(empty_image());
        registry.add(key(1)).unwrap();
        registry.add(key(2)).unwrap();

        registry.wipe().unwrap();
        let mut reloaded = KeyRegistry::new(registry.into_eeprom()).unwrap();
        assert_eq!(reloaded.load().unwrap(), LoadStatus::Loaded { count: 0 });

        assert!(reloaded.is_empty());
        assert!(
            reloaded.eeprom().as_bytes()[..KEY_ARRAY_SIZE]
                .iter()
                .all(|&b| b == 0)
        );
    }

    #[test]
    fn test_reload_preserves_order() {
        let mut registry = loaded(empty_image());
        for i in [5, 3, 9] {
            registry.add(key(i)).unwrap();
        }

        let reloaded = loaded(registry.into_eeprom());
        assert_eq!(reloaded.keys(), &[key(5), key(3), key(9)]);
    }
}
