//! EEPROM image persisted to a file.
//!
//! Lets the controller run on a host with registry state surviving across
//! runs. The whole image is held in memory; every write goes to the file
//! and is synced before the in-memory image changes, so a failed write
//! leaves both untouched from the reader's point of view.

use crate::error::{StorageError, StorageResult};
use keylock_core::constants::EEPROM_SIZE;
use keylock_hardware::{Eeprom, HardwareError, mock::MemoryEeprom};
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// File-backed EEPROM configuration
#[derive(Debug, Clone)]
pub struct FileEepromConfig {
    /// Path to the image file
    pub path: PathBuf,

    /// Image size in bytes
    pub capacity: usize,

    /// Whether to create an erased image if the file doesn't exist
    pub create_if_missing: bool,
}

impl FileEepromConfig {
    /// Create a configuration for a standard-size image at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            capacity: EEPROM_SIZE,
            create_if_missing: true,
        }
    }

    /// Set the image size
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Set whether to create the image if it doesn't exist
    pub fn create_if_missing(mut self, create: bool) -> Self {
        self.create_if_missing = create;
        self
    }
}

/// EEPROM backed by an image file.
///
/// # Examples
///
/// ```no_run
/// use keylock_storage::{FileEeprom, FileEepromConfig, KeyRegistry};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let eeprom = FileEeprom::open(FileEepromConfig::new("lock.eeprom"))?;
/// let mut registry = KeyRegistry::new(eeprom)?;
/// registry.load()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct FileEeprom {
    image: MemoryEeprom,
    file: File,
    path: PathBuf,
}

impl FileEeprom {
    /// Open the image described by `config`.
    ///
    /// A missing file is created erased (all 0xFF) when
    /// `create_if_missing` is set.
    ///
    /// # Errors
    ///
    /// - `StorageError::Hardware` if the file cannot be opened, created or read
    /// - `StorageError::Layout` if an existing file is smaller than `capacity`
    pub fn open(config: FileEepromConfig) -> StorageResult<Self> {
        if !config.path.exists() {
            if !config.create_if_missing {
                let device = config.path.display().to_string();
                return Err(HardwareError::disconnected(device).into());
            }
            return Self::create(&config);
        }

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&config.path)
            .map_err(HardwareError::from)?;

        let mut bytes = Vec::with_capacity(config.capacity);
        file.read_to_end(&mut bytes).map_err(HardwareError::from)?;
        if bytes.len() < config.capacity {
            return Err(StorageError::Layout {
                required: config.capacity,
                available: bytes.len(),
            });
        }
        bytes.truncate(config.capacity);

        Ok(Self {
            image: MemoryEeprom::from_bytes(bytes),
            file,
            path: config.path,
        })
    }

    fn create(config: &FileEepromConfig) -> StorageResult<Self> {
        if let Some(parent) = config.path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent).map_err(HardwareError::from)?;
        }

        let image = MemoryEeprom::with_capacity(config.capacity);
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(&config.path)
            .map_err(HardwareError::from)?;
        file.write_all(image.as_bytes())
            .map_err(HardwareError::from)?;
        file.sync_all().map_err(HardwareError::from)?;

        info!(
            "Created erased EEPROM image at {} ({} bytes)",
            config.path.display(),
            config.capacity
        );

        Ok(Self {
            image,
            file,
            path: config.path.clone(),
        })
    }

    /// Path of the image file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current image contents
    pub fn as_bytes(&self) -> &[u8] {
        self.image.as_bytes()
    }

    fn persist(&mut self, addr: u16, bytes: &[u8]) -> keylock_hardware::Result<()> {
        let range = self.image.span(addr, bytes.len())?;
        self.file.seek(SeekFrom::Start(range.start as u64))?;
        self.file.write_all(bytes)?;
        self.file.sync_data()?;
        Ok(())
    }
}

impl Eeprom for FileEeprom {
    fn capacity(&self) -> usize {
        self.image.capacity()
    }

    fn read_byte(&self, addr: u16) -> keylock_hardware::Result<u8> {
        self.image.read_byte(addr)
    }

    fn write_byte(&mut self, addr: u16, value: u8) -> keylock_hardware::Result<()> {
        self.persist(addr, &[value])?;
        self.image.write_byte(addr, value)
    }

    fn read_block(&self, addr: u16, buf: &mut [u8]) -> keylock_hardware::Result<()> {
        self.image.read_block(addr, buf)
    }

    fn write_block(&mut self, addr: u16, bytes: &[u8]) -> keylock_hardware::Result<()> {
        self.persist(addr, bytes)?;
        self.image.write_block(addr, bytes)
    }
}
