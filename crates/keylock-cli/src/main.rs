//! keylock-cli - host simulator for the keylock controller
//!
//! Boots the controller on mock peripherals with a real EEPROM image file,
//! so the key registry persists between runs.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use keylock_core::{
    KeyToken, LockState, Mode,
    constants::{KEY_LENGTH, KEY_PAYLOAD_LENGTH},
    decode_hex,
};
use keylock_firmware::{Controller, CycleOutcome, FirmwareConfig, Peripherals};
use keylock_hardware::mock::{
    MemoryEeprom, MockBuzzer, MockJumpers, MockKeyReader, MockLock, valid_token,
};
use keylock_storage::{FileEeprom, FileEepromConfig, KeyRegistry, LoadStatus};
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// keylock-cli - run the lock controller against simulated hardware
#[derive(Parser, Debug)]
#[command(name = "keylock-cli")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error), overridden by RUST_LOG
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Boot the controller and present keys to it, one per cycle
    Run {
        /// EEPROM image file (created erased if missing)
        #[arg(long)]
        eeprom: PathBuf,

        /// Jumper from input A to ground
        #[arg(long)]
        jumper_a: bool,

        /// Jumper from input B to ground
        #[arg(long)]
        jumper_b: bool,

        /// Jumper bridging inputs A and B (Wipe mode)
        #[arg(long, conflicts_with_all = ["jumper_a", "jumper_b"])]
        bridged: bool,

        /// Start with the lock opened
        #[arg(long)]
        lock_opened: bool,

        /// Jam the lock so pulses do not move it
        #[arg(long)]
        jammed: bool,

        /// JSON file overriding timings and tones
        #[arg(long)]
        config: Option<PathBuf>,

        /// Keys to present, in hex. Seven bytes get their checksum appended;
        /// eight bytes are sent as-is.
        keys: Vec<String>,
    },

    /// List the keys stored in an EEPROM image
    Dump {
        /// EEPROM image file
        #[arg(long)]
        eeprom: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cli.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    match cli.command {
        Commands::Run {
            eeprom,
            jumper_a,
            jumper_b,
            bridged,
            lock_opened,
            jammed,
            config,
            keys,
        } => {
            let jumpers = if bridged {
                MockJumpers::bridged()
            } else {
                MockJumpers::grounded(jumper_a, jumper_b)
            };
            let lock_state = if lock_opened {
                LockState::Opened
            } else {
                LockState::Closed
            };
            let config = match config {
                Some(path) => load_config(&path)?,
                None => FirmwareConfig::default(),
            };
            let keys = keys
                .iter()
                .map(|k| parse_key(k))
                .collect::<Result<Vec<_>>>()?;

            run(&eeprom, jumpers, lock_state, jammed, config, &keys).await
        }
        Commands::Dump { eeprom } => dump(&eeprom),
    }
}

async fn run(
    eeprom_path: &Path,
    jumpers: MockJumpers,
    lock_state: LockState,
    jammed: bool,
    config: FirmwareConfig,
    keys: &[KeyToken],
) -> Result<()> {
    let eeprom = FileEeprom::open(FileEepromConfig::new(eeprom_path))
        .with_context(|| format!("Failed to open EEPROM image {}", eeprom_path.display()))?;

    let (reader, wake, handle) = MockKeyReader::new();
    let lock = MockLock::new(lock_state);
    lock.set_jammed(jammed);
    let buzzer = MockBuzzer::new();

    let peripherals = Peripherals {
        reader,
        wake,
        eeprom,
        relays: lock.clone(),
        sensor: lock.clone(),
        buzzer: buzzer.clone(),
    };
    let mut controller = Controller::boot(peripherals, jumpers, config)
        .await
        .context("Controller failed to boot")?;

    println!(
        "mode {} ({} keys registered), lock {}",
        controller.mode(),
        controller.registry().len(),
        lock.state()
    );

    for key in keys {
        buzzer.clear();
        handle.present_key(key).await?;
        let outcome = controller.run_cycle().await?;

        println!("{}", describe(key, &outcome, &buzzer.tones(), lock.state()));
    }

    info!("{} presentations processed", keys.len());
    Ok(())
}

fn dump(eeprom_path: &Path) -> Result<()> {
    let image = FileEeprom::open(FileEepromConfig::new(eeprom_path).create_if_missing(false))
        .with_context(|| format!("Failed to open EEPROM image {}", eeprom_path.display()))?;

    // Load from a copy so a corrupted image is reported, not wiped
    let mut registry = KeyRegistry::new(MemoryEeprom::from_bytes(image.as_bytes().to_vec()))?;
    match registry.load()? {
        LoadStatus::Loaded { count } => println!("{} keys registered", count),
        LoadStatus::Recovered { stored_count } => {
            println!(
                "stored key count {} is out of range; the image will be wiped at boot",
                stored_count
            );
            return Ok(());
        }
    }

    for (slot, key) in registry.keys().iter().enumerate() {
        println!("{:2}: {}", slot, key);
    }
    Ok(())
}

fn load_config(path: &Path) -> Result<FirmwareConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let config: FirmwareConfig = serde_json::from_str(&text)
        .with_context(|| format!("Invalid config {}", path.display()))?;
    config.validate()?;
    Ok(config)
}

/// Parse a hex key: seven bytes get their checksum appended, eight are
/// taken verbatim so corrupted frames can be presented too.
fn parse_key(text: &str) -> Result<KeyToken> {
    let bytes = decode_hex(text)?;
    match bytes.len() {
        KEY_PAYLOAD_LENGTH => {
            let mut payload = [0u8; KEY_PAYLOAD_LENGTH];
            payload.copy_from_slice(&bytes);
            Ok(valid_token(payload))
        }
        KEY_LENGTH => Ok(text.parse()?),
        n => bail!(
            "key '{}' has {} bytes, expected {} or {}",
            text,
            n,
            KEY_PAYLOAD_LENGTH,
            KEY_LENGTH
        ),
    }
}

fn describe(key: &KeyToken, outcome: &CycleOutcome, tones: &[u16], lock: LockState) -> String {
    let result = match outcome {
        CycleOutcome::NoFrame => "discarded (invalid frame)".to_string(),
        CycleOutcome::Processed { mode, success, .. } => {
            let verdict = match success {
                Some(true) => "ok",
                Some(false) => "rejected",
                None => "ignored",
            };
            match mode {
                Mode::Normal => format!("{verdict}, lock {lock}"),
                _ => verdict.to_string(),
            }
        }
    };
    format!("{key}  {result}  tones {tones:?}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_payload_appends_checksum() {
        let token = parse_key("01 02 1C B8 01 00 00").unwrap();
        assert_eq!(
            token.as_bytes(),
            &[0x01, 0x02, 0x1C, 0xB8, 0x01, 0x00, 0x00, 0xA2]
        );
    }

    #[test]
    fn test_parse_full_frame_verbatim() {
        let token = parse_key("01:02:1C:B8:01:00:00:00").unwrap();
        assert_eq!(token.as_bytes()[KEY_LENGTH - 1], 0x00);
    }

    #[test]
    fn test_parse_rejects_wrong_length() {
        assert!(parse_key("01 02 03").is_err());
        assert!(parse_key("zz").is_err());
    }

    #[test]
    fn test_describe() {
        let key = valid_token([0x01, 0x02, 0x1C, 0xB8, 0x01, 0x00, 0x00]);
        let outcome = CycleOutcome::Processed {
            token: key,
            mode: Mode::Normal,
            success: Some(true),
        };
        assert_eq!(
            describe(&key, &outcome, &[2000], LockState::Opened),
            "01 02 1C B8 01 00 00 A2  ok, lock Opened  tones [2000]"
        );
        assert_eq!(
            describe(&key, &CycleOutcome::NoFrame, &[], LockState::Closed),
            "01 02 1C B8 01 00 00 A2  discarded (invalid frame)  tones []"
        );
    }

    #[test]
    fn test_cli_rejects_bridge_with_jumper() {
        let result = Cli::try_parse_from([
            "keylock-cli",
            "run",
            "--eeprom",
            "lock.eeprom",
            "--bridged",
            "--jumper-a",
        ]);
        assert!(result.is_err());
    }
}
