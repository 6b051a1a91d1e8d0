//! Rig configuration: optical constants plus the servo bus settings.
//!
//! Stored as pretty JSON. Any field missing from the file falls back to the
//! reference bench value, so a file only needs the settings that differ:
//!
//! ```json
//! {
//!   "bus": { "device_path": "/dev/tty.usbserial-FT7WBAZG" }
//! }
//! ```

use std::path::Path;
use std::time::Duration;

use optics::OpticalConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dynamixel::{MAX_GOAL_POSITION, MAX_MOVING_SPEED, MAX_SERVO_ID};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Serial bus and motor assignment for the two mirror axes.
///
/// Motor 1 drives the mirror's y rotation, motor 2 its x rotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// Serial device (`/dev/ttyUSB0`, `COM3`, `/dev/tty.usbserial-*`)
    pub device_path: String,
    pub baud_rate: u32,
    pub motor_id_1: u8,
    pub motor_id_2: u8,
    /// Encoder tick of motor 1 at zero mirror rotation
    pub motor_offset_1: u16,
    /// Encoder tick of motor 2 at zero mirror rotation
    pub motor_offset_2: u16,
    /// Moving speed written before every goal position (0-255)
    pub moving_speed: u16,
    /// Pause after each target before the next one is commanded
    pub settle_delay_seconds: f64,
    /// Wait for and check a status packet after every write
    pub status_return: bool,
    /// Serial read timeout when waiting for status packets
    pub read_timeout_ms: u64,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            device_path: "/dev/ttyUSB0".to_string(),
            baud_rate: 1_000_000,
            motor_id_1: 10,
            motor_id_2: 11,
            motor_offset_1: 406,
            motor_offset_2: 842,
            moving_speed: 70,
            settle_delay_seconds: 0.3,
            status_return: false,
            read_timeout_ms: 100,
        }
    }
}

impl BusConfig {
    /// Settle delay as a `Duration`; zero when the value cannot be represented.
    ///
    /// [`BusConfig::validate`] rejects such values.
    pub fn settle_delay(&self) -> Duration {
        Duration::try_from_secs_f64(self.settle_delay_seconds).unwrap_or_default()
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.device_path.is_empty() {
            return Err(ConfigError::Invalid("device_path is empty".to_string()));
        }
        if self.baud_rate == 0 {
            return Err(ConfigError::Invalid("baud_rate must be positive".to_string()));
        }
        for id in [self.motor_id_1, self.motor_id_2] {
            if id > MAX_SERVO_ID {
                return Err(ConfigError::Invalid(format!(
                    "motor id {id} exceeds {MAX_SERVO_ID}"
                )));
            }
        }
        if self.motor_id_1 == self.motor_id_2 {
            return Err(ConfigError::Invalid(format!(
                "both motors share id {}",
                self.motor_id_1
            )));
        }
        for offset in [self.motor_offset_1, self.motor_offset_2] {
            if offset > MAX_GOAL_POSITION {
                return Err(ConfigError::Invalid(format!(
                    "motor offset {offset} exceeds {MAX_GOAL_POSITION}"
                )));
            }
        }
        if self.moving_speed > MAX_MOVING_SPEED {
            return Err(ConfigError::Invalid(format!(
                "moving_speed {} exceeds {MAX_MOVING_SPEED}",
                self.moving_speed
            )));
        }
        Duration::try_from_secs_f64(self.settle_delay_seconds).map_err(|e| {
            ConfigError::Invalid(format!(
                "settle_delay_seconds {} is not a usable delay: {e}",
                self.settle_delay_seconds
            ))
        })?;
        Ok(())
    }
}

/// Everything needed to aim the mirror and drive its motors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RigConfig {
    pub optics: OpticalConfig,
    pub bus: BusConfig,
}

impl RigConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.optics
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        self.bus.validate()
    }

    /// Save to JSON file
    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load from JSON file and validate
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }
}
