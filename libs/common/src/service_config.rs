//! Configuration sections shared by the master and the slave simulator

use std::path::PathBuf;

use errors::{invalid_config, VfdResult};
use serde::{Deserialize, Serialize};

use crate::logging::LogConfig;

/// Serial line settings
///
/// Both roles talk 8N1 at 38400 baud by default; only the device differs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Serial port path (e.g., "/dev/ttyS4", "/dev/ttyUSB1")
    pub device: String,
    pub baud_rate: u32,
    /// "none", "even" or "odd" (case-insensitive)
    pub parity: String,
    /// 5, 6, 7 or 8
    pub data_bits: u8,
    /// 1 or 2
    pub stop_bits: u8,
}

impl SerialConfig {
    /// Default line settings on the given device
    pub fn on_device(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> VfdResult<()> {
        if self.device.trim().is_empty() {
            return Err(invalid_config!("serial.device", "cannot be empty"));
        }
        if self.baud_rate == 0 {
            return Err(invalid_config!("serial.baud_rate", "must be greater than zero"));
        }
        if ![5, 6, 7, 8].contains(&self.data_bits) {
            return Err(invalid_config!("serial.data_bits", "must be 5, 6, 7, or 8"));
        }
        if ![1, 2].contains(&self.stop_bits) {
            return Err(invalid_config!("serial.stop_bits", "must be 1 or 2"));
        }
        if !["none", "even", "odd"].contains(&self.parity.to_lowercase().as_str()) {
            return Err(invalid_config!("serial.parity", "must be none, even, or odd"));
        }
        Ok(())
    }

    /// Short `38400 8N1` style description for banners and logs
    pub fn line_settings(&self) -> String {
        let parity = self
            .parity
            .chars()
            .next()
            .map(|c| c.to_ascii_uppercase())
            .unwrap_or('N');
        format!(
            "{} {}{}{}",
            self.baud_rate, self.data_bits, parity, self.stop_bits
        )
    }
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            device: "/dev/ttyUSB0".to_string(),
            baud_rate: 38400,
            parity: "none".to_string(),
            data_bits: 8,
            stop_bits: 1,
        }
    }
}

/// Logging section of a service config file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`info`, `debug`, `info,vfdmaster=trace`, ...)
    pub level: String,
    /// Write a daily rolling log file in addition to the console
    pub file: bool,
    /// Directory for log files
    pub dir: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: false,
            dir: PathBuf::from("logs"),
        }
    }
}

impl LoggingConfig {
    /// Build the runtime logger configuration for a service
    pub fn to_log_config(&self, service_name: &str, ansi: bool) -> LogConfig {
        LogConfig {
            service_name: service_name.to_string(),
            filter: self.level.clone(),
            ansi,
            log_dir: self.file.then(|| self.dir.join(service_name)),
        }
    }
}
