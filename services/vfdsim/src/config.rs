//! Simulator configuration
//!
//! Loaded from an optional YAML/TOML/JSON file and `VFDSIM_` environment
//! variables, e.g. `VFDSIM_SERIAL__DEVICE=/dev/ttyUSB1`.

use std::path::Path;
use std::time::Duration;

use common::{config_loader, LoggingConfig, SerialConfig};
use errors::{invalid_config, VfdResult};
use serde::{Deserialize, Serialize};
use vfd_model::registers::{
    MonitorField, DEFAULT_WINDOW_BASE, DEFAULT_WINDOW_SIZE, REG_CONTROL_WORD, REG_FREQ_CMD,
};

pub const ENV_PREFIX: &str = "VFDSIM_";

/// Register window served by the slave
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub base: u16,
    pub size: u16,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            base: DEFAULT_WINDOW_BASE,
            size: DEFAULT_WINDOW_SIZE,
        }
    }
}

impl WindowConfig {
    fn contains(&self, address: u16) -> bool {
        address >= self.base && u32::from(address - self.base) < u32::from(self.size)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub serial: SerialConfig,
    pub slave_id: u8,
    pub window: WindowConfig,
    pub tick_period_ms: u64,
    pub logging: LoggingConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            serial: SerialConfig::on_device("/dev/ttyUSB1"),
            slave_id: 2,
            window: WindowConfig::default(),
            tick_period_ms: 100,
            logging: LoggingConfig::default(),
        }
    }
}

impl SimConfig {
    pub fn load(path: Option<&Path>) -> VfdResult<Self> {
        config_loader::load_config(path, ENV_PREFIX)
    }

    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_period_ms)
    }

    pub fn validate(&self) -> VfdResult<()> {
        self.serial.validate()?;
        if !(1..=247).contains(&self.slave_id) {
            return Err(invalid_config!("slave_id", "must be within 1..=247"));
        }
        if self.tick_period_ms == 0 {
            return Err(invalid_config!("tick_period_ms", "must be greater than zero"));
        }
        let required = [
            REG_CONTROL_WORD,
            REG_FREQ_CMD,
            MonitorField::Frequency.address(),
            MonitorField::Rpm.address(),
        ];
        if let Some(missing) = required.iter().find(|a| !self.window.contains(**a)) {
            return Err(invalid_config!(
                "window",
                format!("does not contain register {:#06X}", missing)
            ));
        }
        Ok(())
    }
}
