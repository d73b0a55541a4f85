//! Master configuration
//!
//! Loaded from an optional YAML/TOML/JSON file and `VFDMASTER_` environment
//! variables, e.g. `VFDMASTER_POLL_DIVISOR=5`.

use std::path::Path;
use std::time::Duration;

use common::{config_loader, LoggingConfig, SerialConfig};
use errors::{invalid_config, VfdResult};
use serde::{Deserialize, Serialize};

pub const ENV_PREFIX: &str = "VFDMASTER_";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MasterConfig {
    pub serial: SerialConfig,
    pub slave_id: u8,
    /// Per-transaction response timeout
    pub response_timeout_ms: u64,
    /// Service cycle period
    pub cycle_period_ms: u64,
    /// Poll telemetry every Nth cycle
    pub poll_divisor: u32,
    /// Skip the frequency write of a combined update when the control write
    /// in the same cycle failed with a timeout or I/O error
    pub suppress_freq_after_link_failure: bool,
    pub logging: LoggingConfig,
}

impl Default for MasterConfig {
    fn default() -> Self {
        Self {
            serial: SerialConfig::on_device("/dev/ttyS4"),
            slave_id: 2,
            response_timeout_ms: 500,
            cycle_period_ms: 20,
            poll_divisor: 11,
            suppress_freq_after_link_failure: false,
            logging: LoggingConfig::default(),
        }
    }
}

impl MasterConfig {
    pub fn load(path: Option<&Path>) -> VfdResult<Self> {
        config_loader::load_config(path, ENV_PREFIX)
    }

    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }

    pub fn cycle_period(&self) -> Duration {
        Duration::from_millis(self.cycle_period_ms)
    }

    pub fn validate(&self) -> VfdResult<()> {
        self.serial.validate()?;
        if !(1..=247).contains(&self.slave_id) {
            return Err(invalid_config!("slave_id", "must be within 1..=247"));
        }
        if !(1..=5000).contains(&self.response_timeout_ms) {
            return Err(invalid_config!(
                "response_timeout_ms",
                "must be within 1..=5000"
            ));
        }
        if self.cycle_period_ms == 0 {
            return Err(invalid_config!("cycle_period_ms", "must be greater than zero"));
        }
        if self.poll_divisor == 0 {
            return Err(invalid_config!("poll_divisor", "must be greater than zero"));
        }
        Ok(())
    }
}
