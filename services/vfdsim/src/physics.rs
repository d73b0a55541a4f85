//! First-order drive model
//!
//! Frequency ramps toward the commanded target while running and coasts down
//! while stopped. Speed, current and voltage follow frequency linearly.

use vfd_model::codec::encode_monitor_value;
use vfd_model::MonitorField;

/// Hz gained or shed per tick while running
pub const RAMP_STEP_HZ: f64 = 0.5;
/// Hz shed per tick while stopped
pub const COAST_STEP_HZ: f64 = 1.0;

pub const RPM_PER_HZ: f64 = 30.0;
pub const HZ_PER_AMP: f64 = 10.0;
pub const VOLTS_PER_HZ: f64 = 3.8;

/// Physical state of the simulated drive
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DrivePhysics {
    /// Hz
    pub frequency: f64,
    pub rpm: f64,
    /// A
    pub current: f64,
    /// V
    pub voltage: f64,
}

impl DrivePhysics {
    /// Advance one tick
    ///
    /// `target_hz` is ignored while stopped.
    pub fn step(&mut self, running: bool, target_hz: f64) {
        if running {
            if self.frequency < target_hz {
                self.frequency = (self.frequency + RAMP_STEP_HZ).min(target_hz);
            } else if self.frequency > target_hz {
                self.frequency = (self.frequency - RAMP_STEP_HZ).max(target_hz);
            }
        } else {
            self.frequency = (self.frequency - COAST_STEP_HZ).max(0.0);
        }

        if self.frequency > 0.0 {
            self.rpm = self.frequency * RPM_PER_HZ;
            self.current = self.frequency / HZ_PER_AMP;
            self.voltage = self.frequency * VOLTS_PER_HZ;
        } else {
            self.frequency = 0.0;
            self.rpm = 0.0;
            self.current = 0.0;
            self.voltage = 0.0;
        }
    }

    /// Register values for the tick-owned monitor fields
    pub fn monitor_registers(&self) -> [(MonitorField, u16); 4] {
        [
            (
                MonitorField::Frequency,
                encode_monitor_value(MonitorField::Frequency, self.frequency),
            ),
            (
                MonitorField::Current,
                encode_monitor_value(MonitorField::Current, self.current),
            ),
            (
                MonitorField::Voltage,
                encode_monitor_value(MonitorField::Voltage, self.voltage),
            ),
            (
                MonitorField::Rpm,
                encode_monitor_value(MonitorField::Rpm, self.rpm),
            ),
        ]
    }
}
