//! Domain model of the VFD drive
//!
//! Register layout, the register codec, operator setpoints and master-side
//! telemetry. Shared by the master and the slave simulator; performs no I/O.

pub mod codec;
pub mod registers;
pub mod setpoint;
pub mod telemetry;

pub use codec::{decode_monitor_block, encode_control_word, MonitorReading};
pub use registers::{MonitorBlock, MonitorField, MONITOR_LEN};
pub use setpoint::{clamp_frequency, Direction, FrequencyStep, RangeRejected, Setpoint};
pub use telemetry::{StatusCode, StatusMessage, Telemetry, TelemetryPayload};
