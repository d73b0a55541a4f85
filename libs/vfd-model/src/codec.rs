//! Register codec: setpoint to control word, monitor block to readings
//!
//! Pure functions, no I/O.

use crate::registers::{MonitorBlock, MonitorField};
use crate::setpoint::{Direction, Setpoint};

/// Control word bits 0-1 pattern for RUN
pub const RUN_MASK: u16 = 0b10;
/// Control word bits 0-1 pattern for STOP
pub const STOP_BITS: u16 = 0b01;
/// Control word bit 4, set for reverse rotation
pub const DIRECTION_BIT: u16 = 1 << 4;

/// Encode the control word for a setpoint
///
/// Always one of `0x01`, `0x11`, `0x02`, `0x12`.
pub fn encode_control_word(setpoint: &Setpoint) -> u16 {
    let run_bits = if setpoint.run_state {
        RUN_MASK
    } else {
        STOP_BITS
    };
    let direction_bit = match setpoint.direction {
        Direction::Forward => 0,
        Direction::Reverse => DIRECTION_BIT,
    };
    run_bits | direction_bit
}

/// Control word written on shutdown (stop, forward)
pub fn stop_command() -> u16 {
    encode_control_word(&Setpoint::default())
}

/// Whether a raw control word commands the drive to run
pub fn is_run_commanded(control_word: u16) -> bool {
    control_word & RUN_MASK == RUN_MASK
}

/// Decoded monitor values in engineering units
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MonitorReading {
    /// Hz
    pub frequency: f64,
    /// A
    pub current: f64,
    /// V
    pub voltage: f64,
    pub rpm: u16,
}

fn scaled(raw: &MonitorBlock, field: MonitorField) -> f64 {
    f64::from(raw[field.index()]) / field.scale()
}

/// Decode a raw monitor block
///
/// Depends on block indices 0, 1, 3 and 9 only.
pub fn decode_monitor_block(raw: &MonitorBlock) -> MonitorReading {
    MonitorReading {
        frequency: scaled(raw, MonitorField::Frequency),
        current: scaled(raw, MonitorField::Current),
        voltage: scaled(raw, MonitorField::Voltage),
        rpm: raw[MonitorField::Rpm.index()],
    }
}

/// Scale an engineering value into its register form, truncating and saturating
pub fn encode_monitor_value(field: MonitorField, value: f64) -> u16 {
    // `as` saturates on overflow and maps NaN to 0
    (value * field.scale()) as u16
}
