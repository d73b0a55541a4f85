//! Register layout of the drive
//!
//! Addresses are absolute Modbus holding-register numbers. Only the control
//! word, the frequency command and five monitor registers carry meaning; the
//! rest of the 0x2000 window is inert storage.

/// Control word (run/stop bits 0-1, direction bit 4)
pub const REG_CONTROL_WORD: u16 = 0x2000;
/// Frequency command in hundredths of Hz
pub const REG_FREQ_CMD: u16 = 0x2001;
/// First register of the monitor block
pub const REG_MONITOR_START: u16 = 0x2103;
/// Number of registers read per telemetry poll
pub const MONITOR_LEN: usize = 10;

/// Raw monitor block as returned by one poll
pub type MonitorBlock = [u16; MONITOR_LEN];

/// Default slave register window
pub const DEFAULT_WINDOW_BASE: u16 = 0x2000;
pub const DEFAULT_WINDOW_SIZE: u16 = 300;

/// Fields inside the monitor block, discriminant = index from `REG_MONITOR_START`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MonitorField {
    /// Output frequency, hundredths of Hz
    Frequency = 0,
    /// Output current, tenths of A
    Current = 1,
    /// Output voltage, tenths of V
    Voltage = 3,
    /// Power-factor angle. Stored by the drive, never decoded
    PowerFactor = 7,
    /// Motor speed, unscaled
    Rpm = 9,
}

impl MonitorField {
    /// Index inside a [`MonitorBlock`]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Absolute register address
    pub const fn address(self) -> u16 {
        REG_MONITOR_START + self as u16
    }

    /// Divisor turning the raw register into engineering units
    pub const fn scale(self) -> f64 {
        match self {
            Self::Frequency => 100.0,
            Self::Current | Self::Voltage => 10.0,
            Self::PowerFactor | Self::Rpm => 1.0,
        }
    }
}

/// Monitor fields the master decodes, in block order
pub const DECODE_TABLE: [MonitorField; 4] = [
    MonitorField::Frequency,
    MonitorField::Current,
    MonitorField::Voltage,
    MonitorField::Rpm,
];

/// Monitor fields the slave tick derives from its physical state
pub const TICK_WRITTEN: [MonitorField; 4] = DECODE_TABLE;
