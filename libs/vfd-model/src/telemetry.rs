//! Last-known drive state as seen by the master

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::codec::{decode_monitor_block, MonitorReading};
use crate::registers::{MonitorBlock, MONITOR_LEN};
use crate::setpoint::Setpoint;

/// Maximum status message length in bytes
pub const STATUS_MESSAGE_MAX: usize = 64;

pub const MSG_READ_FAIL: &str = "ERR: Read Timeout/Fail";
pub const MSG_WRITE_CMD_FAIL: &str = "ERR: Write CMD Fail";
pub const MSG_WRITE_FREQ_FAIL: &str = "ERR: Write Freq Fail";
pub const MSG_TELEMETRY_OK: &str = "Telemetry OK";

/// Outcome code of the most recent transaction
///
/// Numeric values are published as `last_msg_code`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusCode {
    ErrRead = 0,
    CommFail = 1,
    CommFreqFail = 2,
    SetFreq = 3,
    CommSuccess = 4,
}

impl StatusCode {
    pub const fn code(self) -> u8 {
        self as u8
    }

    pub fn is_error(self) -> bool {
        matches!(self, Self::ErrRead | Self::CommFail | Self::CommFreqFail)
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ErrRead => "ERR_READ",
            Self::CommFail => "COMM_FAIL",
            Self::CommFreqFail => "COMM_FREQ_FAIL",
            Self::SetFreq => "SET_FREQ",
            Self::CommSuccess => "COMM_SUCCESS",
        };
        f.write_str(name)
    }
}

/// Status text bounded to [`STATUS_MESSAGE_MAX`] bytes
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusMessage(String);

impl StatusMessage {
    /// Build a message, truncating on a char boundary if too long
    pub fn new(text: impl Into<String>) -> Self {
        let mut text = text.into();
        if text.len() > STATUS_MESSAGE_MAX {
            let mut end = STATUS_MESSAGE_MAX;
            while !text.is_char_boundary(end) {
                end -= 1;
            }
            text.truncate(end);
        }
        Self(text)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StatusMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Message shown after a successful frequency write
pub fn set_frequency_message(setpoint: &Setpoint) -> String {
    format!("Set Freq: {:.2} Hz", setpoint.target_hz())
}

/// Drive state mirrored by the master
///
/// Only the master's transaction steps mutate it.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Telemetry {
    pub raw: MonitorBlock,
    /// A
    pub output_current: f64,
    /// V
    pub output_voltage: f64,
    pub rpm: u16,
    /// Hz
    pub output_frequency: f64,
    pub comm_error: bool,
    pub status_code: Option<StatusCode>,
    pub status_message: StatusMessage,
    /// Last setpoint whose writes the drive acknowledged
    pub acknowledged: Setpoint,
}

impl Telemetry {
    /// Zeroed telemetry at startup
    pub fn new() -> Self {
        Self {
            raw: [0; MONITOR_LEN],
            ..Self::default()
        }
    }

    pub fn reading(&self) -> MonitorReading {
        MonitorReading {
            frequency: self.output_frequency,
            current: self.output_current,
            voltage: self.output_voltage,
            rpm: self.rpm,
        }
    }

    fn set_status(&mut self, code: StatusCode, message: impl Into<String>) {
        self.status_code = Some(code);
        self.status_message = StatusMessage::new(message);
    }

    /// Successful monitor poll
    pub fn apply_reading(&mut self, raw: MonitorBlock) {
        let recovered = self.comm_error;
        let reading = decode_monitor_block(&raw);
        self.raw = raw;
        self.output_frequency = reading.frequency;
        self.output_current = reading.current;
        self.output_voltage = reading.voltage;
        self.rpm = reading.rpm;
        self.comm_error = false;
        self.status_code = Some(StatusCode::CommSuccess);
        if recovered {
            self.status_message = StatusMessage::new(MSG_TELEMETRY_OK);
        }
    }

    /// Failed monitor poll; numeric fields stay as they were
    pub fn mark_read_failure(&mut self) {
        self.comm_error = true;
        self.set_status(StatusCode::ErrRead, MSG_READ_FAIL);
    }

    /// Control word acknowledged by the drive
    pub fn mark_control_written(&mut self, setpoint: &Setpoint, note: &str) {
        self.comm_error = false;
        self.acknowledged.run_state = setpoint.run_state;
        self.acknowledged.direction = setpoint.direction;
        self.set_status(StatusCode::CommSuccess, note);
    }

    pub fn mark_control_failure(&mut self) {
        self.comm_error = true;
        self.set_status(StatusCode::CommFail, MSG_WRITE_CMD_FAIL);
    }

    /// Frequency command acknowledged by the drive
    pub fn mark_frequency_written(&mut self, setpoint: &Setpoint) {
        self.comm_error = false;
        self.acknowledged
            .set_frequency(i32::from(setpoint.target_frequency()));
        self.set_status(StatusCode::SetFreq, set_frequency_message(setpoint));
    }

    pub fn mark_frequency_failure(&mut self) {
        self.comm_error = true;
        self.set_status(StatusCode::CommFreqFail, MSG_WRITE_FREQ_FAIL);
    }

    /// Publishable payload
    pub fn payload(&self) -> TelemetryPayload {
        TelemetryPayload::from(self)
    }
}

/// Telemetry payload published to MQTT and the status endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryPayload {
    pub current_amp: f64,
    pub voltage_v: f64,
    pub rpm: u16,
    pub freq_out: f64,
    /// 0 or 1
    pub comm_error: u8,
    pub last_msg_code: u8,
}

impl From<&Telemetry> for TelemetryPayload {
    fn from(t: &Telemetry) -> Self {
        Self {
            current_amp: t.output_current,
            voltage_v: t.output_voltage,
            rpm: t.rpm,
            freq_out: t.output_frequency,
            comm_error: u8::from(t.comm_error),
            last_msg_code: t.status_code.map(StatusCode::code).unwrap_or(0),
        }
    }
}

impl TelemetryPayload {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;
    use crate::setpoint::Direction;

    fn polled() -> Telemetry {
        let mut t = Telemetry::new();
        let mut raw = [0u16; MONITOR_LEN];
        raw[0] = 1250;
        raw[1] = 12;
        raw[3] = 475;
        raw[9] = 375;
        t.apply_reading(raw);
        t
    }

    #[test]
    fn test_read_failure_keeps_numeric_fields() {
        let mut t = polled();
        let before = t.clone();
        t.mark_read_failure();
        assert!(t.comm_error);
        assert_eq!(t.status_code, Some(StatusCode::ErrRead));
        assert_eq!(t.status_message.as_str(), MSG_READ_FAIL);
        assert_eq!(t.raw, before.raw);
        assert_eq!(t.reading(), before.reading());
    }

    #[test]
    fn test_recovery_message_only_after_error() {
        let mut t = polled();
        assert_eq!(t.status_message.as_str(), "");
        t.mark_read_failure();
        t.apply_reading(t.raw);
        assert!(!t.comm_error);
        assert_eq!(t.status_code, Some(StatusCode::CommSuccess));
        assert_eq!(t.status_message.as_str(), MSG_TELEMETRY_OK);
    }

    #[test]
    fn test_frequency_write_after_control_failure() {
        let mut t = Telemetry::new();
        let sp = Setpoint::new(true, Direction::Reverse, 1234);
        t.mark_control_failure();
        assert_eq!(t.acknowledged, Setpoint::default());
        t.mark_frequency_written(&sp);
        assert!(!t.comm_error);
        assert_eq!(t.status_code, Some(StatusCode::SetFreq));
        assert_eq!(t.status_message.as_str(), "Set Freq: 12.34 Hz");
        assert!(!t.acknowledged.run_state);
        assert_eq!(t.acknowledged.target_frequency(), 1234);
    }

    #[test]
    fn test_status_message_truncates_on_char_boundary() {
        let long = "é".repeat(40);
        let msg = StatusMessage::new(long);
        assert!(msg.as_str().len() <= STATUS_MESSAGE_MAX);
        assert_eq!(msg.as_str().len(), 64);

        let msg = StatusMessage::new(format!("a{}", "é".repeat(40)));
        assert_eq!(msg.as_str().len(), 63);
    }

    #[test]
    fn test_payload_json() {
        let mut t = polled();
        t.mark_read_failure();
        let json = t.payload().to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["current_amp"], 1.2);
        assert_eq!(value["voltage_v"], 47.5);
        assert_eq!(value["rpm"], 375);
        assert_eq!(value["freq_out"], 12.5);
        assert_eq!(value["comm_error"], 1);
        assert_eq!(value["last_msg_code"], 0);

        assert_eq!(Telemetry::new().payload().last_msg_code, 0);
        assert_eq!(polled().payload().last_msg_code, 4);
    }
}
