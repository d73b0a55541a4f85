//! Transaction failure taxonomy of the master
//!
//! None of these abort the control loop. Each failure is folded into the
//! telemetry error flag and status code by the cycle that observed it.

use thiserror::Error;
use tokio_modbus::ExceptionCode;

pub use vfd_model::RangeRejected;

/// Which commanded write failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteKind {
    Control,
    Frequency,
}

/// A transaction that did not complete within its cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CommFault {
    #[error("monitor poll failed")]
    ReadFailure,

    #[error("{0:?} write failed")]
    WriteFailure(WriteKind),
}

/// Failure reported by a register transport
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("Operation timed out after {0} ms")]
    Timeout(u64),

    #[error("Slave answered with exception: {0:?}")]
    Exception(ExceptionCode),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Transport not connected")]
    NotConnected,
}

impl TransportError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    /// Timeouts and I/O failures suggest the link itself is down
    pub fn is_link_failure(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::Io(_) | Self::NotConnected)
    }
}

impl From<tokio_modbus::Error> for TransportError {
    fn from(err: tokio_modbus::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_failure_classification() {
        assert!(TransportError::Timeout(500).is_link_failure());
        assert!(TransportError::Timeout(500).is_timeout());
        assert!(TransportError::NotConnected.is_link_failure());
        assert!(!TransportError::Exception(ExceptionCode::IllegalDataAddress).is_link_failure());
        assert!(!TransportError::Io("crc".into()).is_timeout());
    }

    #[test]
    fn test_fault_display() {
        assert_eq!(CommFault::ReadFailure.to_string(), "monitor poll failed");
        assert_eq!(
            CommFault::WriteFailure(WriteKind::Frequency).to_string(),
            "Frequency write failed"
        );
    }
}
