//! Unified error handling for the VFD services
//!
//! Both the master (`vfdmaster`) and the slave simulator (`vfdsim`) report
//! start-up, configuration and transport problems through [`VfdError`].
//! Per-transaction failures inside the control loop are *not* errors at this
//! level: they are folded into telemetry status codes by the master.

use thiserror::Error;

// ============================================================================
// VfdError - Main error type
// ============================================================================

/// Main error type for the VFD services
#[derive(Debug, Error)]
pub enum VfdError {
    // ======================================
    // Configuration Errors
    // ======================================
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid configuration: {field}: {reason}")]
    InvalidConfig { field: String, reason: String },

    // ======================================
    // Serial & Transport Errors
    // ======================================
    #[error("Serial port error: {device}: {reason}")]
    Serial { device: String, reason: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Illegal register address: {address:#06X} (+{count})")]
    IllegalAddress { address: u16, count: u16 },

    // ======================================
    // File & I/O Errors
    // ======================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    // ======================================
    // Service & Runtime Errors
    // ======================================
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using VfdError
pub type VfdResult<T> = Result<T, VfdError>;

/// Error category enum - used for classification and log levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Connection,
    Protocol,
    Internal,
}

impl VfdError {
    /// Stable error code for logs
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "CONFIGURATION_ERROR",
            Self::InvalidConfig { .. } => "INVALID_CONFIG",
            Self::Serial { .. } => "SERIAL_ERROR",
            Self::Transport(_) => "TRANSPORT_ERROR",
            Self::IllegalAddress { .. } => "ILLEGAL_ADDRESS",
            Self::Io(_) => "IO_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Classify the error
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Configuration(_) | Self::InvalidConfig { .. } => ErrorCategory::Configuration,
            Self::Serial { .. } | Self::Transport(_) | Self::Io(_) => ErrorCategory::Connection,
            Self::IllegalAddress { .. } => ErrorCategory::Protocol,
            Self::Serialization(_) | Self::Internal(_) => ErrorCategory::Internal,
        }
    }

    /// Check if the next service cycle may succeed where this one failed
    pub fn is_retryable(&self) -> bool {
        self.category() == ErrorCategory::Connection
    }

    /// Get log level
    pub fn log_level(&self) -> tracing::Level {
        match self.category() {
            ErrorCategory::Internal | ErrorCategory::Configuration => tracing::Level::ERROR,
            ErrorCategory::Connection | ErrorCategory::Protocol => tracing::Level::WARN,
        }
    }
}

// Conversion traits for common error types
impl From<serde_json::Error> for VfdError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for VfdError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<figment::Error> for VfdError {
    fn from(err: figment::Error) -> Self {
        Self::Configuration(err.to_string())
    }
}

// Helper macros for creating errors
#[macro_export]
macro_rules! config_error {
    ($msg:expr) => {
        $crate::VfdError::Configuration($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::VfdError::Configuration(format!($fmt, $($arg)*))
    };
}

#[macro_export]
macro_rules! invalid_config {
    ($field:expr, $reason:expr) => {
        $crate::VfdError::InvalidConfig {
            field: $field.to_string(),
            reason: $reason.to_string(),
        }
    };
}
