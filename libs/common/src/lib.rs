//! Shared building blocks for the VFD services
//!
//! - logging bootstrap with console and daily-rolling file layers
//! - figment configuration loading
//! - serial port opening and shared config sections
//! - command-line arguments, startup banner and shutdown signal handling

pub mod bootstrap_args;
pub mod config_loader;
pub mod logging;
pub mod serial;
pub mod service_bootstrap;
pub mod service_config;
pub mod shutdown;

pub use bootstrap_args::ServiceArgs;
pub use service_bootstrap::ServiceInfo;
pub use service_config::{LoggingConfig, SerialConfig};

// Re-export common dependencies
pub use tokio;
pub use tokio_util::sync::CancellationToken;
