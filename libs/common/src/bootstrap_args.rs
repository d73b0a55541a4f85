//! Common command-line arguments for the VFD services
//!
//! Each binary flattens [`ServiceArgs`] into its own clap parser and adds
//! role-specific flags next to it.

use std::path::PathBuf;

use clap::Args;

/// Common service startup arguments
#[derive(Debug, Clone, Default, Args)]
pub struct ServiceArgs {
    /// Configuration file (yaml, toml or json); defaults apply when absent
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error) or a full filter directive
    #[arg(short = 'l', long)]
    pub log_level: Option<String>,

    /// Serial device override (e.g., /dev/ttyUSB0)
    #[arg(short = 'd', long)]
    pub device: Option<String>,

    /// Disable colored output (useful for log files)
    #[arg(long)]
    pub no_color: bool,

    /// Only validate configuration without starting service
    #[arg(long)]
    pub validate: bool,
}

impl ServiceArgs {
    /// Parse log level string to tracing::Level
    ///
    /// Filter directives that are not a bare level fall back to INFO.
    pub fn parse_log_level(&self) -> tracing::Level {
        match self
            .log_level
            .as_deref()
            .map(str::to_lowercase)
            .as_deref()
        {
            Some("trace") => tracing::Level::TRACE,
            Some("debug") => tracing::Level::DEBUG,
            Some("warn") | Some("warning") => tracing::Level::WARN,
            Some("error") => tracing::Level::ERROR,
            _ => tracing::Level::INFO,
        }
    }

    /// Check if running with verbose transaction logging
    pub fn is_development(&self) -> bool {
        matches!(
            self.parse_log_level(),
            tracing::Level::DEBUG | tracing::Level::TRACE
        )
    }
}
