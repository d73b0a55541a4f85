//! Unified service bootstrap utilities
//!
//! Startup banner and logging initialization shared by `vfdmaster` and `vfdsim`.

use errors::{VfdError, VfdResult};
use tracing::{error, info, warn, Level};

use crate::bootstrap_args::ServiceArgs;
use crate::logging;
use crate::service_config::LoggingConfig;

/// Service metadata for startup
pub struct ServiceInfo {
    /// Service name (e.g., "vfdmaster", "vfdsim")
    pub name: String,
    /// Service version from Cargo.toml
    pub version: String,
    /// Service description
    pub description: String,
}

impl ServiceInfo {
    /// Create new service info
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            description: description.into(),
        }
    }
}

/// Print unified startup banner for any service
///
/// `endpoint` is the serial device and line settings the service is bound to.
pub fn print_startup_banner(service: &ServiceInfo, endpoint: &str) {
    let banner = r#"
 ██╗   ██╗███████╗██████╗
 ██║   ██║██╔════╝██╔══██╗
 ██║   ██║█████╗  ██║  ██║
 ╚██╗ ██╔╝██╔══╝  ██║  ██║
  ╚████╔╝ ██║     ██████╔╝
   ╚═══╝  ╚═╝     ╚═════╝
    "#;

    info!("{}", banner);
    info!(" {} v{}", service.name.to_uppercase(), service.version);
    info!(" {}", service.description);
    info!(" Serial: {}", endpoint);
    info!("");
}

/// Initialize logging for a service
///
/// CLI `--log-level` overrides the configured level; `RUST_LOG` overrides both.
pub fn init_logging(
    service: &ServiceInfo,
    args: &ServiceArgs,
    logging_config: &LoggingConfig,
) -> VfdResult<()> {
    let mut config = logging_config.to_log_config(&service.name, !args.no_color);
    if let Some(level) = &args.log_level {
        config.filter = level.clone();
    }
    logging::init_with_config(config)?;
    if args.is_development() {
        info!(
            "Transaction logging enabled at {} level",
            args.parse_log_level()
        );
    }
    Ok(())
}

/// Log a fatal service error at the level its category calls for
///
/// Serial and transport failures are logged as warnings with a hint that the
/// service can simply be restarted once the line is back.
pub fn log_service_error(context: &str, err: &VfdError) {
    let hint = if err.is_retryable() {
        " (retry once the serial line is available)"
    } else {
        ""
    };
    if err.log_level() == Level::ERROR {
        error!(
            "{} [{}/{:?}]: {}{}",
            context,
            err.error_code(),
            err.category(),
            err,
            hint
        );
    } else {
        warn!(
            "{} [{}/{:?}]: {}{}",
            context,
            err.error_code(),
            err.category(),
            err,
            hint
        );
    }
}
