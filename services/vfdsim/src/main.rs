//! VFD slave simulator (`vfdsim`)
//!
//! Emulates a variable-frequency drive on a Modbus-RTU serial line.

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::info;

use common::service_bootstrap::{self, ServiceInfo};
use common::{config_loader, shutdown, ServiceArgs};
use vfdsim::{runtime, SimConfig};

/// Command-line arguments for vfdsim
#[derive(Debug, Parser)]
#[command(
    name = "vfdsim",
    version = env!("CARGO_PKG_VERSION"),
    about = "Modbus-RTU VFD slave simulator",
    long_about = None
)]
struct Cli {
    #[command(flatten)]
    service: ServiceArgs,

    /// Physics tick period override in milliseconds
    #[arg(long)]
    tick_period_ms: Option<u64>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config =
        SimConfig::load(cli.service.config.as_deref()).context("loading configuration")?;
    if let Some(device) = &cli.service.device {
        config.serial.device = device.clone();
    }
    if let Some(period) = cli.tick_period_ms {
        config.tick_period_ms = period;
    }

    let service_info = ServiceInfo::new(
        "vfdsim",
        env!("CARGO_PKG_VERSION"),
        "Modbus-RTU VFD Slave Simulator",
    );
    service_bootstrap::init_logging(&service_info, &cli.service, &config.logging)?;
    if !cli.service.no_color {
        service_bootstrap::print_startup_banner(
            &service_info,
            &format!("{} {}", config.serial.device, config.serial.line_settings()),
        );
    }

    config.validate().context("invalid configuration")?;

    // Validation mode: validate and exit
    if cli.service.validate {
        println!("{}", config_loader::dump_config(&config)?);
        info!("Validation completed successfully");
        return Ok(());
    }

    let cancel = CancellationToken::new();
    shutdown::cancel_on_shutdown(cancel.clone());

    match runtime::run(&config, cancel).await {
        Ok(_) => {
            info!("vfdsim shutdown complete");
            Ok(())
        },
        Err(e) => {
            service_bootstrap::log_service_error("vfdsim failed", &e);
            Err(e.into())
        },
    }
}
