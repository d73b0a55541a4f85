//! VFD master (`vfdmaster`)
//!
//! Reads operator commands from stdin, keeps the drive in sync over
//! Modbus-RTU and prints a status panel.

use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::info;

use common::service_bootstrap::{self, ServiceInfo};
use common::{config_loader, shutdown, ServiceArgs};
use vfdmaster::sink::spawn_status_printer;
use vfdmaster::{input, MasterConfig, MasterControlLoop, RtuTransport, Snapshot};

/// Command queue depth; keys arriving faster than one per cycle wait here
const COMMAND_QUEUE: usize = 32;

/// Command-line arguments for vfdmaster
#[derive(Debug, Parser)]
#[command(
    name = "vfdmaster",
    version = env!("CARGO_PKG_VERSION"),
    about = "Modbus-RTU VFD master control loop",
    long_about = None
)]
struct Cli {
    #[command(flatten)]
    service: ServiceArgs,

    /// Slave address override
    #[arg(long)]
    slave_id: Option<u8>,

    /// Print the status panel at most this often (0 disables it)
    #[arg(long, default_value_t = 200)]
    status_interval_ms: u64,

    /// Print the final telemetry payload as JSON on exit
    #[arg(long)]
    json: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config =
        MasterConfig::load(cli.service.config.as_deref()).context("loading configuration")?;
    if let Some(device) = &cli.service.device {
        config.serial.device = device.clone();
    }
    if let Some(slave_id) = cli.slave_id {
        config.slave_id = slave_id;
    }

    let service_info = ServiceInfo::new(
        "vfdmaster",
        env!("CARGO_PKG_VERSION"),
        "Modbus-RTU VFD Master",
    );
    service_bootstrap::init_logging(&service_info, &cli.service, &config.logging)?;
    if !cli.service.no_color {
        service_bootstrap::print_startup_banner(
            &service_info,
            &format!(
                "{} {} slave {}",
                config.serial.device,
                config.serial.line_settings(),
                config.slave_id
            ),
        );
    }

    config.validate().context("invalid configuration")?;

    if cli.service.validate {
        println!("{}", config_loader::dump_config(&config)?);
        info!("Validation completed successfully");
        return Ok(());
    }

    let transport = match RtuTransport::open(
        &config.serial,
        config.slave_id,
        config.response_timeout(),
    ) {
        Ok(t) => t,
        Err(e) => {
            service_bootstrap::log_service_error("Startup failed", &e);
            return Err(e.into());
        },
    };

    let cancel = CancellationToken::new();
    shutdown::cancel_on_shutdown(cancel.clone());

    let (cmd_tx, mut cmd_rx) = mpsc::channel(COMMAND_QUEUE);
    let (snap_tx, snap_rx) = watch::channel(Snapshot::default());

    input::spawn_stdin_reader(cmd_tx, cancel.clone()).context("starting input reader")?;
    if cli.status_interval_ms > 0 {
        spawn_status_printer(
            snap_rx,
            Duration::from_millis(cli.status_interval_ms),
            cancel.clone(),
        );
    }

    let mut control = MasterControlLoop::from_config(transport, &config);
    let stats = control
        .run(config.cycle_period(), &mut cmd_rx, &snap_tx, cancel)
        .await;

    let transport_stats = control.transport().stats();
    info!(
        "Transport: {} reads, {} writes, {} timeouts, {} failures",
        transport_stats.reads,
        transport_stats.writes,
        transport_stats.timeouts,
        transport_stats.failures
    );
    if cli.json {
        println!("{}", snap_tx.borrow().payload().to_json()?);
    }
    info!("vfdmaster shutdown complete after {} cycles", stats.cycles);
    Ok(())
}
