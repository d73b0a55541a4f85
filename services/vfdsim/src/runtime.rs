//! Slave runtime
//!
//! One cooperative loop: the RTU server answers requests while a ticker
//! advances the drive model. Both share the engine under a short-lived lock.

use std::time::Duration;

use common::serial::open_serial;
use errors::{VfdError, VfdResult};
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::SimConfig;
use crate::engine::{ServiceStats, SharedEngine, SimulationEngine};
use crate::service::VfdSlaveService;

/// Advance the engine once per `period` until cancelled
pub async fn run_tick_loop(engine: SharedEngine, period: Duration, cancel: CancellationToken) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => engine.lock().tick(),
        }
    }
    debug!("Tick loop stopped");
}

/// Serve the configured serial line until cancelled
pub async fn run(config: &SimConfig, cancel: CancellationToken) -> VfdResult<ServiceStats> {
    let engine =
        SimulationEngine::with_window(config.window.base, config.window.size)?.into_shared();

    let port = open_serial(&config.serial, Duration::from_millis(config.tick_period_ms))?;
    let server = tokio_modbus::server::rtu::Server::new(port);
    let service = VfdSlaveService::new(engine.clone());

    info!(
        "Serving slave {} on {} (window {:#06X}+{}, tick {} ms)",
        config.slave_id,
        config.serial.device,
        config.window.base,
        config.window.size,
        config.tick_period_ms
    );

    let serve = server.serve_forever(service);
    let ticks = run_tick_loop(engine.clone(), config.tick_period(), cancel.clone());
    tokio::pin!(serve);
    tokio::pin!(ticks);

    tokio::select! {
        res = &mut serve => {
            cancel.cancel();
            res.map_err(|e| VfdError::Transport(format!("RTU server stopped: {}", e)))?;
        },
        _ = &mut ticks => {},
    }

    let stats = engine.lock().stats();
    info!(
        "Simulator stopped: {} ticks, {} reads, {} writes, {} exceptions",
        stats.ticks, stats.reads, stats.writes, stats.exceptions
    );
    Ok(stats)
}
