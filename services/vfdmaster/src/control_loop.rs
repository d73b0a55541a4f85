//! Master control loop
//!
//! One service cycle:
//! 1. apply at most one operator command to the setpoint
//! 2. write the control word if run/direction changed
//! 3. write the frequency command if the target changed
//! 4. on every Nth cycle, poll the monitor block
//!
//! Each transaction is `Idle -> Requested -> Completed | Failed` within the
//! cycle. Failures are folded into telemetry; nothing is retried and nothing
//! escapes the loop.

use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use vfd_model::codec::{encode_control_word, stop_command};
use vfd_model::registers::{MonitorBlock, REG_CONTROL_WORD, REG_FREQ_CMD, REG_MONITOR_START};
use vfd_model::{RangeRejected, Setpoint, Telemetry, MONITOR_LEN};

use crate::config::MasterConfig;
use crate::error::{CommFault, TransportError, WriteKind};
use crate::input::InputCommand;
use crate::sink::Snapshot;
use crate::transport::RegisterTransport;

// ============================================================================
// Poll decimation
// ============================================================================

/// Telemetry refresh policy: poll on every `divisor`-th cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSchedule {
    divisor: u32,
    counter: u32,
}

impl PollSchedule {
    /// A divisor of zero is treated as one (poll every cycle)
    pub fn new(divisor: u32) -> Self {
        Self {
            divisor: divisor.max(1),
            counter: 0,
        }
    }

    pub fn divisor(&self) -> u32 {
        self.divisor
    }

    /// Advance one cycle; true when this cycle polls
    pub fn advance(&mut self) -> bool {
        self.counter += 1;
        if self.counter >= self.divisor {
            self.counter = 0;
            true
        } else {
            false
        }
    }
}

// ============================================================================
// Cycle results
// ============================================================================

/// Final state of one transaction kind within a cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TxOutcome {
    /// Not requested this cycle
    #[default]
    Idle,
    /// Requested but deliberately not sent
    Skipped,
    Completed,
    Failed(CommFault),
}

impl TxOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CycleOutcome {
    pub cycle: u64,
    pub control: TxOutcome,
    pub frequency: TxOutcome,
    pub poll: TxOutcome,
    pub range: Option<RangeRejected>,
    pub quit: bool,
}

/// Counters reported at shutdown
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleStats {
    pub cycles: u64,
    pub control_writes: u64,
    pub frequency_writes: u64,
    pub polls: u64,
    pub write_failures: u64,
    pub read_failures: u64,
    pub skipped_writes: u64,
    pub range_rejections: u64,
}

// ============================================================================
// Control loop
// ============================================================================

#[derive(Debug)]
pub struct MasterControlLoop<T: RegisterTransport> {
    transport: T,
    setpoint: Setpoint,
    telemetry: Telemetry,
    schedule: PollSchedule,
    suppress_freq_after_link_failure: bool,
    cycle: u64,
    stats: CycleStats,
}

impl<T: RegisterTransport> MasterControlLoop<T> {
    pub fn new(transport: T, poll_divisor: u32) -> Self {
        Self {
            transport,
            setpoint: Setpoint::default(),
            telemetry: Telemetry::new(),
            schedule: PollSchedule::new(poll_divisor),
            suppress_freq_after_link_failure: false,
            cycle: 0,
            stats: CycleStats::default(),
        }
    }

    pub fn from_config(transport: T, config: &MasterConfig) -> Self {
        Self::new(transport, config.poll_divisor)
            .with_link_failure_suppression(config.suppress_freq_after_link_failure)
    }

    /// Skip the frequency write when the control write of the same cycle
    /// failed with a timeout or I/O error
    pub fn with_link_failure_suppression(mut self, enabled: bool) -> Self {
        self.suppress_freq_after_link_failure = enabled;
        self
    }

    pub fn setpoint(&self) -> &Setpoint {
        &self.setpoint
    }

    pub fn telemetry(&self) -> &Telemetry {
        &self.telemetry
    }

    pub fn stats(&self) -> CycleStats {
        self.stats
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            cycle: self.cycle,
            setpoint: self.setpoint,
            telemetry: self.telemetry.clone(),
        }
    }

    /// Run one service cycle
    pub async fn run_cycle(&mut self, command: Option<InputCommand>) -> CycleOutcome {
        self.cycle += 1;
        self.stats.cycles += 1;
        let mut outcome = CycleOutcome {
            cycle: self.cycle,
            ..Default::default()
        };

        match command {
            Some(InputCommand::Quit) => {
                outcome.quit = true;
                return outcome;
            },
            Some(command) => self.apply_command(command, &mut outcome).await,
            None => {},
        }

        if self.schedule.advance() {
            outcome.poll = self.poll_telemetry().await;
        }
        outcome
    }

    async fn apply_command(&mut self, command: InputCommand, outcome: &mut CycleOutcome) {
        let change = command.apply(&mut self.setpoint);
        if let Some(range) = change.range {
            debug!(
                "Frequency {} clamped to {}",
                range.requested, range.applied
            );
            self.stats.range_rejections += 1;
            outcome.range = Some(range);
        }

        let mut link_down = false;
        if change.control_changed {
            let note = change.note.unwrap_or_default();
            let (result, err) = self.write_control(&note).await;
            outcome.control = result;
            link_down = err.is_some_and(|e| e.is_link_failure());
        }

        if change.frequency_changed {
            outcome.frequency = if link_down && self.suppress_freq_after_link_failure {
                warn!("Frequency write skipped: control write lost the link");
                self.stats.skipped_writes += 1;
                TxOutcome::Skipped
            } else {
                self.write_frequency().await
            };
        }
    }

    async fn write_control(&mut self, note: &str) -> (TxOutcome, Option<TransportError>) {
        let word = encode_control_word(&self.setpoint);
        debug!("Write control word {:#06X} to {:#06X}", word, REG_CONTROL_WORD);

        match self.transport.write_register(REG_CONTROL_WORD, word).await {
            Ok(()) => {
                self.stats.control_writes += 1;
                self.telemetry.mark_control_written(&self.setpoint, note);
                (TxOutcome::Completed, None)
            },
            Err(e) => {
                warn!("Control write failed: {}", e);
                self.stats.write_failures += 1;
                self.telemetry.mark_control_failure();
                (
                    TxOutcome::Failed(CommFault::WriteFailure(WriteKind::Control)),
                    Some(e),
                )
            },
        }
    }

    async fn write_frequency(&mut self) -> TxOutcome {
        let target = self.setpoint.target_frequency();
        debug!("Write frequency {} to {:#06X}", target, REG_FREQ_CMD);

        match self.transport.write_register(REG_FREQ_CMD, target).await {
            Ok(()) => {
                self.stats.frequency_writes += 1;
                self.telemetry.mark_frequency_written(&self.setpoint);
                TxOutcome::Completed
            },
            Err(e) => {
                warn!("Frequency write failed: {}", e);
                self.stats.write_failures += 1;
                self.telemetry.mark_frequency_failure();
                TxOutcome::Failed(CommFault::WriteFailure(WriteKind::Frequency))
            },
        }
    }

    async fn poll_telemetry(&mut self) -> TxOutcome {
        let result = self
            .transport
            .read_registers(REG_MONITOR_START, MONITOR_LEN as u16)
            .await
            .and_then(|values| {
                MonitorBlock::try_from(values.as_slice()).map_err(|_| {
                    TransportError::Io(format!(
                        "expected {} registers, got {}",
                        MONITOR_LEN,
                        values.len()
                    ))
                })
            });

        match result {
            Ok(raw) => {
                debug!("Monitor block: {:?}", raw);
                self.stats.polls += 1;
                self.telemetry.apply_reading(raw);
                TxOutcome::Completed
            },
            Err(e) => {
                warn!("Telemetry poll failed: {}", e);
                self.stats.read_failures += 1;
                self.telemetry.mark_read_failure();
                TxOutcome::Failed(CommFault::ReadFailure)
            },
        }
    }

    /// Best-effort stop command, then release the transport
    pub async fn shutdown(&mut self) {
        match self
            .transport
            .write_register(REG_CONTROL_WORD, stop_command())
            .await
        {
            Ok(()) => info!("Stop command sent"),
            Err(e) => warn!("Stop command failed: {}", e),
        }
        if let Err(e) = self.transport.close().await {
            warn!("Closing {} failed: {}", self.transport.name(), e);
        }
    }

    /// Drive cycles at `period` until cancelled or asked to quit
    ///
    /// Takes at most one pending command per cycle and publishes a snapshot
    /// after each one. Sends the stop command before returning.
    pub async fn run(
        &mut self,
        period: Duration,
        commands: &mut mpsc::Receiver<InputCommand>,
        snapshots: &watch::Sender<Snapshot>,
        cancel: CancellationToken,
    ) -> CycleStats {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(
            "Control loop started on {} (cycle {:?}, poll every {} cycles)",
            self.transport.name(),
            period,
            self.schedule.divisor()
        );

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {},
            }

            let command = commands.try_recv().ok();
            let outcome = self.run_cycle(command).await;
            snapshots.send_replace(self.snapshot());

            if outcome.quit {
                info!("Quit requested");
                cancel.cancel();
                break;
            }
        }

        self.shutdown().await;
        let stats = self.stats;
        info!(
            "Control loop stopped after {} cycles: {} polls ({} failed), {} writes ({} failed)",
            stats.cycles,
            stats.polls,
            stats.read_failures,
            stats.control_writes + stats.frequency_writes,
            stats.write_failures
        );
        stats
    }
}
