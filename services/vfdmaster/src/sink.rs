//! Render/publish side of the master
//!
//! The control loop publishes a [`Snapshot`] on a `watch` channel once per
//! cycle. Consumers never touch the loop state directly: a text panel, the
//! JSON telemetry payload, and [`ControlHandle`] for façades running in another
//! execution context.

use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::debug;
use vfd_model::{Setpoint, Telemetry, TelemetryPayload};

use crate::input::InputCommand;

/// Read-only view of the loop state after one cycle
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Snapshot {
    pub cycle: u64,
    pub setpoint: Setpoint,
    pub telemetry: Telemetry,
}

impl Snapshot {
    pub fn payload(&self) -> TelemetryPayload {
        self.telemetry.payload()
    }

    /// Full status document for a JSON endpoint
    pub fn status_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Text status panel
    pub fn render_text(&self) -> String {
        let sp = &self.setpoint;
        let t = &self.telemetry;
        let mut out = String::new();

        let _ = writeln!(out, "---- COMMANDS ----");
        let _ = writeln!(
            out,
            "  Status Req : {}",
            if sp.run_state { "RUN" } else { "STOP" }
        );
        let _ = writeln!(out, "  Dir Req    : {}", sp.direction.label());
        let _ = writeln!(out, "  Target Freq: {:.2} Hz", sp.target_hz());
        let _ = writeln!(out, "---- TELEMETRY (0x21xx) ----");
        let _ = writeln!(out, "  Output Freq: {:.2} Hz", t.output_frequency);
        let _ = writeln!(out, "  Current    : {:.1} A", t.output_current);
        let _ = writeln!(out, "  Voltage    : {:.1} V", t.output_voltage);
        let _ = writeln!(out, "  RPM        : {}", t.rpm);
        let _ = writeln!(out, "---- SYSTEM STATUS ----");
        if t.comm_error {
            let _ = writeln!(out, "  COMMUNICATION ERROR!");
        } else {
            let _ = writeln!(out, "  Modbus Link: OK");
        }
        let _ = write!(out, "  Log: {}", t.status_message);
        out
    }
}

/// Latest snapshot behind a lock, for readers outside the loop task
#[derive(Debug, Clone, Default)]
pub struct SharedSnapshot {
    inner: Arc<RwLock<Snapshot>>,
}

impl SharedSnapshot {
    pub fn update(&self, snapshot: Snapshot) {
        *self.inner.write() = snapshot;
    }

    pub fn get(&self) -> Snapshot {
        self.inner.read().clone()
    }

    pub fn setpoint(&self) -> Setpoint {
        self.inner.read().setpoint
    }

    pub fn payload(&self) -> TelemetryPayload {
        self.inner.read().payload()
    }
}

/// Copy every published snapshot into `shared` until the channel closes
pub fn spawn_snapshot_mirror(
    mut rx: watch::Receiver<Snapshot>,
    shared: SharedSnapshot,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let snapshot = rx.borrow_and_update().clone();
            shared.update(snapshot);
        }
    })
}

/// Print the status panel whenever it changed, at most once per `every`
pub fn spawn_status_printer(
    mut rx: watch::Receiver<Snapshot>,
    every: Duration,
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        let mut last = String::new();
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {},
            }
            let panel = rx.borrow_and_update().render_text();
            if panel != last {
                println!("{}\n", panel);
                last = panel;
            }
        }
        debug!("Status printer stopped");
    })
}

/// Entry point for control façades (HTTP, MQTT, ...) running beside the loop
///
/// Commands are serialized through the loop's queue, so the loop stays the
/// only writer of setpoint and telemetry.
#[derive(Debug, Clone)]
pub struct ControlHandle {
    commands: mpsc::Sender<InputCommand>,
    snapshot: SharedSnapshot,
}

impl ControlHandle {
    pub fn new(commands: mpsc::Sender<InputCommand>, snapshot: SharedSnapshot) -> Self {
        Self { commands, snapshot }
    }

    /// Queue a command; fails once the loop has stopped
    pub async fn submit(&self, command: InputCommand) -> Result<(), InputCommand> {
        self.commands.send(command).await.map_err(|e| e.0)
    }

    /// Queue a full setpoint replacement
    pub async fn apply(&self, setpoint: Setpoint) -> Result<(), InputCommand> {
        self.submit(InputCommand::Apply(setpoint)).await
    }

    pub fn snapshot(&self) -> Snapshot {
        self.snapshot.get()
    }

    pub fn payload(&self) -> TelemetryPayload {
        self.snapshot.payload()
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;
    use vfd_model::Direction;

    #[test]
    fn test_render_text() {
        let mut snapshot = Snapshot {
            setpoint: Setpoint::new(true, Direction::Reverse, 1250),
            ..Default::default()
        };
        snapshot.telemetry.mark_read_failure();

        let text = snapshot.render_text();
        assert!(text.contains("Status Req : RUN"));
        assert!(text.contains("Dir Req    : REV"));
        assert!(text.contains("Target Freq: 12.50 Hz"));
        assert!(text.contains("COMMUNICATION ERROR!"));
        assert!(text.ends_with("Log: ERR: Read Timeout/Fail"));
    }

    #[test]
    fn test_status_json() {
        let snapshot = Snapshot::default();
        let value: serde_json::Value =
            serde_json::from_str(&snapshot.status_json().unwrap()).unwrap();
        assert_eq!(value["cycle"], 0);
        assert_eq!(value["setpoint"]["direction"], "forward");
        assert_eq!(value["telemetry"]["comm_error"], false);
    }

    #[tokio::test]
    async fn test_mirror_and_handle() {
        let (tx, rx) = watch::channel(Snapshot::default());
        let shared = SharedSnapshot::default();
        let mirror = spawn_snapshot_mirror(rx, shared.clone());

        tx.send_replace(Snapshot {
            cycle: 7,
            ..Default::default()
        });
        drop(tx);
        mirror.await.unwrap();
        assert_eq!(shared.get().cycle, 7);

        let (cmd_tx, mut cmd_rx) = mpsc::channel(1);
        let handle = ControlHandle::new(cmd_tx, shared);
        handle
            .apply(Setpoint::new(true, Direction::Forward, 3000))
            .await
            .unwrap();
        assert!(matches!(
            cmd_rx.recv().await,
            Some(InputCommand::Apply(sp)) if sp.target_frequency() == 3000
        ));
        assert_eq!(handle.payload().last_msg_code, 0);
    }
}
