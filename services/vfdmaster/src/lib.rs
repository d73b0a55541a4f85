//! VFD Modbus-RTU master
//!
//! Cyclic control loop that pushes operator setpoints to a drive and mirrors
//! its monitor registers into telemetry.

pub mod config;
pub mod control_loop;
pub mod error;
pub mod input;
pub mod sink;
pub mod transport;

pub use config::MasterConfig;
pub use control_loop::{CycleOutcome, CycleStats, MasterControlLoop, PollSchedule, TxOutcome};
pub use error::{CommFault, TransportError, WriteKind};
pub use input::InputCommand;
pub use sink::{ControlHandle, SharedSnapshot, Snapshot};
pub use transport::{MockHandle, MockTransport, RegisterTransport, RtuTransport, TransportStats};
