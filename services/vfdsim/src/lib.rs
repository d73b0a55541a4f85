//! VFD slave simulator
//!
//! Answers Modbus-RTU register transactions for a single simulated drive and
//! advances a simple physical model between them.

pub mod config;
pub mod engine;
pub mod physics;
pub mod register_map;
pub mod runtime;
pub mod service;

pub use config::SimConfig;
pub use engine::{ServiceStats, SharedEngine, SimulationEngine};
pub use register_map::RegisterMap;
pub use service::VfdSlaveService;
