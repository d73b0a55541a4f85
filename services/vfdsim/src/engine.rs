//! Slave simulation engine
//!
//! Owns the register map and the drive model. Transactions only touch the
//! commanded registers; the tick reads them, advances the model and rewrites
//! the monitor block.

use std::sync::Arc;

use errors::VfdResult;
use parking_lot::Mutex;
use tracing::{debug, info};
use vfd_model::codec::is_run_commanded;
use vfd_model::registers::{REG_CONTROL_WORD, REG_FREQ_CMD};

use crate::physics::DrivePhysics;
use crate::register_map::RegisterMap;

/// Engine shared between the Modbus service and the tick loop
pub type SharedEngine = Arc<Mutex<SimulationEngine>>;

/// Counters reported at shutdown
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServiceStats {
    pub ticks: u64,
    pub reads: u64,
    pub writes: u64,
    pub exceptions: u64,
}

#[derive(Debug, Clone)]
pub struct SimulationEngine {
    map: RegisterMap,
    drive: DrivePhysics,
    stats: ServiceStats,
    last_running: bool,
}

impl SimulationEngine {
    pub fn new(map: RegisterMap) -> Self {
        Self {
            map,
            drive: DrivePhysics::default(),
            stats: ServiceStats::default(),
            last_running: false,
        }
    }

    /// Engine over a fresh window
    pub fn with_window(base: u16, size: u16) -> VfdResult<Self> {
        Ok(Self::new(RegisterMap::new(base, size)?))
    }

    pub fn into_shared(self) -> SharedEngine {
        Arc::new(Mutex::new(self))
    }

    pub fn map(&self) -> &RegisterMap {
        &self.map
    }

    pub fn drive(&self) -> &DrivePhysics {
        &self.drive
    }

    pub fn stats(&self) -> ServiceStats {
        self.stats
    }

    /// Commanded control word and target frequency (hundredths of Hz)
    pub fn commanded(&self) -> (u16, u16) {
        (
            self.map.get(REG_CONTROL_WORD).unwrap_or_default(),
            self.map.get(REG_FREQ_CMD).unwrap_or_default(),
        )
    }

    /// One physical-model step followed by a monitor block refresh
    pub fn tick(&mut self) {
        let (control_word, target) = self.commanded();
        let running = is_run_commanded(control_word);
        if running != self.last_running {
            info!(
                "Drive {} (control word {:#06X})",
                if running { "RUN" } else { "STOP" },
                control_word
            );
            self.last_running = running;
        }

        self.drive.step(running, f64::from(target) / 100.0);
        for (field, value) in self.drive.monitor_registers() {
            self.map.store(field.address(), value);
        }
        self.stats.ticks += 1;
    }

    /// FC03 against the map
    pub fn read_holding(&mut self, address: u16, count: u16) -> VfdResult<Vec<u16>> {
        let result = self.map.read(address, count);
        self.account(result.is_ok(), false);
        result
    }

    /// FC06/FC16 against the map
    pub fn write_holding(&mut self, address: u16, values: &[u16]) -> VfdResult<()> {
        let result = self.map.write_many(address, values);
        if result.is_ok() {
            debug!("Accepted write {:#06X} <- {:?}", address, values);
        }
        self.account(result.is_ok(), true);
        result
    }

    /// Count a rejected request that never reached the map
    pub fn record_exception(&mut self) {
        self.stats.exceptions += 1;
    }

    fn account(&mut self, ok: bool, write: bool) {
        match (ok, write) {
            (false, _) => self.stats.exceptions += 1,
            (true, true) => self.stats.writes += 1,
            (true, false) => self.stats.reads += 1,
        }
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;
    use vfd_model::registers::{MonitorField, REG_MONITOR_START};
    use vfd_model::{decode_monitor_block, MonitorBlock};

    fn engine() -> SimulationEngine {
        SimulationEngine::with_window(0x2000, 300).unwrap()
    }

    fn monitor(engine: &mut SimulationEngine) -> MonitorBlock {
        let raw = engine.read_holding(REG_MONITOR_START, 10).unwrap();
        raw.try_into().unwrap()
    }

    #[test]
    fn test_run_to_thirty_hz_in_sixty_ticks() {
        let mut engine = engine();
        engine.write_holding(REG_FREQ_CMD, &[3000]).unwrap();
        engine.write_holding(REG_CONTROL_WORD, &[0x02]).unwrap();
        for _ in 0..60 {
            engine.tick();
        }

        assert_eq!(engine.drive().frequency, 30.0);
        assert_eq!(engine.drive().rpm, 900.0);
        assert!((engine.drive().current - 3.0).abs() < 1e-9);
        assert!((engine.drive().voltage - 114.0).abs() < 1e-9);

        let reading = decode_monitor_block(&monitor(&mut engine));
        assert_eq!(reading.frequency, 30.0);
        assert_eq!(reading.rpm, 900);
        assert_eq!(reading.current, 3.0);
        assert_eq!(reading.voltage, 114.0);
        assert_eq!(engine.stats().ticks, 60);
        assert_eq!(engine.stats().writes, 2);
    }

    #[test]
    fn test_stop_coasts_to_zero() {
        let mut engine = engine();
        engine.write_holding(REG_FREQ_CMD, &[1000]).unwrap();
        engine.write_holding(REG_CONTROL_WORD, &[0x12]).unwrap();
        for _ in 0..20 {
            engine.tick();
        }
        assert_eq!(engine.drive().frequency, 10.0);

        engine.write_holding(REG_CONTROL_WORD, &[0x01]).unwrap();
        for _ in 0..9 {
            engine.tick();
        }
        assert_eq!(engine.drive().frequency, 1.0);
        engine.tick();
        let raw = monitor(&mut engine);
        assert_eq!(raw, [0u16; 10]);
    }

    #[test]
    fn test_tick_runs_without_transactions() {
        let mut engine = engine();
        engine.tick();
        engine.tick();
        assert_eq!(engine.stats().ticks, 2);
        assert_eq!(engine.stats().reads, 0);
    }

    #[test]
    fn test_monitor_write_does_not_survive_tick() {
        let mut engine = engine();
        engine
            .write_holding(MonitorField::Frequency.address(), &[5000])
            .unwrap();
        engine.tick();
        assert_eq!(monitor(&mut engine)[0], 0);
    }

    #[test]
    fn test_out_of_window_counts_exception() {
        let mut engine = engine();
        assert!(engine.read_holding(0x3000, 1).is_err());
        assert!(engine.write_holding(0x1000, &[1]).is_err());
        assert_eq!(engine.stats().exceptions, 2);
    }
}
