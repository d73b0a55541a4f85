//! Mock Transport for Testing
//!
//! In-memory register bank with switchable failures. The [`MockHandle`]
//! stays with the test while the transport moves into the control loop.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio_modbus::ExceptionCode;
use tracing::debug;

use super::traits::{RegisterTransport, TransportStats};
use crate::error::TransportError;

#[derive(Debug, Default)]
struct MockState {
    registers: BTreeMap<u16, u16>,
    /// Error returned by every read while set
    read_failure: Option<TransportError>,
    /// Errors returned by writes, keyed by address
    write_failures: HashMap<u16, TransportError>,
    /// Successful writes in order
    writes: Vec<(u16, u16)>,
    /// Every attempted write in order, including failed ones
    attempts: Vec<(u16, u16)>,
    closed: bool,
    stats: TransportStats,
}

/// Test-side view of a [`MockTransport`]
#[derive(Debug, Clone, Default)]
pub struct MockHandle {
    state: Arc<Mutex<MockState>>,
}

impl MockHandle {
    pub fn set_register(&self, address: u16, value: u16) {
        self.state.lock().registers.insert(address, value);
    }

    /// Load consecutive registers starting at `start`
    pub fn set_registers(&self, start: u16, values: &[u16]) {
        let mut state = self.state.lock();
        for (address, value) in (start..=u16::MAX).zip(values) {
            state.registers.insert(address, *value);
        }
    }

    pub fn register(&self, address: u16) -> Option<u16> {
        self.state.lock().registers.get(&address).copied()
    }

    pub fn fail_reads(&self, err: Option<TransportError>) {
        self.state.lock().read_failure = err;
    }

    pub fn fail_writes_to(&self, address: u16, err: Option<TransportError>) {
        let mut state = self.state.lock();
        match err {
            Some(err) => state.write_failures.insert(address, err),
            None => state.write_failures.remove(&address),
        };
    }

    pub fn writes(&self) -> Vec<(u16, u16)> {
        self.state.lock().writes.clone()
    }

    pub fn attempts(&self) -> Vec<(u16, u16)> {
        self.state.lock().attempts.clone()
    }

    pub fn clear_writes(&self) {
        let mut state = self.state.lock();
        state.writes.clear();
        state.attempts.clear();
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    pub fn stats(&self) -> TransportStats {
        self.state.lock().stats
    }
}

/// Mock transport implementation
#[derive(Debug, Default)]
pub struct MockTransport {
    handle: MockHandle,
}

impl MockTransport {
    pub fn new() -> (Self, MockHandle) {
        let handle = MockHandle::default();
        (
            Self {
                handle: handle.clone(),
            },
            handle,
        )
    }
}

#[async_trait]
impl RegisterTransport for MockTransport {
    fn name(&self) -> &str {
        "mock"
    }

    async fn read_registers(
        &mut self,
        start: u16,
        count: u16,
    ) -> Result<Vec<u16>, TransportError> {
        let mut state = self.handle.state.lock();
        if state.closed {
            return Err(TransportError::NotConnected);
        }
        let result = match &state.read_failure {
            Some(err) => Err(err.clone()),
            // Range running past 0xFFFF
            None if start.checked_add(count.saturating_sub(1)).is_none() => {
                Err(TransportError::Exception(ExceptionCode::IllegalDataAddress))
            }
            None => Ok((0..count)
                .map(|i| {
                    state
                        .registers
                        .get(&(start + i))
                        .copied()
                        .unwrap_or_default()
                })
                .collect()),
        };
        state.stats.record(false, &result);
        debug!("mock read {:#06X}+{} -> {:?}", start, count, result);
        result
    }

    async fn write_register(&mut self, address: u16, value: u16) -> Result<(), TransportError> {
        let mut state = self.handle.state.lock();
        if state.closed {
            return Err(TransportError::NotConnected);
        }
        state.attempts.push((address, value));
        let failure = state.write_failures.get(&address).cloned();
        let result = match failure {
            Some(err) => Err(err),
            None => {
                state.registers.insert(address, value);
                state.writes.push((address, value));
                Ok(())
            },
        };
        state.stats.record(true, &result);
        result
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.handle.state.lock().closed = true;
        Ok(())
    }
}
