//! Transport Port
//!
//! The control loop talks to the drive only through [`RegisterTransport`].
//! Implementations own the connection and enforce their own per-call
//! timeout; the loop never retries.

use std::fmt;

use async_trait::async_trait;

use crate::error::TransportError;

/// Register read/write primitive offered by the Modbus layer
#[async_trait]
pub trait RegisterTransport: Send + fmt::Debug {
    /// Human-readable transport name
    fn name(&self) -> &str;

    /// Read `count` holding registers starting at the absolute `start` address
    async fn read_registers(&mut self, start: u16, count: u16)
        -> Result<Vec<u16>, TransportError>;

    /// Write one holding register
    async fn write_register(&mut self, address: u16, value: u16) -> Result<(), TransportError>;

    /// Release the underlying connection
    async fn close(&mut self) -> Result<(), TransportError> {
        Ok(())
    }
}

#[async_trait]
impl<T: RegisterTransport + ?Sized> RegisterTransport for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn read_registers(
        &mut self,
        start: u16,
        count: u16,
    ) -> Result<Vec<u16>, TransportError> {
        (**self).read_registers(start, count).await
    }

    async fn write_register(&mut self, address: u16, value: u16) -> Result<(), TransportError> {
        (**self).write_register(address, value).await
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        (**self).close().await
    }
}

/// Per-transport counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransportStats {
    pub reads: u64,
    pub writes: u64,
    pub timeouts: u64,
    pub failures: u64,
}

impl TransportStats {
    pub fn record_read(&mut self) {
        self.reads += 1;
    }

    pub fn record_write(&mut self) {
        self.writes += 1;
    }

    pub fn record_error(&mut self, err: &TransportError) {
        if err.is_timeout() {
            self.timeouts += 1;
        } else {
            self.failures += 1;
        }
    }

    /// Record the outcome of one transaction
    pub fn record<T>(&mut self, write: bool, result: &Result<T, TransportError>) {
        match result {
            Ok(_) if write => self.record_write(),
            Ok(_) => self.record_read(),
            Err(e) => self.record_error(e),
        }
    }
}
