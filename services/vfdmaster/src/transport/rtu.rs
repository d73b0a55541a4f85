//! Modbus-RTU register transport
//!
//! Wraps a `tokio-modbus` client context attached to one slave on a serial
//! line. Every call is bounded by the configured response timeout.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use common::serial::open_serial;
use common::SerialConfig;
use errors::VfdResult;
use tokio::time::timeout;
use tokio_modbus::client::{Context, Reader, Writer};
use tokio_modbus::Slave;
use tracing::{debug, info};

use super::traits::{RegisterTransport, TransportStats};
use crate::error::TransportError;

#[derive(Debug)]
pub struct RtuTransport {
    name: String,
    ctx: Option<Context>,
    response_timeout: Duration,
    stats: TransportStats,
}

impl RtuTransport {
    /// Open the serial line and attach to `slave_id`
    pub fn open(serial: &SerialConfig, slave_id: u8, response_timeout: Duration) -> VfdResult<Self> {
        let port = open_serial(serial, response_timeout)?;
        let ctx = tokio_modbus::client::rtu::attach_slave(port, Slave(slave_id));
        info!(
            "Modbus RTU master attached to slave {} on {}",
            slave_id, serial.device
        );

        Ok(Self {
            name: format!("rtu:{}#{}", serial.device, slave_id),
            ctx: Some(ctx),
            response_timeout,
            stats: TransportStats::default(),
        })
    }

    pub fn stats(&self) -> TransportStats {
        self.stats
    }

    fn timeout_ms(&self) -> u64 {
        self.response_timeout.as_millis() as u64
    }
}

/// Flatten the nested tokio-modbus result and apply the response deadline
async fn bounded<T, F>(deadline: Duration, call: F) -> Result<T, TransportError>
where
    F: Future<Output = tokio_modbus::Result<T>>,
{
    match timeout(deadline, call).await {
        Err(_) => Err(TransportError::Timeout(deadline.as_millis() as u64)),
        Ok(Err(e)) => Err(e.into()),
        Ok(Ok(Err(code))) => Err(TransportError::Exception(code)),
        Ok(Ok(Ok(value))) => Ok(value),
    }
}

/// Reject a response carrying the wrong number of registers
fn expect_len(values: Vec<u16>, count: u16) -> Result<Vec<u16>, TransportError> {
    if values.len() == usize::from(count) {
        Ok(values)
    } else {
        Err(TransportError::Io(format!(
            "expected {} registers, got {}",
            count,
            values.len()
        )))
    }
}

#[async_trait]
impl RegisterTransport for RtuTransport {
    fn name(&self) -> &str {
        &self.name
    }

    async fn read_registers(
        &mut self,
        start: u16,
        count: u16,
    ) -> Result<Vec<u16>, TransportError> {
        let deadline = self.response_timeout;
        let ctx = self.ctx.as_mut().ok_or(TransportError::NotConnected)?;
        let result = bounded(deadline, ctx.read_holding_registers(start, count))
            .await
            .and_then(|values| expect_len(values, count));
        self.stats.record(false, &result);
        result
    }

    async fn write_register(&mut self, address: u16, value: u16) -> Result<(), TransportError> {
        let deadline = self.response_timeout;
        let ctx = self.ctx.as_mut().ok_or(TransportError::NotConnected)?;
        let result = bounded(deadline, ctx.write_single_register(address, value)).await;
        self.stats.record(true, &result);
        result
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        if self.ctx.take().is_some() {
            debug!(
                "Closed {} ({} ms timeout): {:?}",
                self.name,
                self.timeout_ms(),
                self.stats
            );
        }
        Ok(())
    }
}
