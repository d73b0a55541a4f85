//! Modbus slave service over the simulation engine
//!
//! ## Supported Operations
//! - Read Holding Registers (0x03)
//! - Write Single Register (0x06)
//! - Write Multiple Registers (0x10)
//!
//! Requests outside the configured window answer `IllegalDataAddress`; every
//! other function code answers `IllegalFunction`.

use std::future;

use tokio_modbus::prelude::{ExceptionCode, Request, Response};
use tracing::{debug, warn};

use crate::engine::SharedEngine;

#[derive(Debug, Clone)]
pub struct VfdSlaveService {
    engine: SharedEngine,
}

impl VfdSlaveService {
    pub fn new(engine: SharedEngine) -> Self {
        Self { engine }
    }

    /// Answer one request against the register map
    pub fn handle(&self, req: Request<'_>) -> Result<Response, ExceptionCode> {
        debug!("Received Modbus request: {:?}", req);

        let mut engine = self.engine.lock();
        let res = match req {
            Request::ReadHoldingRegisters(addr, cnt) => engine
                .read_holding(addr, cnt)
                .map(Response::ReadHoldingRegisters)
                .map_err(|_| ExceptionCode::IllegalDataAddress),
            Request::WriteSingleRegister(addr, value) => engine
                .write_holding(addr, &[value])
                .map(|_| Response::WriteSingleRegister(addr, value))
                .map_err(|_| ExceptionCode::IllegalDataAddress),
            Request::WriteMultipleRegisters(addr, values) => engine
                .write_holding(addr, &values)
                .map(|_| Response::WriteMultipleRegisters(addr, values.len() as u16))
                .map_err(|_| ExceptionCode::IllegalDataAddress),
            other => {
                engine.record_exception();
                warn!("Unsupported function in request: {:?}", other);
                Err(ExceptionCode::IllegalFunction)
            },
        };

        if let Err(code) = &res {
            debug!("Answering with exception: {:?}", code);
        }
        res
    }
}

impl tokio_modbus::server::Service for VfdSlaveService {
    type Request = Request<'static>;
    type Response = Response;
    type Exception = ExceptionCode;
    type Future = future::Ready<Result<Self::Response, Self::Exception>>;

    fn call(&self, req: Self::Request) -> Self::Future {
        future::ready(self.handle(req))
    }
}
