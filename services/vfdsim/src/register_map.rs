//! Slave-side register storage
//!
//! A fixed window of holding registers starting at `base`. Addresses outside
//! the window are rejected; everything inside is plain storage except the
//! monitor registers derived by the tick, which only the engine may write.

use std::ops::Range;

use errors::{invalid_config, VfdError, VfdResult};
use vfd_model::registers::TICK_WRITTEN;

#[derive(Debug, Clone)]
pub struct RegisterMap {
    base: u16,
    registers: Vec<u16>,
}

impl RegisterMap {
    /// Create a zeroed window of `size` registers starting at `base`
    pub fn new(base: u16, size: u16) -> VfdResult<Self> {
        if size == 0 {
            return Err(invalid_config!("window.size", "must be greater than zero"));
        }
        if u32::from(base) + u32::from(size) > 0x1_0000 {
            return Err(invalid_config!(
                "window",
                format!("{:#06X}+{} exceeds the register address space", base, size)
            ));
        }
        Ok(Self {
            base,
            registers: vec![0; usize::from(size)],
        })
    }

    pub fn base(&self) -> u16 {
        self.base
    }

    pub fn len(&self) -> usize {
        self.registers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registers.is_empty()
    }

    /// Whether `address` falls inside the window
    pub fn contains(&self, address: u16) -> bool {
        address >= self.base && usize::from(address - self.base) < self.registers.len()
    }

    fn span(&self, address: u16, count: u16) -> VfdResult<Range<usize>> {
        let out_of_range = || VfdError::IllegalAddress { address, count };
        if count == 0 || address < self.base {
            return Err(out_of_range());
        }
        let start = usize::from(address - self.base);
        let end = start + usize::from(count);
        if end > self.registers.len() {
            return Err(out_of_range());
        }
        Ok(start..end)
    }

    /// Read `count` registers starting at `address`
    pub fn read(&self, address: u16, count: u16) -> VfdResult<Vec<u16>> {
        let span = self.span(address, count)?;
        Ok(self.registers[span].to_vec())
    }

    /// Single register, `None` outside the window
    pub fn get(&self, address: u16) -> Option<u16> {
        self.read(address, 1).ok().map(|v| v[0])
    }

    /// Externally requested write of one register
    pub fn write(&mut self, address: u16, value: u16) -> VfdResult<()> {
        self.write_many(address, &[value])
    }

    /// Externally requested write of consecutive registers
    ///
    /// The whole request is rejected if any part of it is out of range.
    /// Values aimed at tick-derived monitor registers are accepted and dropped.
    pub fn write_many(&mut self, address: u16, values: &[u16]) -> VfdResult<()> {
        let count = u16::try_from(values.len()).map_err(|_| VfdError::IllegalAddress {
            address,
            count: u16::MAX,
        })?;
        let span = self.span(address, count)?;
        for (offset, value) in span.zip(values) {
            let target = self.base + offset as u16;
            if !is_tick_owned(target) {
                self.registers[offset] = *value;
            }
        }
        Ok(())
    }

    /// Engine-side store used by the tick; bypasses the monitor guard
    pub(crate) fn store(&mut self, address: u16, value: u16) {
        if let Ok(span) = self.span(address, 1) {
            self.registers[span.start] = value;
        }
    }
}

fn is_tick_owned(address: u16) -> bool {
    TICK_WRITTEN.iter().any(|field| field.address() == address)
}
