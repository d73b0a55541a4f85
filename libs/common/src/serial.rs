//! Serial port opening shared by the RTU master and the RTU slave

use std::time::Duration;

use errors::{VfdError, VfdResult};
use tokio_serial::{SerialPortBuilderExt, SerialStream};
use tracing::{debug, info};

use crate::service_config::SerialConfig;

/// Convert string parity to tokio_serial parity
fn parse_parity(parity: &str) -> tokio_serial::Parity {
    match parity.to_lowercase().as_str() {
        "even" => tokio_serial::Parity::Even,
        "odd" => tokio_serial::Parity::Odd,
        _ => tokio_serial::Parity::None,
    }
}

fn parse_data_bits(bits: u8) -> tokio_serial::DataBits {
    match bits {
        5 => tokio_serial::DataBits::Five,
        6 => tokio_serial::DataBits::Six,
        7 => tokio_serial::DataBits::Seven,
        _ => tokio_serial::DataBits::Eight,
    }
}

fn parse_stop_bits(bits: u8) -> tokio_serial::StopBits {
    match bits {
        2 => tokio_serial::StopBits::Two,
        _ => tokio_serial::StopBits::One,
    }
}

/// Open the configured serial device for async use
///
/// `io_timeout` is the driver-level read timeout; request/response deadlines
/// are enforced by the callers on top of it.
pub fn open_serial(config: &SerialConfig, io_timeout: Duration) -> VfdResult<SerialStream> {
    config.validate()?;
    debug!(
        "Opening serial port: {} ({})",
        config.device,
        config.line_settings()
    );

    let port = tokio_serial::new(&config.device, config.baud_rate)
        .data_bits(parse_data_bits(config.data_bits))
        .parity(parse_parity(&config.parity))
        .stop_bits(parse_stop_bits(config.stop_bits))
        .flow_control(tokio_serial::FlowControl::None)
        .timeout(io_timeout)
        .open_native_async()
        .map_err(|e| VfdError::Serial {
            device: config.device.clone(),
            reason: e.to_string(),
        })?;

    info!(
        "Opened serial port: {} ({})",
        config.device,
        config.line_settings()
    );
    Ok(port)
}
