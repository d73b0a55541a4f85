//! Register transports for the master

pub mod mock;
pub mod rtu;
pub mod traits;

pub use mock::{MockHandle, MockTransport};
pub use rtu::RtuTransport;
pub use traits::{RegisterTransport, TransportStats};
