//! Port abstraction layer for serial communication.
//!
//! Provides the adapter and opener traits, the `serialport`-backed
//! implementation, and in-memory mocks for tests.

pub mod baud;
pub mod error;
pub mod mock;
pub mod naming;
pub mod sync_port;
pub mod traits;

pub use baud::{BaudRate, DEFAULT_BAUD_RATE};
pub use error::PortError;
pub use mock::{MockOpener, MockSerialPort};
pub use naming::{PortId, PortNaming, DEFAULT_PORT_TEMPLATE};
pub use sync_port::{SyncSerialPort, SystemOpener};
pub use traits::*;
