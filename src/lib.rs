//! serial-pair library
//!
//! Discovers pairs of (virtual) serial ports, opens one pair, and exchanges
//! CRLF-terminated text lines between the two ends from a console menu.
//!
//! # Modules
//!
//! - `port`: Port abstraction layer (adapter trait, real port, mocks, naming)
//! - `discovery`: Port probing and pairing
//! - `session`: Port session lifecycle
//! - `channel`: Line framing and send/receive
//! - `controller`: Interactive console dialogue
//! - `config`: Configuration management with TOML support
//! - `logging`: Tracing subscriber setup
//! - `error`: Application-level errors

pub mod channel;
pub mod config;
pub mod controller;
pub mod discovery;
pub mod error;
pub mod logging;
pub mod port;
pub mod session;

// Re-export commonly used types for convenience
pub use channel::{ChannelError, LineFrame, MessageChannel, ReceiveOutcome, WriteMode};
pub use controller::{ControllerSettings, MenuAction, SessionController};
pub use discovery::{discover_pairs, PortPair};
pub use error::{AppError, AppResult};
pub use port::{
    BaudRate, MockOpener, MockSerialPort, PortError, PortId, PortOpener, SerialPortAdapter,
    SyncSerialPort, SystemOpener, TimeoutPolicy,
};
pub use session::{PortSession, SessionPair, SessionState};

// Re-export config types
pub use config::{Config, ConfigError, ConfigLoader, ConfigResult};
