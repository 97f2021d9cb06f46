//! Port-specific error types.
//!
//! Errors raised by the port layer (open, configure, purge, read, write),
//! kept separate from application-level errors so the session and channel
//! layers can decide which failures are fatal.

use thiserror::Error;

/// Errors that can occur during serial port operations.
#[derive(Debug, Error)]
pub enum PortError {
    /// The device does not exist.
    #[error("Serial port not found: {port} ({source})")]
    NotFound {
        port: String,
        #[source]
        source: serialport::Error,
    },

    /// The device exists but is held exclusively by someone else.
    #[error("Serial port is busy or access was denied: {port} ({source})")]
    Busy {
        port: String,
        #[source]
        source: serialport::Error,
    },

    /// An I/O error occurred during port operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Port configuration failed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Attempted to open a session that already holds a handle.
    #[error("Port is already open")]
    AlreadyOpen,

    /// Attempted to use a session with no handle (never opened, or closed).
    #[error("Port is not open")]
    NotOpen,

    /// The session was closed; closed sessions cannot be reopened.
    #[error("Session is closed")]
    Closed,

    /// A serialport-specific error occurred.
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),
}

impl PortError {
    /// Create a NotFound error from a port name and the OS description.
    pub fn not_found(port_name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::NotFound {
            port: port_name.into(),
            source: serialport::Error::new(serialport::ErrorKind::NoDevice, description),
        }
    }

    /// Create a Busy error from a port name and the OS description.
    pub fn busy(port_name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::Busy {
            port: port_name.into(),
            source: serialport::Error::new(
                serialport::ErrorKind::Io(std::io::ErrorKind::PermissionDenied),
                description,
            ),
        }
    }

    /// Create a Config error from a message.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Raw OS error code behind this error, when one is known.
    ///
    /// `serialport::Error` keeps only a kind and the OS description, so
    /// open failures carry their diagnostic in the message, not here.
    pub fn os_code(&self) -> Option<i32> {
        match self {
            Self::Io(e) => e.raw_os_error(),
            _ => None,
        }
    }

    /// True for the "nothing arrived in time" family of read results.
    ///
    /// `serialport` reports an expired read timeout as `TimedOut`; the mock
    /// and some non-blocking backends use `WouldBlock`.
    pub fn is_read_timeout(&self) -> bool {
        match self {
            Self::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock
            ),
            _ => false,
        }
    }

    /// Map a `serialport` open failure onto the port taxonomy.
    pub(crate) fn from_open(port_name: &str, err: serialport::Error) -> Self {
        let port = port_name.to_string();
        match err.kind() {
            serialport::ErrorKind::NoDevice
            | serialport::ErrorKind::Io(std::io::ErrorKind::NotFound) => {
                Self::NotFound { port, source: err }
            }
            serialport::ErrorKind::Io(std::io::ErrorKind::PermissionDenied) => {
                Self::Busy { port, source: err }
            }
            serialport::ErrorKind::InvalidInput => Self::config(err.to_string()),
            _ => Self::Serial(err),
        }
    }
}
