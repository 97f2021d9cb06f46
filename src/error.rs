//! Application-level errors.
//!
//! Only failures that end the program surface as `AppError`; everything the
//! interactive loop survives (configure, purge, send, receive) is reported
//! where it happens and never leaves the controller.

use crate::config::ConfigError;
use crate::port::{PortError, PortId};
use std::process::ExitCode;
use thiserror::Error;

/// Errors that terminate the program.
#[derive(Debug, Error)]
pub enum AppError {
    /// Fewer than two openable ports were found.
    #[error("No COM port pairs found (for example COM1 <-> COM2)")]
    DiscoveryEmpty,

    /// One port of the selected pair could not be opened. Both are released.
    #[error("Failed to open {port}: {source}")]
    OpenFailure {
        port: PortId,
        #[source]
        source: PortError,
    },

    /// Configuration could not be loaded or validated.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The console itself failed (stdin/stdout).
    #[error("Console I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    pub fn open_failure(port: PortId, source: PortError) -> Self {
        Self::OpenFailure { port, source }
    }

    /// Process exit status for this error. Every fatal condition maps to 1.
    pub fn exit_code(&self) -> ExitCode {
        ExitCode::FAILURE
    }
}

/// Result alias for fallible top-level operations.
pub type AppResult<T> = Result<T, AppError>;
