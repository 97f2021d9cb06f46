//! Port session lifecycle.
//!
//! A [`PortSession`] owns at most one port handle and walks a one-way state
//! machine:
//!
//! ```text
//! Unopened ──open──> Opened ──configure──> Configured ──activate──> Active
//!     │                 │                       │                     │
//!     └─────────────────┴──────────close────────┴─────────────────────┴──> Closed
//! ```
//!
//! `Closed` is terminal. A failed `configure` leaves the session where it was
//! (settings may be partially applied) and callers treat it as a warning.
//! [`SessionPair`] opens the write and read sides together and never keeps one
//! open when the other failed.

use crate::error::{AppError, AppResult};
use crate::port::{BaudRate, PortError, PortId, PortOpener, SerialPortAdapter, TimeoutPolicy};
use std::fmt;
use tracing::{debug, info, warn};

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unopened,
    Opened,
    Configured,
    Active,
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Unopened => "unopened",
            Self::Opened => "opened",
            Self::Configured => "configured",
            Self::Active => "active",
            Self::Closed => "closed",
        };
        f.write_str(label)
    }
}

/// One serial port and the handle held on it.
pub struct PortSession {
    id: PortId,
    state: SessionState,
    handle: Option<Box<dyn SerialPortAdapter>>,
    baud: Option<BaudRate>,
}

impl PortSession {
    /// A session for `id` that holds nothing yet.
    pub fn new(id: PortId) -> Self {
        Self {
            id,
            state: SessionState::Unopened,
            handle: None,
            baud: None,
        }
    }

    /// Wrap an already opened handle.
    pub fn from_handle(id: PortId, handle: Box<dyn SerialPortAdapter>) -> Self {
        Self {
            id,
            state: SessionState::Opened,
            handle: Some(handle),
            baud: None,
        }
    }

    pub fn id(&self) -> PortId {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Baud rate applied by the last fully successful `configure`.
    pub fn baud(&self) -> Option<BaudRate> {
        self.baud
    }

    /// Open the port exclusively for read and write.
    ///
    /// On failure the session stays `Unopened` and holds nothing.
    pub fn open(&mut self, opener: &dyn PortOpener) -> Result<(), PortError> {
        match self.state {
            SessionState::Unopened => {}
            SessionState::Closed => return Err(PortError::Closed),
            _ => return Err(PortError::AlreadyOpen),
        }

        let handle = opener.open(self.id)?;
        info!(port = %self.id, device = handle.name(), "port opened");
        self.handle = Some(handle);
        self.state = SessionState::Opened;
        Ok(())
    }

    /// Apply `baud`, 8 data bits, 1 stop bit, no parity, and `timeouts`.
    ///
    /// The current parameters are read back first; if that, or any later
    /// step, fails the remaining steps are skipped and nothing is rolled back.
    pub fn configure(&mut self, baud: BaudRate, timeouts: TimeoutPolicy) -> Result<(), PortError> {
        let id = self.id;
        let handle = self.handle_mut()?;

        let current = handle.line_settings()?;
        debug!(port = %id, ?current, "current line settings");

        handle.apply_line_settings(&current.as_eight_n_one(baud))?;
        handle.set_timeouts(timeouts)?;

        self.baud = Some(baud);
        if self.state == SessionState::Opened {
            self.state = SessionState::Configured;
        }
        info!(port = %id, baud = %baud, "port configured");
        Ok(())
    }

    /// Enter the interactive phase. Allowed from `Opened` too, since a failed
    /// configure is not fatal.
    pub fn activate(&mut self) -> Result<(), PortError> {
        match self.state {
            SessionState::Opened | SessionState::Configured => {
                self.state = SessionState::Active;
                Ok(())
            }
            SessionState::Active => Ok(()),
            SessionState::Unopened => Err(PortError::NotOpen),
            SessionState::Closed => Err(PortError::Closed),
        }
    }

    /// Discard pending input and output in the OS buffers.
    pub fn purge(&mut self) -> Result<(), PortError> {
        self.handle_mut()?.clear_buffers()
    }

    /// Bytes waiting in the input buffer. Never blocks.
    pub fn bytes_pending(&self) -> Result<usize, PortError> {
        self.handle()?.bytes_to_read()
    }

    /// One bounded write under the write timeout.
    pub fn write(&mut self, data: &[u8]) -> Result<usize, PortError> {
        self.handle_mut()?.write_bytes(data)
    }

    /// One bounded read under the read timeouts.
    pub fn read(&mut self, buffer: &mut [u8]) -> Result<usize, PortError> {
        self.handle_mut()?.read_bytes(buffer)
    }

    /// Release the handle and move to `Closed`.
    ///
    /// Safe to call repeatedly; returns whether a handle was actually released.
    pub fn close(&mut self) -> bool {
        let released = self.handle.take().is_some();
        if released {
            info!(port = %self.id, "port closed");
        }
        self.state = SessionState::Closed;
        self.baud = None;
        released
    }

    fn handle(&self) -> Result<&dyn SerialPortAdapter, PortError> {
        match (&self.handle, self.state) {
            (Some(handle), _) => Ok(&**handle),
            (None, SessionState::Closed) => Err(PortError::Closed),
            (None, _) => Err(PortError::NotOpen),
        }
    }

    fn handle_mut(&mut self) -> Result<&mut (dyn SerialPortAdapter + 'static), PortError> {
        match (&mut self.handle, self.state) {
            (Some(handle), _) => Ok(&mut **handle),
            (None, SessionState::Closed) => Err(PortError::Closed),
            (None, _) => Err(PortError::NotOpen),
        }
    }
}

impl Drop for PortSession {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for PortSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PortSession")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("baud", &self.baud)
            .finish()
    }
}

/// The write side and read side of one discovered pair.
#[derive(Debug)]
pub struct SessionPair {
    pub write: PortSession,
    pub read: PortSession,
}

impl SessionPair {
    /// Open both ports. If either fails, whatever was opened is released and
    /// the failing port is reported.
    pub fn open(opener: &dyn PortOpener, write_id: PortId, read_id: PortId) -> AppResult<Self> {
        let mut write = PortSession::new(write_id);
        let mut read = PortSession::new(read_id);

        if let Err(source) = write.open(opener) {
            return Err(AppError::open_failure(write_id, source));
        }
        if let Err(source) = read.open(opener) {
            write.close();
            return Err(AppError::open_failure(read_id, source));
        }
        Ok(Self { write, read })
    }

    /// Configure both sides at the same rate. Failures are logged and
    /// returned; they never abort the session.
    pub fn configure(&mut self, baud: BaudRate, timeouts: TimeoutPolicy) -> Vec<(PortId, PortError)> {
        let mut warnings = Vec::new();
        for session in [&mut self.write, &mut self.read] {
            if let Err(e) = session.configure(baud, timeouts) {
                warn!(
                    port = %session.id(),
                    os_code = ?e.os_code(),
                    error = %e,
                    "failed to configure port; settings may be partially applied"
                );
                warnings.push((session.id(), e));
            }
        }
        warnings
    }

    /// Move both sides into the interactive phase.
    pub fn activate(&mut self) -> Result<(), PortError> {
        self.write.activate()?;
        self.read.activate()
    }

    /// Close both sides.
    pub fn close(&mut self) {
        self.write.close();
        self.read.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::{FlowControl, LineSettings, MockOpener, MockSerialPort};

    fn id(n: u16) -> PortId {
        PortId::new(n).unwrap()
    }

    #[test]
    fn test_lifecycle_walks_forward() {
        let port = MockSerialPort::new("COM2");
        let opener = MockOpener::new().with_port(id(2), &port);
        let mut session = PortSession::new(id(2));
        assert_eq!(session.state(), SessionState::Unopened);

        session.open(&opener).unwrap();
        assert_eq!(session.state(), SessionState::Opened);

        session.configure(BaudRate::B19200, TimeoutPolicy::default()).unwrap();
        assert_eq!(session.state(), SessionState::Configured);
        assert_eq!(session.baud(), Some(BaudRate::B19200));
        assert_eq!(port.current_settings(), LineSettings::eight_n_one(BaudRate::B19200));

        session.activate().unwrap();
        assert_eq!(session.state(), SessionState::Active);

        // Reconfiguring while active keeps the session active.
        session.configure(BaudRate::B300, TimeoutPolicy::default()).unwrap();
        assert_eq!(session.state(), SessionState::Active);
        assert_eq!(port.current_settings().baud_rate, 300);
    }

    #[test]
    fn test_configure_keeps_flow_control() {
        let mut port = MockSerialPort::new("COM2");
        port.apply_line_settings(&LineSettings {
            flow_control: FlowControl::Hardware,
            ..LineSettings::default()
        })
        .unwrap();
        let mut session = PortSession::from_handle(id(2), Box::new(port.clone()));

        session.configure(BaudRate::B57600, TimeoutPolicy::default()).unwrap();

        let applied = port.current_settings();
        assert_eq!(applied.baud_rate, 57600);
        assert_eq!(applied.flow_control, FlowControl::Hardware);
    }

    #[test]
    fn test_open_failure_leaves_session_unopened() {
        let opener = MockOpener::new();
        let mut session = PortSession::new(id(9));
        assert!(matches!(session.open(&opener), Err(PortError::NotFound { .. })));
        assert_eq!(session.state(), SessionState::Unopened);
        assert!(matches!(session.purge(), Err(PortError::NotOpen)));
    }

    #[test]
    fn test_double_open_is_rejected() {
        let port = MockSerialPort::new("COM1");
        let opener = MockOpener::new().with_port(id(1), &port);
        let mut session = PortSession::new(id(1));
        session.open(&opener).unwrap();
        assert!(matches!(session.open(&opener), Err(PortError::AlreadyOpen)));
    }

    #[test]
    fn test_close_is_idempotent_and_terminal() {
        let port = MockSerialPort::new("COM1");
        let opener = MockOpener::new().with_port(id(1), &port);
        let mut session = PortSession::new(id(1));
        session.open(&opener).unwrap();
        assert_eq!(port.open_handles(), 1);

        assert!(session.close());
        assert!(!session.close());
        assert_eq!(port.open_handles(), 0);
        assert_eq!(session.state(), SessionState::Closed);

        assert!(matches!(session.open(&opener), Err(PortError::Closed)));
        assert!(matches!(session.bytes_pending(), Err(PortError::Closed)));
        assert!(matches!(session.activate(), Err(PortError::Closed)));
    }

    #[test]
    fn test_configure_failure_is_reported_without_state_change() {
        let mut port = MockSerialPort::new("COM1");
        port.set_fail_settings(true);
        let mut session = PortSession::from_handle(id(1), Box::new(port.clone()));

        assert!(session.configure(BaudRate::B4800, TimeoutPolicy::default()).is_err());
        assert_eq!(session.state(), SessionState::Opened);
        assert_eq!(session.baud(), None);

        // Still usable: a failed configure is only a warning.
        session.activate().unwrap();
        assert_eq!(session.state(), SessionState::Active);
    }

    #[test]
    fn test_pair_releases_first_port_when_second_fails() {
        let port = MockSerialPort::new("COM2");
        let opener = MockOpener::new().with_port(id(2), &port);

        let err = SessionPair::open(&opener, id(2), id(5)).unwrap_err();
        match err {
            AppError::OpenFailure { port: failed, .. } => assert_eq!(failed, id(5)),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(opener.open_handles(), 0);
    }

    #[test]
    fn test_pair_configure_collects_warnings() {
        let (opener, mut write_port, _read_port) =
            MockOpener::new().with_linked_pair(id(2), id(5));
        write_port.set_fail_settings(true);

        let mut pair = SessionPair::open(&opener, id(2), id(5)).unwrap();
        let warnings = pair.configure(BaudRate::B9600, TimeoutPolicy::default());
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].0, id(2));
        assert_eq!(pair.read.state(), SessionState::Configured);

        pair.activate().unwrap();
        pair.close();
        assert_eq!(opener.open_handles(), 0);
    }
}
