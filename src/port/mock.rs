//! Mock serial port implementation for testing.
//!
//! `MockSerialPort` simulates a serial device without hardware. Two mocks can
//! be cross-linked into a null-modem pair so that bytes written on one show up
//! in the other's input buffer. `MockOpener` stands in for the system opener
//! and enforces exclusive opens.

use super::error::PortError;
use super::naming::PortId;
use super::traits::{LineSettings, PortOpener, SerialPortAdapter, TimeoutPolicy};
use std::collections::{BTreeMap, VecDeque};
use std::io;
use std::sync::{Arc, Mutex, MutexGuard};

/// Inner state of the mock port, protected by a mutex for interior mutability.
#[derive(Debug, Default)]
struct MockPortState {
    /// Queue of bytes to be returned by read operations.
    read_queue: VecDeque<u8>,
    /// Log of all bytes written to the port.
    write_log: Vec<Vec<u8>>,
    /// Largest slice a single read may return (`None` = unlimited).
    max_read_chunk: Option<usize>,
    /// Largest slice a single write may accept (`None` = unlimited).
    max_write_chunk: Option<usize>,
    /// Empty reads return `Ok(0)` instead of a `WouldBlock` error.
    zero_byte_reads: bool,
    /// Number of `read_bytes` calls made.
    read_calls: usize,
    /// Whether the next write should fail.
    fail_next_write: bool,
    /// Whether the next read should fail.
    fail_next_read: bool,
    /// Whether applying line settings should fail.
    fail_settings: bool,
    /// Whether clearing buffers should fail.
    fail_clear: bool,
    /// Whether the pending-input query should fail.
    fail_status: bool,
    /// Line settings currently applied.
    settings: LineSettings,
    /// Timeout policy currently applied.
    timeouts: TimeoutPolicy,
    /// Whether buffers have been cleared.
    buffers_cleared: bool,
    /// Live handles leased out through an opener.
    open_handles: usize,
}

/// Mock serial port implementation for testing.
///
/// # Example
/// ```
/// use serial_pair::port::{MockSerialPort, SerialPortAdapter};
///
/// let (mut a, mut b) = MockSerialPort::linked_pair("COM2", "COM5");
///
/// a.write_bytes(b"ping\r\n").unwrap();
/// assert_eq!(b.bytes_to_read().unwrap(), 6);
///
/// let mut buffer = [0u8; 16];
/// let n = b.read_bytes(&mut buffer).unwrap();
/// assert_eq!(&buffer[..n], b"ping\r\n");
/// ```
pub struct MockSerialPort {
    /// The port name/identifier.
    name: String,
    /// The internal state, wrapped in Arc<Mutex<>> for interior mutability.
    state: Arc<Mutex<MockPortState>>,
    /// Input buffer of the cross-linked port, if any.
    peer: Option<Arc<Mutex<MockPortState>>>,
    /// Set on handles handed out by `lease`; dropping one releases the port.
    leased: bool,
}

fn lock(state: &Mutex<MockPortState>) -> MutexGuard<'_, MockPortState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockSerialPort {
    /// Create a new, unlinked mock serial port with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Arc::new(Mutex::new(MockPortState::default())),
            peer: None,
            leased: false,
        }
    }

    /// Create two ports wired as a null-modem: writes on one are readable on
    /// the other.
    pub fn linked_pair(a: impl Into<String>, b: impl Into<String>) -> (Self, Self) {
        let mut first = Self::new(a);
        let mut second = Self::new(b);
        first.peer = Some(Arc::clone(&second.state));
        second.peer = Some(Arc::clone(&first.state));
        (first, second)
    }

    /// Hand out a handle sharing this port's state. The port counts as open
    /// until the handle is dropped.
    pub fn lease(&self) -> Self {
        lock(&self.state).open_handles += 1;
        Self {
            name: self.name.clone(),
            state: Arc::clone(&self.state),
            peer: self.peer.clone(),
            leased: true,
        }
    }

    /// Number of leased handles still alive.
    pub fn open_handles(&self) -> usize {
        lock(&self.state).open_handles
    }

    /// Enqueue bytes to be returned by subsequent read operations.
    pub fn enqueue_read(&mut self, data: &[u8]) {
        lock(&self.state).read_queue.extend(data);
    }

    /// Get a copy of all data written to the port.
    pub fn get_write_log(&self) -> Vec<Vec<u8>> {
        lock(&self.state).write_log.clone()
    }

    /// All written bytes, concatenated.
    pub fn written_bytes(&self) -> Vec<u8> {
        lock(&self.state).write_log.concat()
    }

    /// Limit how many bytes one read may return.
    pub fn set_max_read_chunk(&mut self, limit: usize) {
        lock(&self.state).max_read_chunk = Some(limit);
    }

    /// Limit how many bytes one write may accept.
    pub fn set_max_write_chunk(&mut self, limit: usize) {
        lock(&self.state).max_write_chunk = Some(limit);
    }

    /// Make empty reads return `Ok(0)` rather than a `WouldBlock` error.
    pub fn set_zero_byte_reads(&mut self, enabled: bool) {
        lock(&self.state).zero_byte_reads = enabled;
    }

    /// Make the next write fail with a broken-pipe I/O error.
    pub fn fail_next_write(&mut self) {
        lock(&self.state).fail_next_write = true;
    }

    /// Make the next read fail with a broken-pipe I/O error.
    pub fn fail_next_read(&mut self) {
        lock(&self.state).fail_next_read = true;
    }

    /// Make `apply_line_settings` fail.
    pub fn set_fail_settings(&mut self, fail: bool) {
        lock(&self.state).fail_settings = fail;
    }

    /// Make `clear_buffers` fail.
    pub fn set_fail_clear(&mut self, fail: bool) {
        lock(&self.state).fail_clear = fail;
    }

    /// Make `bytes_to_read` fail.
    pub fn set_fail_status(&mut self, fail: bool) {
        lock(&self.state).fail_status = fail;
    }

    /// Number of `read_bytes` calls so far.
    pub fn read_calls(&self) -> usize {
        lock(&self.state).read_calls
    }

    /// Line settings most recently applied.
    pub fn current_settings(&self) -> LineSettings {
        lock(&self.state).settings
    }

    /// Timeout policy most recently applied.
    pub fn current_timeouts(&self) -> TimeoutPolicy {
        lock(&self.state).timeouts
    }

    /// Get whether buffers have been cleared since the last reset.
    pub fn was_cleared(&self) -> bool {
        lock(&self.state).buffers_cleared
    }

    /// Get the number of bytes available to read.
    pub fn available_bytes(&self) -> usize {
        lock(&self.state).read_queue.len()
    }
}

impl Clone for MockSerialPort {
    /// Clones share state but never inherit a lease.
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            state: Arc::clone(&self.state),
            peer: self.peer.clone(),
            leased: false,
        }
    }
}

impl Drop for MockSerialPort {
    fn drop(&mut self) {
        if self.leased {
            let mut state = lock(&self.state);
            state.open_handles = state.open_handles.saturating_sub(1);
        }
    }
}

impl SerialPortAdapter for MockSerialPort {
    fn write_bytes(&mut self, data: &[u8]) -> Result<usize, PortError> {
        let accepted = {
            let mut state = lock(&self.state);
            if state.fail_next_write {
                state.fail_next_write = false;
                return Err(PortError::Io(io::Error::new(
                    io::ErrorKind::BrokenPipe,
                    "simulated write failure",
                )));
            }
            let n = state.max_write_chunk.map_or(data.len(), |max| max.min(data.len()));
            state.write_log.push(data[..n].to_vec());
            n
        };

        if let Some(peer) = &self.peer {
            lock(peer).read_queue.extend(&data[..accepted]);
        }
        Ok(accepted)
    }

    fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<usize, PortError> {
        let mut state = lock(&self.state);
        state.read_calls += 1;
        if state.fail_next_read {
            state.fail_next_read = false;
            return Err(PortError::Io(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "simulated read failure",
            )));
        }

        let limit = state
            .max_read_chunk
            .map_or(buffer.len(), |max| max.min(buffer.len()));
        let mut bytes_read = 0;
        for byte in buffer.iter_mut().take(limit) {
            match state.read_queue.pop_front() {
                Some(queued) => {
                    *byte = queued;
                    bytes_read += 1;
                }
                None => break,
            }
        }

        if bytes_read == 0 && !state.zero_byte_reads {
            // Simulate "would block" behavior by returning an I/O error
            return Err(PortError::Io(io::Error::new(
                io::ErrorKind::WouldBlock,
                "No data available",
            )));
        }
        Ok(bytes_read)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn line_settings(&self) -> Result<LineSettings, PortError> {
        Ok(lock(&self.state).settings)
    }

    fn apply_line_settings(&mut self, settings: &LineSettings) -> Result<(), PortError> {
        let mut state = lock(&self.state);
        if state.fail_settings {
            return Err(PortError::config("simulated SetCommState failure"));
        }
        state.settings = *settings;
        Ok(())
    }

    fn set_timeouts(&mut self, policy: TimeoutPolicy) -> Result<(), PortError> {
        lock(&self.state).timeouts = policy;
        Ok(())
    }

    fn clear_buffers(&mut self) -> Result<(), PortError> {
        let mut state = lock(&self.state);
        if state.fail_clear {
            return Err(PortError::Io(io::Error::new(
                io::ErrorKind::Other,
                "simulated purge failure",
            )));
        }
        state.read_queue.clear();
        state.buffers_cleared = true;
        Ok(())
    }

    fn bytes_to_read(&self) -> Result<usize, PortError> {
        let state = lock(&self.state);
        if state.fail_status {
            return Err(PortError::Io(io::Error::new(
                io::ErrorKind::Other,
                "simulated status failure",
            )));
        }
        Ok(state.read_queue.len())
    }
}

impl std::fmt::Debug for MockSerialPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockSerialPort")
            .field("name", &self.name)
            .field("available_bytes", &self.available_bytes())
            .field("linked", &self.peer.is_some())
            .finish()
    }
}

/// Opener over a fixed set of mock ports.
///
/// Ports not registered behave as missing devices; a registered port with a
/// live handle behaves as exclusively held.
#[derive(Debug, Default)]
pub struct MockOpener {
    ports: BTreeMap<PortId, MockSerialPort>,
    open_log: Mutex<Vec<PortId>>,
}

impl MockOpener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a port under `id`. The caller keeps its clone for inspection.
    pub fn with_port(mut self, id: PortId, port: &MockSerialPort) -> Self {
        self.ports.insert(id, port.clone());
        self
    }

    /// Register a cross-linked pair and return both ends.
    pub fn with_linked_pair(
        self,
        a: PortId,
        b: PortId,
    ) -> (Self, MockSerialPort, MockSerialPort) {
        let (first, second) = MockSerialPort::linked_pair(a.to_string(), b.to_string());
        let opener = self.with_port(a, &first).with_port(b, &second);
        (opener, first, second)
    }

    /// Every id an open was attempted for, in order (probes included).
    pub fn open_log(&self) -> Vec<PortId> {
        self.open_log
            .lock()
            .map(|log| log.clone())
            .unwrap_or_default()
    }

    /// Total live handles across all registered ports.
    pub fn open_handles(&self) -> usize {
        self.ports.values().map(MockSerialPort::open_handles).sum()
    }
}

impl PortOpener for MockOpener {
    fn open(&self, id: PortId) -> Result<Box<dyn SerialPortAdapter>, PortError> {
        if let Ok(mut log) = self.open_log.lock() {
            log.push(id);
        }
        let port = self
            .ports
            .get(&id)
            .ok_or_else(|| PortError::not_found(id.to_string(), "no such mock port"))?;
        if port.open_handles() > 0 {
            return Err(PortError::busy(id.to_string(), "mock port is already open"));
        }
        Ok(Box::new(port.lease()))
    }
}
