//! Synchronous serial port implementation.
//!
//! Wraps the `serialport` crate's `SerialPort` trait with our own
//! `SerialPortAdapter` trait, and provides `SystemOpener`, the opener used
//! against real devices.

use super::error::PortError;
use super::naming::{PortId, PortNaming};
use super::traits::{LineSettings, PortOpener, SerialPortAdapter, TimeoutPolicy};
use std::io::{Read, Write};
use std::time::Duration;

/// Synchronous serial port implementation wrapping `serialport::SerialPort`.
///
/// `serialport` exposes a single blocking timeout per handle, so the
/// per-operation totals of the [`TimeoutPolicy`] are installed just before
/// each read or write, sized to that operation.
pub struct SyncSerialPort {
    /// The underlying serial port implementation.
    port: Box<dyn serialport::SerialPort>,
    /// The port name/path for identification.
    name: String,
    timeouts: TimeoutPolicy,
}

impl SyncSerialPort {
    /// Open a serial port exclusively with the given line settings.
    ///
    /// `serialport` opens without sharing on every platform (no share flags
    /// on Windows, `TIOCEXCL` on Unix), so a port held elsewhere is refused.
    ///
    /// # Example
    /// ```no_run
    /// use serial_pair::port::{LineSettings, SyncSerialPort, TimeoutPolicy};
    ///
    /// let port = SyncSerialPort::open(r"\\.\COM3", LineSettings::default(), TimeoutPolicy::default())?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn open(
        port_name: &str,
        settings: LineSettings,
        timeouts: TimeoutPolicy,
    ) -> Result<Self, PortError> {
        let port = serialport::new(port_name, settings.baud_rate)
            .data_bits(settings.data_bits.into())
            .flow_control(settings.flow_control.into())
            .parity(settings.parity.into())
            .stop_bits(settings.stop_bits.into())
            .timeout(timeouts.read_total(0))
            .open()
            .map_err(|e| PortError::from_open(port_name, e))?;

        Ok(Self {
            port,
            name: port_name.to_string(),
            timeouts,
        })
    }

    fn install_timeout(&mut self, timeout: Duration) -> Result<(), PortError> {
        if self.port.timeout() != timeout {
            self.port.set_timeout(timeout)?;
        }
        Ok(())
    }
}

impl SerialPortAdapter for SyncSerialPort {
    fn write_bytes(&mut self, data: &[u8]) -> Result<usize, PortError> {
        self.install_timeout(self.timeouts.write_total(data.len()))?;
        self.port.write(data).map_err(PortError::Io)
    }

    fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<usize, PortError> {
        self.install_timeout(self.timeouts.read_total(buffer.len()))?;
        self.port.read(buffer).map_err(PortError::Io)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn line_settings(&self) -> Result<LineSettings, PortError> {
        Ok(LineSettings {
            baud_rate: self.port.baud_rate()?,
            data_bits: self.port.data_bits()?.into(),
            parity: self.port.parity()?.into(),
            stop_bits: self.port.stop_bits()?.into(),
            flow_control: self.port.flow_control()?.into(),
        })
    }

    fn apply_line_settings(&mut self, settings: &LineSettings) -> Result<(), PortError> {
        self.port.set_baud_rate(settings.baud_rate)?;
        self.port.set_data_bits(settings.data_bits.into())?;
        self.port.set_stop_bits(settings.stop_bits.into())?;
        self.port.set_parity(settings.parity.into())?;
        self.port.set_flow_control(settings.flow_control.into())?;
        Ok(())
    }

    fn set_timeouts(&mut self, policy: TimeoutPolicy) -> Result<(), PortError> {
        self.timeouts = policy;
        self.install_timeout(policy.read_total(0))
    }

    fn clear_buffers(&mut self) -> Result<(), PortError> {
        self.port
            .clear(serialport::ClearBuffer::All)
            .map_err(PortError::Serial)
    }

    fn bytes_to_read(&self) -> Result<usize, PortError> {
        let pending = self.port.bytes_to_read()?;
        // u32 -> usize is lossless on every supported target.
        Ok(pending as usize)
    }
}

impl std::fmt::Debug for SyncSerialPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncSerialPort")
            .field("name", &self.name)
            .field("baud_rate", &self.port.baud_rate())
            .finish()
    }
}

/// Opens real devices, naming them through a [`PortNaming`] template.
#[derive(Debug, Clone, Default)]
pub struct SystemOpener {
    naming: PortNaming,
    timeouts: TimeoutPolicy,
}

impl SystemOpener {
    pub fn new(naming: PortNaming, timeouts: TimeoutPolicy) -> Self {
        Self { naming, timeouts }
    }

    pub fn naming(&self) -> &PortNaming {
        &self.naming
    }
}

impl PortOpener for SystemOpener {
    fn open(&self, id: PortId) -> Result<Box<dyn SerialPortAdapter>, PortError> {
        let path = self.naming.device_path(id);
        // Every open applies 9600 8N1, probes included.
        let port = SyncSerialPort::open(&path, LineSettings::default(), self.timeouts)?;
        Ok(Box::new(port))
    }
}
