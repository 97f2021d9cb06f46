//! Core traits for serial port abstraction.
//!
//! `SerialPortAdapter` lets real ports and mocks be used interchangeably by
//! sessions and the message channel. `PortOpener` is the seam discovery and
//! sessions use to turn a port number into an open handle.

use super::baud::BaudRate;
use super::error::PortError;
use super::naming::PortId;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Line parameters applied to a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineSettings {
    /// Baud rate (bits per second).
    pub baud_rate: u32,

    /// Number of data bits (5, 6, 7, or 8).
    pub data_bits: DataBits,

    /// Parity checking mode.
    pub parity: Parity,

    /// Number of stop bits.
    pub stop_bits: StopBits,

    /// Flow control mode.
    pub flow_control: FlowControl,
}

impl LineSettings {
    /// 8 data bits, no parity, 1 stop bit, no flow control.
    pub fn eight_n_one(baud: BaudRate) -> Self {
        Self {
            baud_rate: baud.bits_per_second(),
            data_bits: DataBits::Eight,
            parity: Parity::None,
            stop_bits: StopBits::One,
            flow_control: FlowControl::None,
        }
    }

    /// 8N1 at `baud`, keeping this setting's flow control.
    pub fn as_eight_n_one(&self, baud: BaudRate) -> Self {
        Self {
            flow_control: self.flow_control,
            ..Self::eight_n_one(baud)
        }
    }
}

impl Default for LineSettings {
    fn default() -> Self {
        Self::eight_n_one(BaudRate::default())
    }
}

/// Deterministic read/write timeout policy.
///
/// A read of `n` bytes gives up after `read_constant + read_multiplier * n`;
/// a write of `n` bytes after `write_constant + write_multiplier * n`.
/// `read_interval` bounds the silence tolerated between two bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutPolicy {
    pub read_interval: Duration,
    pub read_constant: Duration,
    pub read_multiplier: Duration,
    pub write_constant: Duration,
    pub write_multiplier: Duration,
}

impl TimeoutPolicy {
    /// Total time budget for a read requesting `bytes` bytes.
    pub fn read_total(&self, bytes: usize) -> Duration {
        self.read_constant + self.read_multiplier * saturating_u32(bytes)
    }

    /// Total time budget for a write of `bytes` bytes.
    pub fn write_total(&self, bytes: usize) -> Duration {
        self.write_constant + self.write_multiplier * saturating_u32(bytes)
    }
}

impl Default for TimeoutPolicy {
    fn default() -> Self {
        Self {
            read_interval: Duration::from_millis(50),
            read_constant: Duration::from_millis(50),
            read_multiplier: Duration::from_millis(10),
            write_constant: Duration::from_millis(50),
            write_multiplier: Duration::from_millis(10),
        }
    }
}

fn saturating_u32(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

/// Number of data bits per character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataBits {
    Five,
    Six,
    Seven,
    Eight,
}

impl From<DataBits> for serialport::DataBits {
    fn from(bits: DataBits) -> Self {
        match bits {
            DataBits::Five => serialport::DataBits::Five,
            DataBits::Six => serialport::DataBits::Six,
            DataBits::Seven => serialport::DataBits::Seven,
            DataBits::Eight => serialport::DataBits::Eight,
        }
    }
}

impl From<serialport::DataBits> for DataBits {
    fn from(bits: serialport::DataBits) -> Self {
        match bits {
            serialport::DataBits::Five => DataBits::Five,
            serialport::DataBits::Six => DataBits::Six,
            serialport::DataBits::Seven => DataBits::Seven,
            serialport::DataBits::Eight => DataBits::Eight,
        }
    }
}

/// Flow control modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowControl {
    None,
    Software,
    Hardware,
}

impl From<FlowControl> for serialport::FlowControl {
    fn from(flow: FlowControl) -> Self {
        match flow {
            FlowControl::None => serialport::FlowControl::None,
            FlowControl::Software => serialport::FlowControl::Software,
            FlowControl::Hardware => serialport::FlowControl::Hardware,
        }
    }
}

impl From<serialport::FlowControl> for FlowControl {
    fn from(flow: serialport::FlowControl) -> Self {
        match flow {
            serialport::FlowControl::None => FlowControl::None,
            serialport::FlowControl::Software => FlowControl::Software,
            serialport::FlowControl::Hardware => FlowControl::Hardware,
        }
    }
}

/// Parity checking modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Parity {
    None,
    Odd,
    Even,
}

impl From<Parity> for serialport::Parity {
    fn from(parity: Parity) -> Self {
        match parity {
            Parity::None => serialport::Parity::None,
            Parity::Odd => serialport::Parity::Odd,
            Parity::Even => serialport::Parity::Even,
        }
    }
}

impl From<serialport::Parity> for Parity {
    fn from(parity: serialport::Parity) -> Self {
        match parity {
            serialport::Parity::None => Parity::None,
            serialport::Parity::Odd => Parity::Odd,
            serialport::Parity::Even => Parity::Even,
        }
    }
}

/// Number of stop bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopBits {
    One,
    Two,
}

impl From<StopBits> for serialport::StopBits {
    fn from(bits: StopBits) -> Self {
        match bits {
            StopBits::One => serialport::StopBits::One,
            StopBits::Two => serialport::StopBits::Two,
        }
    }
}

impl From<serialport::StopBits> for StopBits {
    fn from(bits: serialport::StopBits) -> Self {
        match bits {
            serialport::StopBits::One => StopBits::One,
            serialport::StopBits::Two => StopBits::Two,
        }
    }
}

/// Trait for serial port I/O operations.
///
/// Every method maps onto one OS-level capability; policy (what is fatal,
/// what is retried) lives in the session and channel layers.
pub trait SerialPortAdapter: Send + std::fmt::Debug {
    /// Write bytes to the serial port.
    ///
    /// Returns the number of bytes actually written.
    fn write_bytes(&mut self, data: &[u8]) -> Result<usize, PortError>;

    /// Read bytes from the serial port into the provided buffer.
    ///
    /// Returns the number of bytes actually read.
    fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<usize, PortError>;

    /// Get the name/path of this serial port.
    fn name(&self) -> &str;

    /// Read back the line parameters currently in effect.
    fn line_settings(&self) -> Result<LineSettings, PortError>;

    /// Apply baud rate and framing.
    fn apply_line_settings(&mut self, settings: &LineSettings) -> Result<(), PortError>;

    /// Install the read/write timeout policy.
    fn set_timeouts(&mut self, policy: TimeoutPolicy) -> Result<(), PortError>;

    /// Clear both input and output buffers.
    ///
    /// This discards any unread data in the receive buffer and any unsent
    /// data in the transmit buffer.
    fn clear_buffers(&mut self) -> Result<(), PortError>;

    /// Number of received bytes waiting in the input buffer. Never blocks.
    fn bytes_to_read(&self) -> Result<usize, PortError>;
}

/// Turns a port number into an exclusively held handle.
pub trait PortOpener {
    /// Open `id` exclusively for reading and writing.
    fn open(&self, id: PortId) -> Result<Box<dyn SerialPortAdapter>, PortError>;

    /// Whether `id` can currently be opened. The probe handle is released
    /// before returning.
    fn probe(&self, id: PortId) -> bool {
        self.open(id).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_line_settings() {
        let settings = LineSettings::default();
        assert_eq!(settings.baud_rate, 9600);
        assert_eq!(settings.data_bits, DataBits::Eight);
        assert_eq!(settings.flow_control, FlowControl::None);
        assert_eq!(settings.parity, Parity::None);
        assert_eq!(settings.stop_bits, StopBits::One);
    }

    #[test]
    fn test_eight_n_one_keeps_flow_control() {
        let current = LineSettings {
            baud_rate: 1200,
            data_bits: DataBits::Seven,
            parity: Parity::Even,
            stop_bits: StopBits::Two,
            flow_control: FlowControl::Software,
        };
        let next = current.as_eight_n_one(BaudRate::B38400);

        assert_eq!(next.baud_rate, 38400);
        assert_eq!(next.data_bits, DataBits::Eight);
        assert_eq!(next.parity, Parity::None);
        assert_eq!(next.stop_bits, StopBits::One);
        assert_eq!(next.flow_control, FlowControl::Software);
    }

    #[test]
    fn test_timeout_policy_totals() {
        let policy = TimeoutPolicy::default();
        assert_eq!(policy.read_interval, Duration::from_millis(50));
        assert_eq!(policy.read_total(0), Duration::from_millis(50));
        assert_eq!(policy.read_total(255), Duration::from_millis(2600));
        assert_eq!(policy.write_total(7), Duration::from_millis(120));
    }

    #[test]
    fn test_data_bits_conversion() {
        let bits = DataBits::Eight;
        let serialport_bits: serialport::DataBits = bits.into();
        assert_eq!(serialport_bits, serialport::DataBits::Eight);
        assert_eq!(DataBits::from(serialport_bits), DataBits::Eight);
    }

    #[test]
    fn test_parity_conversion() {
        let parity = Parity::Even;
        let serialport_parity: serialport::Parity = parity.into();
        assert_eq!(serialport_parity, serialport::Parity::Even);
        assert_eq!(Parity::from(serialport_parity), Parity::Even);
    }

    #[test]
    fn test_stop_bits_conversion() {
        let stop_bits = StopBits::Two;
        let serialport_stop_bits: serialport::StopBits = stop_bits.into();
        assert_eq!(serialport_stop_bits, serialport::StopBits::Two);
    }
}
