//! Supported baud rates and the numbered menu that selects them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Rate used whenever a menu selection (or a configured value) is invalid.
pub const DEFAULT_BAUD_RATE: BaudRate = BaudRate::B9600;

/// One of the fixed line speeds the tool offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum BaudRate {
    B300,
    B1200,
    B2400,
    B4800,
    B9600,
    B19200,
    B38400,
    B57600,
    B115200,
}

impl BaudRate {
    /// All rates in menu order. Menu choice `i` (1-based) is `ALL[i - 1]`.
    pub const ALL: [BaudRate; 9] = [
        BaudRate::B300,
        BaudRate::B1200,
        BaudRate::B2400,
        BaudRate::B4800,
        BaudRate::B9600,
        BaudRate::B19200,
        BaudRate::B38400,
        BaudRate::B57600,
        BaudRate::B115200,
    ];

    /// Bits per second.
    pub const fn bits_per_second(self) -> u32 {
        match self {
            BaudRate::B300 => 300,
            BaudRate::B1200 => 1200,
            BaudRate::B2400 => 2400,
            BaudRate::B4800 => 4800,
            BaudRate::B9600 => 9600,
            BaudRate::B19200 => 19200,
            BaudRate::B38400 => 38400,
            BaudRate::B57600 => 57600,
            BaudRate::B115200 => 115200,
        }
    }

    /// Look up a rate by its 1-based menu number.
    pub fn from_menu_index(index: usize) -> Option<Self> {
        index.checked_sub(1).and_then(|i| Self::ALL.get(i).copied())
    }

    /// Resolve raw menu input. Anything that is not a listed number falls
    /// back to 9600; the flag reports whether the fallback was taken.
    pub fn from_menu_input(input: &str) -> (Self, bool) {
        match input.trim().parse::<usize>().ok().and_then(Self::from_menu_index) {
            Some(rate) => (rate, false),
            None => (DEFAULT_BAUD_RATE, true),
        }
    }
}

impl Default for BaudRate {
    fn default() -> Self {
        DEFAULT_BAUD_RATE
    }
}

impl TryFrom<u32> for BaudRate {
    type Error = String;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::ALL
            .iter()
            .copied()
            .find(|rate| rate.bits_per_second() == value)
            .ok_or_else(|| format!("unsupported baud rate {value}"))
    }
}

impl From<BaudRate> for u32 {
    fn from(rate: BaudRate) -> Self {
        rate.bits_per_second()
    }
}

impl fmt::Display for BaudRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.bits_per_second())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_menu_index_lookup() {
        assert_eq!(BaudRate::from_menu_index(1), Some(BaudRate::B300));
        assert_eq!(BaudRate::from_menu_index(5), Some(BaudRate::B9600));
        assert_eq!(BaudRate::from_menu_index(9), Some(BaudRate::B115200));
        assert_eq!(BaudRate::from_menu_index(0), None);
        assert_eq!(BaudRate::from_menu_index(10), None);
    }

    #[test]
    fn test_invalid_menu_input_defaults_to_9600() {
        assert_eq!(BaudRate::from_menu_input("42"), (BaudRate::B9600, true));
        assert_eq!(BaudRate::from_menu_input("0"), (BaudRate::B9600, true));
        assert_eq!(BaudRate::from_menu_input("fast"), (BaudRate::B9600, true));
        assert_eq!(BaudRate::from_menu_input(""), (BaudRate::B9600, true));
        assert_eq!(BaudRate::from_menu_input(" 9\n"), (BaudRate::B115200, false));
    }

    #[test]
    fn test_u32_conversion() {
        assert_eq!(BaudRate::try_from(57600), Ok(BaudRate::B57600));
        assert!(BaudRate::try_from(14400).is_err());
        assert_eq!(u32::from(BaudRate::B1200), 1200);
    }

    #[test]
    fn test_display() {
        assert_eq!(BaudRate::B38400.to_string(), "38400");
    }
}
