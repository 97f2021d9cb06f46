//! Port numbers and their device paths.

use std::fmt;
use std::num::NonZeroU16;

/// Placeholder replaced by the port number in a device path template.
pub const NUMBER_PLACEHOLDER: &str = "{n}";

/// Default device path template for the host platform.
#[cfg(windows)]
pub const DEFAULT_PORT_TEMPLATE: &str = r"\\.\COM{n}";

/// Default device path template for the host platform.
#[cfg(not(windows))]
pub const DEFAULT_PORT_TEMPLATE: &str = "/dev/ttyS{n}";

/// A serial port number, as in `COM5`. Always at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PortId(NonZeroU16);

impl PortId {
    pub fn new(number: u16) -> Option<Self> {
        NonZeroU16::new(number).map(Self)
    }

    pub fn number(self) -> u16 {
        self.0.get()
    }

    /// Ids `1..=max`, ascending.
    pub fn range_to(max: u16) -> impl Iterator<Item = PortId> {
        (1..=max).filter_map(PortId::new)
    }
}

impl fmt::Display for PortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "COM{}", self.0)
    }
}

impl std::str::FromStr for PortId {
    type Err = String;

    /// Accepts `5`, `COM5` or `com5`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed
            .get(..3)
            .filter(|prefix| prefix.eq_ignore_ascii_case("com"))
            .map_or(trimmed, |_| &trimmed[3..]);
        digits
            .parse::<u16>()
            .ok()
            .and_then(PortId::new)
            .ok_or_else(|| format!("'{trimmed}' is not a port number"))
    }
}

/// Maps port numbers onto platform device paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortNaming {
    template: String,
}

impl PortNaming {
    /// `template` must contain `{n}`.
    pub fn new(template: impl Into<String>) -> Option<Self> {
        let template = template.into();
        template
            .contains(NUMBER_PLACEHOLDER)
            .then_some(Self { template })
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn device_path(&self, id: PortId) -> String {
        self.template
            .replace(NUMBER_PLACEHOLDER, &id.number().to_string())
    }
}

impl Default for PortNaming {
    fn default() -> Self {
        Self {
            template: DEFAULT_PORT_TEMPLATE.to_string(),
        }
    }
}
