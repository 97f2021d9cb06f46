//! Configuration schema definitions.
//!
//! This module defines the structure of the configuration file using serde.
//! Every section has defaults, so an empty file (or no file) is valid.

use super::error::{ConfigError, ConfigResult};
use crate::channel::WriteMode;
use crate::discovery::DEFAULT_MAX_PORT;
use crate::port::{
    BaudRate, PortNaming, TimeoutPolicy, DEFAULT_BAUD_RATE, DEFAULT_PORT_TEMPLATE,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Port probing
    pub discovery: DiscoveryConfig,
    /// Line parameters
    pub line: LineConfig,
    /// Per-operation timeouts
    pub timeouts: TimeoutsConfig,
    /// Interactive session behavior
    pub session: SessionConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Config {
    /// Reject values the rest of the program cannot work with.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.discovery.max_port == 0 {
            return Err(ConfigError::validation(
                "discovery.max_port",
                "must be at least 1",
            ));
        }
        if PortNaming::new(self.discovery.port_template.as_str()).is_none() {
            return Err(ConfigError::validation(
                "discovery.port_template",
                "must contain the {n} placeholder",
            ));
        }
        if self.logging.level.parse::<tracing::Level>().is_err() {
            return Err(ConfigError::validation(
                "logging.level",
                format!("unknown level '{}'", self.logging.level),
            ));
        }
        Ok(())
    }

    /// Naming template for device paths.
    pub fn naming(&self) -> ConfigResult<PortNaming> {
        PortNaming::new(self.discovery.port_template.as_str()).ok_or_else(|| {
            ConfigError::validation(
                "discovery.port_template",
                "must contain the {n} placeholder",
            )
        })
    }
}

/// Discovery configuration section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Highest port number probed
    pub max_port: u16,
    /// Device path template; `{n}` is replaced by the port number
    pub port_template: String,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            max_port: DEFAULT_MAX_PORT,
            port_template: DEFAULT_PORT_TEMPLATE.to_string(),
        }
    }
}

/// Line parameter section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineConfig {
    /// Baud rate used when the menu answer is invalid
    pub default_baud: BaudRate,
}

impl Default for LineConfig {
    fn default() -> Self {
        Self {
            default_baud: DEFAULT_BAUD_RATE,
        }
    }
}

/// Timeout section, all values in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutsConfig {
    pub read_interval_ms: u64,
    pub read_constant_ms: u64,
    pub read_multiplier_ms: u64,
    pub write_constant_ms: u64,
    pub write_multiplier_ms: u64,
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self::from(TimeoutPolicy::default())
    }
}

impl From<TimeoutPolicy> for TimeoutsConfig {
    fn from(policy: TimeoutPolicy) -> Self {
        let ms = |d: Duration| d.as_millis() as u64;
        Self {
            read_interval_ms: ms(policy.read_interval),
            read_constant_ms: ms(policy.read_constant),
            read_multiplier_ms: ms(policy.read_multiplier),
            write_constant_ms: ms(policy.write_constant),
            write_multiplier_ms: ms(policy.write_multiplier),
        }
    }
}

impl TimeoutsConfig {
    /// The policy installed on every configured port.
    pub fn policy(&self) -> TimeoutPolicy {
        TimeoutPolicy {
            read_interval: Duration::from_millis(self.read_interval_ms),
            read_constant: Duration::from_millis(self.read_constant_ms),
            read_multiplier: Duration::from_millis(self.read_multiplier_ms),
            write_constant: Duration::from_millis(self.write_constant_ms),
            write_multiplier: Duration::from_millis(self.write_multiplier_ms),
        }
    }
}

/// Interactive session section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Give up on an incomplete frame after this long; unset waits forever
    pub receive_deadline_ms: Option<u64>,
    /// Pause after a receive that found nothing
    pub no_data_pause_ms: u64,
    /// "single_attempt" or "write_all"
    pub write_mode: WriteMode,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            receive_deadline_ms: None,
            no_data_pause_ms: 2000,
            write_mode: WriteMode::SingleAttempt,
        }
    }
}

impl SessionConfig {
    pub fn receive_deadline(&self) -> Option<Duration> {
        self.receive_deadline_ms.map(Duration::from_millis)
    }

    pub fn no_data_pause(&self) -> Duration {
        Duration::from_millis(self.no_data_pause_ms)
    }
}

/// Logging configuration section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Log format: "json", "pretty", "compact"
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: LogFormat::Compact,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON format
    Json,
    /// Pretty format with colors
    Pretty,
    /// Compact format
    #[default]
    Compact,
}
