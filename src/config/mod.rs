//! Configuration module for serial-pair.
//!
//! This module provides TOML-based configuration with environment variable overrides.
//!
//! # Configuration Resolution
//!
//! Configuration is loaded from the following locations (in order of priority):
//!
//! 1. `SERIAL_PAIR_CONFIG` environment variable (explicit path)
//! 2. `./serial-pair.toml` (current directory)
//! 3. `~/.config/serial-pair/serial-pair.toml` (Linux), or the platform
//!    equivalent reported by `directories`
//! 4. Built-in defaults (no file required)
//!
//! Nothing is ever written back.
//!
//! # Environment Overrides
//!
//! The pattern is: `SERIAL_PAIR_<SECTION>_<KEY>`
//!
//! Examples:
//! - `SERIAL_PAIR_DISCOVERY_MAX_PORT=32`
//! - `SERIAL_PAIR_DISCOVERY_PORT_TEMPLATE=/dev/pts/{n}`
//! - `SERIAL_PAIR_SESSION_RECEIVE_DEADLINE_MS=2000`
//!
//! # Example
//!
//! ```rust,no_run
//! use serial_pair::config::ConfigLoader;
//!
//! let loader = ConfigLoader::load()?;
//! let config = loader.config();
//!
//! println!("Probing up to COM{}", config.discovery.max_port);
//! println!("Default baud: {}", config.line.default_baud);
//! # Ok::<(), serial_pair::config::ConfigError>(())
//! ```

mod error;
mod loader;
mod schema;

pub use error::{ConfigError, ConfigResult};
pub use loader::{
    get_default_config_dir, get_default_config_path, resolve_config_path, ConfigLoader,
};
pub use schema::{
    Config, DiscoveryConfig, LineConfig, LogFormat, LoggingConfig, SessionConfig, TimeoutsConfig,
};
