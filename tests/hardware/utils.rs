//! Utility functions for hardware testing.

use serial_pair::port::{LineSettings, SyncSerialPort, TimeoutPolicy};
use std::env;

/// The two device paths of a null-modem pair, from the environment.
pub struct TestPairConfig {
    pub port_a: String,
    pub port_b: String,
}

impl TestPairConfig {
    /// `None` unless both `TEST_PORT_A` and `TEST_PORT_B` are set.
    pub fn from_env() -> Option<Self> {
        let port_a = env::var("TEST_PORT_A").ok()?;
        let port_b = env::var("TEST_PORT_B").ok()?;
        Some(Self { port_a, port_b })
    }

    /// Open both ends with default line settings and timeouts.
    pub fn open_both(&self) -> (SyncSerialPort, SyncSerialPort) {
        let a = SyncSerialPort::open(&self.port_a, LineSettings::default(), TimeoutPolicy::default())
            .expect("failed to open TEST_PORT_A");
        let b = SyncSerialPort::open(&self.port_b, LineSettings::default(), TimeoutPolicy::default())
            .expect("failed to open TEST_PORT_B");
        (a, b)
    }
}

/// Skip test if the pair is not configured.
pub fn skip_without_pair() -> Option<TestPairConfig> {
    let config = TestPairConfig::from_env();
    if config.is_none() {
        println!("Skipping hardware test: TEST_PORT_A / TEST_PORT_B not set");
    }
    config
}
