//! Shared test utilities for serial-pair integration tests.
//!
//! Builds mock openers and drives the console controller from a script.

#![allow(dead_code)]

use serial_pair::controller::{ControllerSettings, SessionController};
use serial_pair::port::{MockOpener, MockSerialPort, PortId};
use serial_pair::AppResult;
use std::io::Cursor;
use std::time::Duration;

/// Port id from a number known to be non-zero.
pub fn id(n: u16) -> PortId {
    PortId::new(n).expect("port numbers in tests are non-zero")
}

/// A cross-linked pair registered under `a` and `b`, plus both ends for
/// inspection.
pub fn linked_opener(a: u16, b: u16) -> (MockOpener, MockSerialPort, MockSerialPort) {
    MockOpener::new().with_linked_pair(id(a), id(b))
}

/// Settings that probe a small range and never sleep.
pub fn fast_settings() -> ControllerSettings {
    ControllerSettings {
        max_port: 16,
        no_data_pause: Duration::ZERO,
        ..ControllerSettings::default()
    }
}

/// Result of one scripted console run.
pub struct Transcript {
    pub result: AppResult<()>,
    pub output: String,
    pub errors: String,
}

/// Run the controller with `script` as stdin.
pub fn run_script(opener: &MockOpener, settings: ControllerSettings, script: &str) -> Transcript {
    let mut controller = SessionController::new(
        opener,
        settings,
        Cursor::new(script.to_string()),
        Vec::new(),
        Vec::new(),
    );
    let result = controller.run();
    let (_, output, errors) = controller.into_parts();
    Transcript {
        result,
        output: String::from_utf8_lossy(&output).into_owned(),
        errors: String::from_utf8_lossy(&errors).into_owned(),
    }
}
