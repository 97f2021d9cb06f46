//! Hardware-specific tests requiring real serial devices.
//!
//! These tests are ignored by default and require actual hardware to run.
//! They should be run manually with the `--ignored` flag and `TEST_PORT_A`
//! / `TEST_PORT_B` set to the two ends of a null-modem pair.

pub mod real_port_tests;
pub mod utils;
