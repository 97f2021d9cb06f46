//! Tests against a real (or emulated) null-modem pair.
//!
//! # Running Hardware Tests
//!
//! ```bash
//! # socat -d -d pty,raw,echo=0 pty,raw,echo=0   (prints two pty paths)
//! export TEST_PORT_A=/dev/pts/3
//! export TEST_PORT_B=/dev/pts/4
//! cargo test -- --ignored
//! ```

use super::utils::skip_without_pair;
use serial_pair::channel::{MessageChannel, ReceiveOutcome};
use serial_pair::port::{BaudRate, PortError, PortId, SerialPortAdapter, SyncSerialPort};
use serial_pair::port::{LineSettings, TimeoutPolicy};
use serial_pair::session::PortSession;
use std::time::{Duration, Instant};

fn wait_for_input(port: &PortSession) {
    let started = Instant::now();
    while port.bytes_pending().unwrap_or(0) == 0 && started.elapsed() < Duration::from_secs(2) {
        std::thread::sleep(Duration::from_millis(10));
    }
}

#[test]
#[ignore] // Run with --ignored flag
fn test_real_pair_exchanges_a_line() {
    let Some(pair) = skip_without_pair() else {
        return;
    };
    let (a, b) = pair.open_both();
    let mut write = PortSession::from_handle(PortId::new(1).unwrap(), Box::new(a));
    let mut read = PortSession::from_handle(PortId::new(2).unwrap(), Box::new(b));
    write.configure(BaudRate::B9600, TimeoutPolicy::default()).unwrap();
    read.configure(BaudRate::B9600, TimeoutPolicy::default()).unwrap();
    read.purge().unwrap();

    let channel = MessageChannel::new(Default::default(), Some(Duration::from_secs(2)));
    assert_eq!(channel.send(&mut write, "hardware").unwrap(), 10);

    wait_for_input(&read);
    match channel.receive(&mut read).unwrap() {
        ReceiveOutcome::Frame(frame) => assert_eq!(frame.payload(), "hardware"),
        ReceiveOutcome::Empty => panic!("nothing arrived on TEST_PORT_B"),
    }
}

#[test]
#[ignore]
fn test_real_port_is_exclusive() {
    let Some(pair) = skip_without_pair() else {
        return;
    };
    let (_a, _b) = pair.open_both();

    let second = SyncSerialPort::open(&pair.port_a, LineSettings::default(), TimeoutPolicy::default());
    assert!(matches!(second, Err(PortError::Busy { .. }) | Err(PortError::Serial(_))));
}

#[test]
#[ignore]
fn test_real_port_reports_line_settings() {
    let Some(pair) = skip_without_pair() else {
        return;
    };
    let (mut a, _b) = pair.open_both();

    a.apply_line_settings(&LineSettings::eight_n_one(BaudRate::B115200)).unwrap();
    assert_eq!(a.line_settings().unwrap().baud_rate, 115200);
    assert_eq!(a.bytes_to_read().unwrap(), 0);
}
