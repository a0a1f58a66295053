//! Integration tests: SerialPortAccess against mock loopback ports
//!
//! These tests exercise the public Rust API end to end without hardware.
//! Every mock port echoes what is written to it, and the backend counts
//! live devices so leaks show up as a non-zero count.

use std::collections::HashSet;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use comlink_lib::access::{PortHandle, SerialPortAccess};
use comlink_lib::adapters::mock_serial::{MockBackend, MockFault};
use comlink_lib::domain::{BridgeError, DataBits, LineSettings, Parity, StopBits};

fn setup(ports: &[&str]) -> (SerialPortAccess, MockBackend) {
    let backend = MockBackend::with_ports(ports.iter().copied());
    let access = SerialPortAccess::new(Arc::new(backend.clone()), Arc::new(backend.clone()))
        .with_timeout(Some(Duration::from_millis(50)));
    (access, backend)
}

/// Write everything, looping over short writes the way callers must.
fn write_all(port: &mut PortHandle, mut data: &[u8]) -> usize {
    let mut calls = 0;
    while !data.is_empty() {
        let n = port.write(data).unwrap();
        assert!(n > 0, "device accepted nothing");
        data = &data[n..];
        calls += 1;
    }
    calls
}

/// Read until `len` bytes have arrived or a read comes back empty.
fn read_exact(port: &mut PortHandle, len: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(len);
    while out.len() < len {
        let chunk = port.read(len - out.len()).unwrap();
        if chunk.is_empty() {
            break;
        }
        out.extend_from_slice(&chunk);
    }
    out
}

#[test]
fn binary_payload_survives_round_trip() {
    let (access, _) = setup(&["MOCK0"]);
    let mut port = access.open("MOCK0", LineSettings::default()).unwrap();

    let payload: Vec<u8> = (0..=255u8).chain([0, 0, 0]).collect();
    write_all(&mut port, &payload);
    assert_eq!(read_exact(&mut port, payload.len()), payload);
}

#[test]
fn short_writes_converge() {
    let (access, backend) = setup(&["MOCK0"]);
    backend.set_write_limit("MOCK0", Some(7));
    let mut port = access.open("MOCK0", LineSettings::default()).unwrap();

    for len in [0usize, 1, 7, 8, 100] {
        let data = vec![0x5A; len];
        let calls = write_all(&mut port, &data);
        assert_eq!(calls, len.div_ceil(7));
        assert_eq!(read_exact(&mut port, len), data);
    }
}

#[test]
fn missing_port_fails_without_leaking() {
    let (access, backend) = setup(&["MOCK0"]);
    for settings in [
        LineSettings::default(),
        LineSettings::new(115200, DataBits::Seven, Parity::Even, StopBits::Two),
        LineSettings::new(300, DataBits::Five, Parity::Space, StopBits::OnePointFive),
    ] {
        let result = access.open("COM99", settings);
        assert!(matches!(result, Err(BridgeError::NotFound(_))));
    }
    assert_eq!(backend.live_devices(), 0);
}

#[test]
fn configuration_failures_release_the_port() {
    let (access, backend) = setup(&["MOCK0"]);
    for fault in [MockFault::SettingsRead, MockFault::SettingsWrite] {
        backend.set_fault("MOCK0", fault);
        assert!(access.open("MOCK0", LineSettings::default()).is_err());
        assert_eq!(backend.live_devices(), 0, "leaked after {fault:?}");
    }
}

#[test]
fn open_port_is_exclusive() {
    let (access, backend) = setup(&["MOCK0"]);
    let port = access.open("MOCK0", LineSettings::default()).unwrap();
    assert!(matches!(
        access.open("MOCK0", LineSettings::default()),
        Err(BridgeError::AccessDenied(_))
    ));
    port.close();
    assert_eq!(backend.live_devices(), 0);
    assert!(access.open("MOCK0", LineSettings::default()).is_ok());
}

#[test]
fn dropping_a_handle_releases_it() {
    let (access, backend) = setup(&["MOCK0"]);
    {
        let _port = access.open("MOCK0", LineSettings::default()).unwrap();
        assert_eq!(backend.live_devices(), 1);
    }
    assert_eq!(backend.live_devices(), 0);
}

#[test]
fn enumeration_is_stable_without_hardware_changes() {
    let (access, backend) = setup(&["MOCK0", "MOCK1", "MOCK2"]);
    let first: HashSet<String> = access.list_ports().unwrap().into_iter().collect();
    let second: HashSet<String> = access.list_ports().unwrap().into_iter().collect();
    assert_eq!(first, second);
    assert_eq!(first.len(), 3);

    backend.remove_port("MOCK1");
    let after: HashSet<String> = access.list_ports().unwrap().into_iter().collect();
    assert!(!after.contains("MOCK1"));
}

#[test]
fn distinct_handles_do_not_interfere_across_threads() {
    let (access, _) = setup(&["MOCK0", "MOCK1"]);
    let access = Arc::new(access);

    let workers: Vec<_> = ["MOCK0", "MOCK1"]
        .into_iter()
        .enumerate()
        .map(|(i, name)| {
            let access = Arc::clone(&access);
            thread::spawn(move || {
                let mut port = access.open(name, LineSettings::default()).unwrap();
                let payload = vec![i as u8; 4096];
                for chunk in payload.chunks(64) {
                    write_all(&mut port, chunk);
                    assert_eq!(read_exact(&mut port, chunk.len()), chunk);
                }
            })
        })
        .collect();

    for worker in workers {
        worker.join().unwrap();
    }
}

#[test]
fn blocking_read_returns_available_data() {
    let (access, _) = setup(&["MOCK0"]);
    let mut port = access.open("MOCK0", LineSettings::default()).unwrap();
    port.set_timeout(None).unwrap();
    port.write(b"x").unwrap();
    assert_eq!(port.read(8).unwrap(), b"x");
}
