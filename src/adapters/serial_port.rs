//! Serial port adapter using the `serialport` crate
//!
//! Implements `SerialBackend`, `RawDevice` and `PortLister`.
//! `SerialPortBackend` has no instance data. It only knows how to turn a
//! bare name into a device path and open it.
//!
//! The `serialport` crate cannot express mark/space parity or 1.5 stop bits;
//! asking for them fails the open with `ConfigWrite`.

use std::io::{self, Read, Write};
use std::path::Path;
use std::time::Duration;

use crate::domain::{
    BridgeError, BridgeResult, DataBits, LineSettings, Parity, PortInfo, StopBits,
};
use crate::ports::{PortLister, RawDevice, SerialBackend};

/// Stand-in for "no timeout". `serialport` always needs a duration; this is
/// the largest one that survives its millisecond conversions on every platform.
const BLOCKING_TIMEOUT: Duration = Duration::from_millis(i32::MAX as u64);

/// Zero-sized backend opening real serial devices.
pub struct SerialPortBackend;

impl SerialBackend for SerialPortBackend {
    fn device_path(&self, name: &str) -> String {
        device_path_for(name)
    }

    fn acquire(&self, path: &str) -> BridgeResult<Box<dyn RawDevice>> {
        // The builder needs some baud rate; the real one is applied after
        // the current settings have been read.
        let port = serialport::new(path, LineSettings::default().baud_rate)
            .timeout(BLOCKING_TIMEOUT)
            .open()
            .map_err(|e| acquire_error(path, e))?;

        Ok(Box::new(SerialPortDevice { port }))
    }
}

#[cfg(windows)]
fn device_path_for(name: &str) -> String {
    // `\\.\` is required for COM10 and above, harmless below
    if name.starts_with(r"\\.\") {
        name.to_string()
    } else {
        format!(r"\\.\{name}")
    }
}

#[cfg(not(windows))]
fn device_path_for(name: &str) -> String {
    if name.contains('/') {
        name.to_string()
    } else {
        format!("/dev/{name}")
    }
}

fn acquire_error(path: &str, e: serialport::Error) -> BridgeError {
    match e.kind() {
        serialport::ErrorKind::NoDevice if held_elsewhere(path, &e) => {
            BridgeError::AccessDenied(format!("{path}: {e}"))
        }
        serialport::ErrorKind::NoDevice => BridgeError::NotFound(format!("{path}: {e}")),
        serialport::ErrorKind::Io(io::ErrorKind::NotFound) => {
            BridgeError::NotFound(format!("{path}: {e}"))
        }
        serialport::ErrorKind::Io(io::ErrorKind::PermissionDenied) => {
            BridgeError::AccessDenied(format!("{path}: {e}"))
        }
        serialport::ErrorKind::InvalidInput => BridgeError::InvalidArgument(format!("{path}: {e}")),
        _ => BridgeError::Io(format!("Failed to open {path}: {e}")),
    }
}

/// `serialport` reports a busy or exclusively locked port as `NoDevice`,
/// the same kind it uses for a missing one. A device node that still exists
/// is held by someone else.
#[cfg(not(windows))]
fn held_elsewhere(path: &str, _e: &serialport::Error) -> bool {
    Path::new(path).exists()
}

/// `\\.\COMx` paths can't be stat'ed, so go by the OS message instead
/// (`ERROR_ACCESS_DENIED` is folded into `NoDevice`).
#[cfg(windows)]
fn held_elsewhere(path: &str, e: &serialport::Error) -> bool {
    e.description.to_ascii_lowercase().contains("denied") || Path::new(path).exists()
}

/// An open serial port wrapping `serialport::SerialPort`.
pub struct SerialPortDevice {
    port: Box<dyn serialport::SerialPort>,
}

impl RawDevice for SerialPortDevice {
    fn line_settings(&mut self) -> BridgeResult<LineSettings> {
        let read = |e: serialport::Error| BridgeError::ConfigRead(e.to_string());
        Ok(LineSettings {
            baud_rate: self.port.baud_rate().map_err(read)?,
            data_bits: from_serialport_data_bits(self.port.data_bits().map_err(read)?),
            parity: from_serialport_parity(self.port.parity().map_err(read)?),
            stop_bits: from_serialport_stop_bits(self.port.stop_bits().map_err(read)?),
        })
    }

    fn apply_line_settings(&mut self, settings: &LineSettings) -> BridgeResult<()> {
        let parity = to_serialport_parity(settings.parity)?;
        let stop_bits = to_serialport_stop_bits(settings.stop_bits)?;
        let write = |e: serialport::Error| BridgeError::ConfigWrite(e.to_string());

        self.port.set_baud_rate(settings.baud_rate).map_err(write)?;
        self.port
            .set_data_bits(to_serialport_data_bits(settings.data_bits))
            .map_err(write)?;
        self.port.set_parity(parity).map_err(write)?;
        self.port.set_stop_bits(stop_bits).map_err(write)
    }

    fn set_timeout(&mut self, timeout: Option<Duration>) -> BridgeResult<()> {
        let timeout = timeout.map_or(BLOCKING_TIMEOUT, |t| t.min(BLOCKING_TIMEOUT));
        self.port
            .set_timeout(timeout)
            .map_err(|e| BridgeError::ConfigWrite(format!("Failed to set timeout: {e}")))
    }

    fn write(&mut self, data: &[u8]) -> BridgeResult<usize> {
        match self.port.write(data) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == io::ErrorKind::TimedOut => {
                Err(BridgeError::Timeout(format!("write of {} bytes", data.len())))
            }
            Err(e) => Err(BridgeError::Io(format!("Write failed: {e}"))),
        }
    }

    fn read(&mut self, buffer: &mut [u8]) -> BridgeResult<usize> {
        match self.port.read(buffer) {
            Ok(n) => Ok(n),
            // Nothing arrived within the timeout
            Err(e) if e.kind() == io::ErrorKind::TimedOut => Ok(0),
            Err(e) => Err(BridgeError::Io(format!("Read failed: {e}"))),
        }
    }
}

fn to_serialport_data_bits(bits: DataBits) -> serialport::DataBits {
    match bits {
        DataBits::Five => serialport::DataBits::Five,
        DataBits::Six => serialport::DataBits::Six,
        DataBits::Seven => serialport::DataBits::Seven,
        DataBits::Eight => serialport::DataBits::Eight,
    }
}

fn from_serialport_data_bits(bits: serialport::DataBits) -> DataBits {
    match bits {
        serialport::DataBits::Five => DataBits::Five,
        serialport::DataBits::Six => DataBits::Six,
        serialport::DataBits::Seven => DataBits::Seven,
        serialport::DataBits::Eight => DataBits::Eight,
    }
}

fn to_serialport_parity(parity: Parity) -> BridgeResult<serialport::Parity> {
    match parity {
        Parity::None => Ok(serialport::Parity::None),
        Parity::Odd => Ok(serialport::Parity::Odd),
        Parity::Even => Ok(serialport::Parity::Even),
        Parity::Mark | Parity::Space => Err(BridgeError::ConfigWrite(format!(
            "{parity:?} parity is not supported by this backend"
        ))),
    }
}

fn from_serialport_parity(parity: serialport::Parity) -> Parity {
    match parity {
        serialport::Parity::None => Parity::None,
        serialport::Parity::Odd => Parity::Odd,
        serialport::Parity::Even => Parity::Even,
    }
}

fn to_serialport_stop_bits(stop_bits: StopBits) -> BridgeResult<serialport::StopBits> {
    match stop_bits {
        StopBits::One => Ok(serialport::StopBits::One),
        StopBits::Two => Ok(serialport::StopBits::Two),
        StopBits::OnePointFive => Err(BridgeError::ConfigWrite(
            "1.5 stop bits are not supported by this backend".into(),
        )),
    }
}

fn from_serialport_stop_bits(stop_bits: serialport::StopBits) -> StopBits {
    match stop_bits {
        serialport::StopBits::One => StopBits::One,
        serialport::StopBits::Two => StopBits::Two,
    }
}

/// Lists ports through the OS enumeration `serialport` wraps
/// (SetupAPI on Windows, sysfs on Linux, IOKit on macOS).
pub struct SystemPortLister;

impl PortLister for SystemPortLister {
    fn list_ports(&self) -> BridgeResult<Vec<PortInfo>> {
        let ports = serialport::available_ports()
            .map_err(|e| BridgeError::EnumerationUnavailable(e.to_string()))?;

        Ok(ports
            .into_iter()
            .map(|p| {
                let port_type = match &p.port_type {
                    serialport::SerialPortType::UsbPort(info) => {
                        format!("USB ({:04X}:{:04X})", info.vid, info.pid)
                    }
                    serialport::SerialPortType::PciPort => "PCI".to_string(),
                    serialport::SerialPortType::BluetoothPort => "Bluetooth".to_string(),
                    serialport::SerialPortType::Unknown => "Native".to_string(),
                };
                PortInfo {
                    name: port_name_of(&p.port_name),
                    port_type,
                }
            })
            .collect())
    }
}

/// Enumeration reports `/dev/ttyUSB0` on Unix but `open` takes bare names;
/// strip the prefix so listed names round-trip.
fn port_name_of(raw: &str) -> String {
    raw.strip_prefix("/dev/").unwrap_or(raw).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(windows)]
    #[test]
    fn device_path_prefixes_com_names() {
        assert_eq!(SerialPortBackend.device_path("COM12"), r"\\.\COM12");
        assert_eq!(SerialPortBackend.device_path(r"\\.\COM3"), r"\\.\COM3");
    }

    #[cfg(not(windows))]
    #[test]
    fn device_path_prefixes_bare_names() {
        assert_eq!(SerialPortBackend.device_path("ttyUSB0"), "/dev/ttyUSB0");
        assert_eq!(SerialPortBackend.device_path("/dev/ttyS1"), "/dev/ttyS1");
    }

    #[test]
    fn acquire_missing_device_fails() {
        let path = SerialPortBackend.device_path("comlink_nonexistent_port_12345");
        assert!(SerialPortBackend.acquire(&path).is_err());
    }

    #[test]
    fn mark_and_space_parity_are_rejected() {
        assert!(matches!(
            to_serialport_parity(Parity::Mark),
            Err(BridgeError::ConfigWrite(_))
        ));
        assert!(to_serialport_parity(Parity::Space).is_err());
        assert_eq!(to_serialport_parity(Parity::Even).unwrap(), serialport::Parity::Even);
    }

    #[test]
    fn one_and_a_half_stop_bits_are_rejected() {
        assert!(to_serialport_stop_bits(StopBits::OnePointFive).is_err());
        assert_eq!(
            to_serialport_stop_bits(StopBits::Two).unwrap(),
            serialport::StopBits::Two
        );
    }

    #[test]
    fn data_bits_map_both_ways() {
        for bits in [DataBits::Five, DataBits::Six, DataBits::Seven, DataBits::Eight] {
            assert_eq!(from_serialport_data_bits(to_serialport_data_bits(bits)), bits);
        }
    }

    #[test]
    fn no_device_for_missing_path_maps_to_not_found() {
        let path = SerialPortBackend.device_path("comlink_nonexistent_port_12345");
        let err = serialport::Error::new(serialport::ErrorKind::NoDevice, "gone");
        assert!(matches!(acquire_error(&path, err), BridgeError::NotFound(_)));
    }

    #[cfg(not(windows))]
    #[test]
    fn no_device_for_existing_path_maps_to_access_denied() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let path = file.path().to_str().unwrap();
        let err = serialport::Error::new(
            serialport::ErrorKind::NoDevice,
            "Unable to acquire exclusive lock on serial port",
        );
        assert!(matches!(acquire_error(path, err), BridgeError::AccessDenied(_)));
    }

    #[cfg(windows)]
    #[test]
    fn access_denied_message_maps_to_access_denied() {
        let err = serialport::Error::new(serialport::ErrorKind::NoDevice, "Access is denied.");
        assert!(matches!(acquire_error(r"\\.\COM4", err), BridgeError::AccessDenied(_)));
    }

    #[cfg(unix)]
    #[test]
    fn second_acquire_of_open_pty_is_access_denied() {
        let (_master, slave) = serialport::TTYPort::pair().unwrap();
        let path = serialport::SerialPort::name(&slave).unwrap();
        drop(slave);

        let first = SerialPortBackend.acquire(&path).unwrap();
        let second = SerialPortBackend.acquire(&path);
        assert!(
            matches!(second, Err(BridgeError::AccessDenied(_))),
            "{:?}",
            second.err()
        );

        drop(first);
    }

    #[cfg(unix)]
    #[test]
    fn zero_length_read_on_blocking_pty_returns_at_once() {
        use crate::access::SerialPortAccess;
        use std::sync::Arc;
        use std::time::Instant;

        let (_master, slave) = serialport::TTYPort::pair().unwrap();
        let path = serialport::SerialPort::name(&slave).unwrap();
        drop(slave);

        let access = SerialPortAccess::new(Arc::new(SerialPortBackend), Arc::new(SystemPortLister))
            .with_timeout(Some(Duration::from_secs(5)));
        let mut port = access.open(&path, LineSettings::default()).unwrap();

        let started = Instant::now();
        assert!(port.read(0).unwrap().is_empty());
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn permission_denied_maps_to_access_denied() {
        let err = serialport::Error::new(
            serialport::ErrorKind::Io(io::ErrorKind::PermissionDenied),
            "busy",
        );
        assert!(matches!(acquire_error("COM4", err), BridgeError::AccessDenied(_)));
    }

    #[test]
    fn listed_names_drop_dev_prefix() {
        assert_eq!(port_name_of("/dev/ttyACM0"), "ttyACM0");
        assert_eq!(port_name_of("COM3"), "COM3");
    }
}
