//! Mock serial adapter for development and testing without hardware.
//!
//! Every mock port is a loopback plug: bytes written to a port become
//! readable from the same port. Faults can be injected per port, and the
//! backend counts live devices so tests can prove nothing leaks.
//!
//! Activate at the C boundary by setting COMLINK_MOCK=1 in the environment:
//!
//!   COMLINK_MOCK=1 RUST_LOG=comlink_lib=debug ./host-app
//!
//! Every acquire/release is logged at DEBUG level.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::domain::{BridgeError, BridgeResult, LineSettings, PortInfo};
use crate::ports::{PortLister, RawDevice, SerialBackend};

const PATH_PREFIX: &str = "mock://";

/// Failure to inject into the open sequence of a mock port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MockFault {
    #[default]
    None,
    /// Reading the current line settings fails
    SettingsRead,
    /// Applying new line settings fails
    SettingsWrite,
}

#[derive(Default)]
struct MockPort {
    in_use: bool,
    fault: MockFault,
    /// Max bytes accepted per write call (simulates short writes)
    write_limit: Option<usize>,
    settings: LineSettings,
    loopback: VecDeque<u8>,
}

#[derive(Default)]
struct MockBus {
    ports: HashMap<String, MockPort>,
}

#[derive(Default)]
struct Shared {
    bus: Mutex<MockBus>,
    data_ready: Condvar,
    live: AtomicUsize,
}

impl Shared {
    fn bus(&self) -> BridgeResult<MutexGuard<'_, MockBus>> {
        self.bus
            .lock()
            .map_err(|_| BridgeError::Internal("mock bus state corrupted".into()))
    }

    /// Test-setup access; a poisoned bus is still usable for inspection.
    fn bus_lenient(&self) -> MutexGuard<'_, MockBus> {
        self.bus.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// In-memory backend. Cloning shares the same set of ports.
#[derive(Clone, Default)]
pub struct MockBackend {
    shared: Arc<Shared>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend with one loopback port per name
    pub fn with_ports<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let backend = Self::new();
        for name in names {
            backend.add_port(name);
        }
        backend
    }

    /// Plug in a port
    pub fn add_port(&self, name: impl Into<String>) {
        let name = name.into();
        log::debug!("[MOCK SERIAL] {name} attached");
        self.shared.bus_lenient().ports.entry(name).or_default();
    }

    /// Unplug a port. An open device keeps working until it is dropped.
    pub fn remove_port(&self, name: &str) {
        log::debug!("[MOCK SERIAL] {name} detached");
        self.shared.bus_lenient().ports.remove(name);
    }

    pub fn set_fault(&self, name: &str, fault: MockFault) {
        if let Some(port) = self.shared.bus_lenient().ports.get_mut(name) {
            port.fault = fault;
        }
    }

    pub fn set_write_limit(&self, name: &str, limit: Option<usize>) {
        if let Some(port) = self.shared.bus_lenient().ports.get_mut(name) {
            port.write_limit = limit;
        }
    }

    /// Line settings last applied to `name`
    pub fn settings(&self, name: &str) -> Option<LineSettings> {
        self.shared.bus_lenient().ports.get(name).map(|p| p.settings)
    }

    /// Number of devices acquired and not yet released
    pub fn live_devices(&self) -> usize {
        self.shared.live.load(Ordering::SeqCst)
    }
}

impl SerialBackend for MockBackend {
    fn device_path(&self, name: &str) -> String {
        format!("{PATH_PREFIX}{name}")
    }

    fn acquire(&self, path: &str) -> BridgeResult<Box<dyn RawDevice>> {
        let name = path.strip_prefix(PATH_PREFIX).unwrap_or(path);
        let mut bus = self.shared.bus()?;
        let port = bus
            .ports
            .get_mut(name)
            .ok_or_else(|| BridgeError::NotFound(path.to_string()))?;
        if port.in_use {
            return Err(BridgeError::AccessDenied(path.to_string()));
        }
        port.in_use = true;
        self.shared.live.fetch_add(1, Ordering::SeqCst);
        log::debug!("[MOCK SERIAL] {name} acquired");

        Ok(Box::new(MockDevice {
            name: name.to_string(),
            shared: Arc::clone(&self.shared),
            timeout: None,
        }))
    }
}

impl PortLister for MockBackend {
    fn list_ports(&self) -> BridgeResult<Vec<PortInfo>> {
        let bus = self.shared.bus()?;
        let mut ports: Vec<PortInfo> = bus
            .ports
            .keys()
            .map(|name| PortInfo {
                name: name.clone(),
                port_type: "Mock".to_string(),
            })
            .collect();
        ports.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(ports)
    }
}

/// One acquired mock port
pub struct MockDevice {
    name: String,
    shared: Arc<Shared>,
    timeout: Option<Duration>,
}

impl MockDevice {
    fn with_port<T>(&self, f: impl FnOnce(&mut MockPort) -> BridgeResult<T>) -> BridgeResult<T> {
        let mut bus = self.shared.bus()?;
        let port = bus
            .ports
            .get_mut(&self.name)
            .ok_or_else(|| BridgeError::Io(format!("{} was unplugged", self.name)))?;
        f(port)
    }
}

impl RawDevice for MockDevice {
    fn line_settings(&mut self) -> BridgeResult<LineSettings> {
        self.with_port(|port| match port.fault {
            MockFault::SettingsRead => Err(BridgeError::ConfigRead("injected fault".into())),
            _ => Ok(port.settings),
        })
    }

    fn apply_line_settings(&mut self, settings: &LineSettings) -> BridgeResult<()> {
        self.with_port(|port| match port.fault {
            MockFault::SettingsWrite => Err(BridgeError::ConfigWrite("injected fault".into())),
            _ => {
                port.settings = *settings;
                Ok(())
            }
        })
    }

    fn set_timeout(&mut self, timeout: Option<Duration>) -> BridgeResult<()> {
        self.timeout = timeout;
        Ok(())
    }

    fn write(&mut self, data: &[u8]) -> BridgeResult<usize> {
        let accepted = self.with_port(|port| {
            let n = port.write_limit.map_or(data.len(), |limit| limit.min(data.len()));
            port.loopback.extend(&data[..n]);
            Ok(n)
        })?;
        self.shared.data_ready.notify_all();
        Ok(accepted)
    }

    fn read(&mut self, buffer: &mut [u8]) -> BridgeResult<usize> {
        if buffer.is_empty() {
            return Ok(0);
        }
        let deadline = self.timeout.map(|t| Instant::now() + t);
        let mut bus = self.shared.bus()?;

        loop {
            let port = bus
                .ports
                .get_mut(&self.name)
                .ok_or_else(|| BridgeError::Io(format!("{} was unplugged", self.name)))?;
            if !port.loopback.is_empty() {
                let n = buffer.len().min(port.loopback.len());
                for (slot, byte) in buffer.iter_mut().zip(port.loopback.drain(..n)) {
                    *slot = byte;
                }
                return Ok(n);
            }

            bus = match deadline {
                None => self
                    .shared
                    .data_ready
                    .wait(bus)
                    .map_err(|_| BridgeError::Internal("mock bus state corrupted".into()))?,
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Ok(0);
                    }
                    self.shared
                        .data_ready
                        .wait_timeout(bus, deadline - now)
                        .map_err(|_| BridgeError::Internal("mock bus state corrupted".into()))?
                        .0
                }
            };
        }
    }
}

impl Drop for MockDevice {
    fn drop(&mut self) {
        if let Some(port) = self.shared.bus_lenient().ports.get_mut(&self.name) {
            port.in_use = false;
        }
        self.shared.live.fetch_sub(1, Ordering::SeqCst);
        log::debug!("[MOCK SERIAL] {} released", self.name);
    }
}
