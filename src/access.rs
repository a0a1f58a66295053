//! SerialPortAccess: the open/close/read/write/list façade.
//!
//! Holds no state of its own beyond the backend it was built with. Every
//! open device is owned by the `PortHandle` returned from `open`; dropping
//! or closing the handle releases it.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::domain::{BridgeError, BridgeResult, LineSettings, PortInfo};
use crate::ports::{PortLister, RawDevice, SerialBackend};

pub struct SerialPortAccess {
    backend: Arc<dyn SerialBackend>,
    lister: Arc<dyn PortLister>,
    timeout: Option<Duration>,
}

impl SerialPortAccess {
    pub fn new(backend: Arc<dyn SerialBackend>, lister: Arc<dyn PortLister>) -> Self {
        Self {
            backend,
            lister,
            timeout: None,
        }
    }

    /// Timeout applied to every port opened from now on. `None` blocks.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Open `name` and configure it with `settings`.
    ///
    /// The device is acquired, its current settings read, then overwritten.
    /// If any stage after acquisition fails the device is dropped (and so
    /// released) before the error is returned.
    pub fn open(&self, name: &str, settings: LineSettings) -> BridgeResult<PortHandle> {
        validate_name(name)?;
        settings.validate()?;

        let path = self.backend.device_path(name);
        log::debug!("Opening serial port {path} at {settings}");

        let mut device = self.backend.acquire(&path).inspect_err(|e| {
            log::warn!("Failed to open serial port {path}: {e}");
        })?;

        // `device` is dropped on the error path, releasing the port
        configure(device.as_mut(), &settings, self.timeout).inspect_err(|e| {
            log::warn!("Failed to configure serial port {path}: {e}");
        })?;

        log::debug!("Serial port {path} opened");
        Ok(PortHandle {
            name: name.to_string(),
            settings,
            device,
        })
    }

    /// Names of the serial ports currently present
    pub fn list_ports(&self) -> BridgeResult<Vec<String>> {
        Ok(self
            .list_port_info()?
            .into_iter()
            .map(|info| info.name)
            .collect())
    }

    /// Like `list_ports`, with a transport description per port
    pub fn list_port_info(&self) -> BridgeResult<Vec<PortInfo>> {
        let ports = self.lister.list_ports().inspect_err(|e| {
            log::warn!("Failed to enumerate serial ports: {e}");
        })?;
        log::debug!("Enumerated {} serial port(s)", ports.len());
        Ok(ports)
    }
}

fn validate_name(name: &str) -> BridgeResult<()> {
    if name.trim().is_empty() {
        return Err(BridgeError::InvalidArgument("port name cannot be empty".into()));
    }
    if name.contains('\0') {
        return Err(BridgeError::InvalidArgument("port name contains NUL".into()));
    }
    Ok(())
}

fn configure(
    device: &mut dyn RawDevice,
    settings: &LineSettings,
    timeout: Option<Duration>,
) -> BridgeResult<()> {
    let current = device.line_settings()?;
    log::debug!("Replacing line settings {current} with {settings}");
    device.apply_line_settings(settings)?;
    device.set_timeout(timeout)
}

/// An open, configured serial port.
///
/// Move-only: `close` consumes the handle, so it can't be used or closed
/// again afterwards. I/O takes `&mut self`; sharing one handle between
/// threads needs the caller's own lock.
pub struct PortHandle {
    name: String,
    settings: LineSettings,
    device: Box<dyn RawDevice>,
}

impl PortHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn settings(&self) -> &LineSettings {
        &self.settings
    }

    /// Write raw bytes. Returns how many the device accepted, which may be
    /// fewer than `data.len()`; nothing is retried here.
    pub fn write(&mut self, data: &[u8]) -> BridgeResult<usize> {
        let written = self.device.write(data).inspect_err(|e| {
            log::warn!("Failed to write to {}: {e}", self.name);
        })?;
        log::debug!("Wrote {written}/{} bytes to {}", data.len(), self.name);
        Ok(written)
    }

    /// Read at most `max_len` bytes. An empty result means nothing arrived
    /// within the timeout.
    pub fn read(&mut self, max_len: usize) -> BridgeResult<Vec<u8>> {
        let mut buffer = vec![0u8; max_len];
        let n = self.read_into(&mut buffer)?;
        buffer.truncate(n);
        Ok(buffer)
    }

    /// Read into a caller-provided buffer, returning the byte count.
    /// Nothing is written past `buffer[n]`. An empty buffer returns 0 without
    /// touching the device, whatever the timeout.
    pub fn read_into(&mut self, buffer: &mut [u8]) -> BridgeResult<usize> {
        if buffer.is_empty() {
            return Ok(0);
        }
        let n = self.device.read(buffer).inspect_err(|e| {
            log::warn!("Failed to read from {}: {e}", self.name);
        })?;
        log::debug!("Read {n} bytes from {}", self.name);
        Ok(n)
    }

    /// Change the read/write timeout of this port. `None` blocks.
    pub fn set_timeout(&mut self, timeout: Option<Duration>) -> BridgeResult<()> {
        self.device.set_timeout(timeout)
    }

    /// Release the port.
    pub fn close(self) {
        log::debug!("Closing serial port {}", self.name);
    }
}

impl fmt::Debug for PortHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PortHandle")
            .field("name", &self.name)
            .field("settings", &self.settings)
            .finish()
    }
}
