//! Serial device traits
//!
//! Split into two traits:
//! - `SerialBackend`: turns a bare port name into a device path and acquires it
//! - `RawDevice`: one acquired device: line settings, timeout, read/write
//!
//! Opening is deliberately staged (acquire, read settings, apply settings) so
//! that `SerialPortAccess::open` can release the device if a later stage fails.

use std::time::Duration;

use crate::domain::{BridgeResult, LineSettings};

/// Backend that can acquire serial devices.
pub trait SerialBackend: Send + Sync {
    /// Build the OS-specific device path for a bare port name (e.g. `COM3`)
    fn device_path(&self, name: &str) -> String;

    /// Acquire exclusive read/write access to the device at `path`
    fn acquire(&self, path: &str) -> BridgeResult<Box<dyn RawDevice>>;
}

/// An acquired device. Dropping it releases the underlying OS resource.
/// Only requires `Send` (not `Sync`); callers serialise access themselves.
pub trait RawDevice: Send {
    /// Read the line settings currently in effect
    fn line_settings(&mut self) -> BridgeResult<LineSettings>;

    /// Overwrite baud rate, data bits, parity and stop bits
    fn apply_line_settings(&mut self, settings: &LineSettings) -> BridgeResult<()>;

    /// Bound each read/write by `timeout`; `None` blocks
    fn set_timeout(&mut self, timeout: Option<Duration>) -> BridgeResult<()>;

    /// Write bytes, returning how many the device accepted
    fn write(&mut self, data: &[u8]) -> BridgeResult<usize>;

    /// Read into `buffer`, returning how many bytes arrived (0 on timeout)
    fn read(&mut self, buffer: &mut [u8]) -> BridgeResult<usize>;
}
