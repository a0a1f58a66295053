//! comlink: native serial port bridge
//!
//! Opens, configures, reads, writes and enumerates serial (COM) ports, and
//! exports those operations over a C ABI for host runtimes that load the
//! library dynamically.
//!
//! ## Architecture (Hexagonal / Ports & Adapters)
//!
//! - `domain/` - Line settings, port info, bridge configuration, errors
//! - `ports/` - Trait definitions for device backends and port listing
//! - `adapters/` - Implementations of ports (`serialport` crate, in-memory mock)
//! - `access` - `SerialPortAccess` façade and the owning `PortHandle`
//! - `state` - Handle registry shared by the C entry points
//! - `ffi/` - `extern "C"` entry points (driving adapters)
//!
//! Rust callers use `SerialPortAccess` directly:
//!
//! ```no_run
//! use std::sync::Arc;
//! use comlink_lib::access::SerialPortAccess;
//! use comlink_lib::adapters::serial_port::{SerialPortBackend, SystemPortLister};
//! use comlink_lib::domain::LineSettings;
//!
//! let access = SerialPortAccess::new(Arc::new(SerialPortBackend), Arc::new(SystemPortLister));
//! let mut port = access.open("COM3", LineSettings::default())?;
//! port.write(b"AT\r")?;
//! let reply = port.read(64)?;
//! port.close();
//! # Ok::<(), comlink_lib::domain::BridgeError>(())
//! ```

// Core domain (pure, no I/O)
pub mod domain;
pub mod ports;

// Adapters (external I/O)
pub mod adapters;

// Façade and C boundary
pub mod access;
pub mod ffi;
pub mod logging;
pub mod state;
