//! Port entry points: open, close, write, read, set timeout

use std::ffi::CStr;
use std::os::raw::{c_char, c_int, c_longlong};
use std::time::Duration;

use crate::domain::{BridgeError, BridgeResult, LineSettings};
use crate::state::BridgeState;

use super::buffer::out_buffer;
use super::{guarded, state, ComlinkHandle, INVALID_HANDLE};

/// Open and configure a port by bare name (`COM3`, `ttyUSB0`).
///
/// Returns `0` on failure; see `comlink_last_error` for why.
///
/// # Safety
/// `name` must be null or point to a NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn comlink_open(
    name: *const c_char,
    baud_rate: c_int,
    data_bits: c_int,
    parity: c_int,
    stop_bits: c_int,
) -> ComlinkHandle {
    guarded("comlink_open", INVALID_HANDLE, || {
        let name = unsafe { port_name(name) }?;
        let settings = LineSettings::from_raw(baud_rate, data_bits, parity, stop_bits)?;
        open_port(state(), name, settings)
    })
}

/// Close a port. Closing `0`, an unknown handle or an already closed one
/// does nothing beyond setting the last error.
#[no_mangle]
pub extern "C" fn comlink_close(handle: ComlinkHandle) {
    guarded("comlink_close", (), || close_port(state(), handle))
}

/// Write `length` bytes from `data`. Returns the count accepted, which may
/// be less than `length`, or `-1`.
///
/// # Safety
/// `data` must be valid for reads of `length` bytes (may be null when
/// `length` is 0).
#[no_mangle]
pub unsafe extern "C" fn comlink_write(
    handle: ComlinkHandle,
    data: *const c_char,
    length: c_int,
) -> c_int {
    guarded("comlink_write", -1, || {
        let data = unsafe { in_buffer(data, length) }?;
        let written = write_port(state(), handle, data)?;
        Ok(c_int::try_from(written).unwrap_or(c_int::MAX))
    })
}

/// Read up to `capacity` bytes into `buffer`. Returns the count read (0 if
/// nothing arrived within the timeout) or `-1`. No terminator is written.
///
/// # Safety
/// `buffer` must be valid for writes of `capacity` bytes (may be null when
/// `capacity` is 0).
#[no_mangle]
pub unsafe extern "C" fn comlink_read(
    handle: ComlinkHandle,
    buffer: *mut c_char,
    capacity: c_int,
) -> c_int {
    guarded("comlink_read", -1, || {
        if capacity < 0 || (buffer.is_null() && capacity > 0) {
            return Err(BridgeError::InvalidArgument(format!(
                "bad read buffer (capacity {capacity})"
            )));
        }
        let mut empty: [u8; 0] = [];
        let dest = unsafe { out_buffer(buffer, capacity) }.unwrap_or(&mut empty);
        let read = read_port(state(), handle, dest)?;
        Ok(c_int::try_from(read).unwrap_or(c_int::MAX))
    })
}

/// Set the read/write timeout of an open port in milliseconds. A negative
/// value blocks until data arrives. Returns `0` or `-1`.
#[no_mangle]
pub extern "C" fn comlink_set_timeout(handle: ComlinkHandle, timeout_ms: c_longlong) -> c_int {
    guarded("comlink_set_timeout", -1, || {
        let timeout = u64::try_from(timeout_ms).ok().map(Duration::from_millis);
        set_port_timeout(state(), handle, timeout)?;
        Ok(0)
    })
}

unsafe fn port_name<'a>(name: *const c_char) -> BridgeResult<&'a str> {
    if name.is_null() {
        return Err(BridgeError::InvalidArgument("port name is null".into()));
    }
    CStr::from_ptr(name)
        .to_str()
        .map_err(|_| BridgeError::InvalidArgument("port name is not UTF-8".into()))
}

unsafe fn in_buffer<'a>(data: *const c_char, length: c_int) -> BridgeResult<&'a [u8]> {
    if length < 0 {
        return Err(BridgeError::InvalidArgument(format!("negative length {length}")));
    }
    if length == 0 {
        return Ok(&[]);
    }
    if data.is_null() {
        return Err(BridgeError::InvalidArgument("data is null".into()));
    }
    Ok(std::slice::from_raw_parts(data.cast::<u8>(), length as usize))
}

pub(crate) fn open_port(
    state: &BridgeState,
    name: &str,
    settings: LineSettings,
) -> BridgeResult<ComlinkHandle> {
    let port = state.access.open(name, settings)?;
    let handle = state.registry.insert(port)?;
    log::debug!("{name} registered as handle {handle}");
    Ok(handle)
}

pub(crate) fn close_port(state: &BridgeState, handle: ComlinkHandle) -> BridgeResult<()> {
    state.registry.remove(handle).inspect_err(|_| {
        log::debug!("Ignoring close of unknown handle {handle}");
    })
}

pub(crate) fn write_port(state: &BridgeState, handle: ComlinkHandle, data: &[u8]) -> BridgeResult<usize> {
    state.registry.with_handle(handle, |port| port.write(data))
}

pub(crate) fn read_port(
    state: &BridgeState,
    handle: ComlinkHandle,
    buffer: &mut [u8],
) -> BridgeResult<usize> {
    state.registry.with_handle(handle, |port| port.read_into(buffer))
}

pub(crate) fn set_port_timeout(
    state: &BridgeState,
    handle: ComlinkHandle,
    timeout: Option<Duration>,
) -> BridgeResult<()> {
    state
        .registry
        .with_handle(handle, |port| port.set_timeout(timeout))
}
