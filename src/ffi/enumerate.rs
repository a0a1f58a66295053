//! Port enumeration entry point

use std::os::raw::{c_char, c_int};

use crate::domain::BridgeResult;
use crate::state::BridgeState;

use super::buffer::{copy_c_string, join_names, out_buffer};
use super::{guarded, state};

/// List present serial ports into `buffer` as one NUL-terminated string,
/// names separated by the configured delimiter (`,` by default) and cut
/// off at `capacity - 1` bytes.
///
/// Returns the number of ports found, even when the text was truncated.
/// Pass a null `buffer` to only count. Returns 0 (with an empty string in
/// `buffer`) when enumeration is unavailable.
///
/// # Safety
/// `buffer` must be null or valid for writes of `capacity` bytes.
#[no_mangle]
pub unsafe extern "C" fn comlink_list_ports(buffer: *mut c_char, capacity: c_int) -> c_int {
    let mut dest = unsafe { out_buffer(buffer, capacity) };
    if let Some(dest) = dest.as_deref_mut() {
        dest[0] = 0;
    }
    guarded("comlink_list_ports", 0, || {
        let count = list_ports_into(state(), dest)?;
        Ok(c_int::try_from(count).unwrap_or(c_int::MAX))
    })
}

pub(crate) fn list_ports_into(state: &BridgeState, dest: Option<&mut [u8]>) -> BridgeResult<usize> {
    let names = state.access.list_ports()?;
    if let Some(dest) = dest {
        let joined = join_names(&names, state.config.list_delimiter);
        copy_c_string(&joined, dest);
    }
    Ok(names.len())
}
