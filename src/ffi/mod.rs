//! C ABI exported to host runtimes
//!
//! | Symbol | Returns |
//! |---|---|
//! | `comlink_open(name, baud, data_bits, parity, stop_bits)` | handle, or `0` |
//! | `comlink_close(handle)` | nothing; unknown handles are ignored |
//! | `comlink_write(handle, data, length)` | bytes accepted, or `-1` |
//! | `comlink_read(handle, buffer, capacity)` | bytes read, or `-1` |
//! | `comlink_list_ports(buffer, capacity)` | number of ports |
//! | `comlink_set_timeout(handle, ms)` | `0`, or `-1` |
//! | `comlink_last_error()` | code of this thread's last failure |
//! | `comlink_last_error_message(buffer, capacity)` | message length |
//!
//! Parity codes: 0=none 1=odd 2=even 3=mark 4=space.
//! Stop-bit codes: 0=1 1=1.5 2=2. Data bits are the literal count (5-8).
//!
//! `comlink_read` writes exactly the bytes it reports and never appends a
//! NUL terminator; callers must use the returned length and need not
//! over-allocate.
//!
//! No panic unwinds into the host: every entry point catches it and returns
//! its failure value with `Internal` as the last error.

pub mod buffer;
pub mod enumerate;
pub mod errors;
pub mod port;

use std::panic::{self, AssertUnwindSafe};
use std::sync::OnceLock;

use crate::domain::{BridgeConfig, BridgeError, BridgeResult};
use crate::logging;
use crate::state::BridgeState;

/// Opaque port handle handed to the host. `0` means "no handle".
pub type ComlinkHandle = u64;

pub const INVALID_HANDLE: ComlinkHandle = 0;

static STATE: OnceLock<BridgeState> = OnceLock::new();

/// Process-wide bridge state, built from the environment on first use.
pub(crate) fn state() -> &'static BridgeState {
    STATE.get_or_init(|| match BridgeConfig::from_env() {
        Ok(config) => {
            logging::init(&config.log_level);
            BridgeState::new(config)
        }
        Err(e) => {
            let config = BridgeConfig::default();
            logging::init(&config.log_level);
            log::warn!("Ignoring bridge configuration: {e}");
            BridgeState::new(config)
        }
    })
}

/// Run one entry point: record its error (or clear the last one), and turn
/// errors and panics into `failure`.
pub(crate) fn guarded<T>(entry: &str, failure: T, f: impl FnOnce() -> BridgeResult<T>) -> T {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(value)) => {
            errors::clear();
            value
        }
        Ok(Err(e)) => {
            log::debug!("{entry} failed: {e}");
            errors::record(&e);
            failure
        }
        Err(_) => {
            let e = BridgeError::Internal(format!("panic in {entry}"));
            log::error!("{e}");
            errors::record(&e);
            failure
        }
    }
}
