//! Per-thread last error, queried after a call returned its failure sentinel

use std::cell::RefCell;
use std::os::raw::{c_char, c_int};

use crate::domain::BridgeError;

use super::buffer::{copy_c_string, out_buffer};

thread_local! {
    static LAST_ERROR: RefCell<Option<(c_int, String)>> = const { RefCell::new(None) };
}

pub(crate) fn record(error: &BridgeError) {
    LAST_ERROR.with(|slot| *slot.borrow_mut() = Some((error.code(), error.to_string())));
}

pub(crate) fn clear() {
    LAST_ERROR.with(|slot| *slot.borrow_mut() = None);
}

pub(crate) fn last_code() -> c_int {
    LAST_ERROR.with(|slot| slot.borrow().as_ref().map_or(0, |(code, _)| *code))
}

pub(crate) fn last_message() -> String {
    LAST_ERROR.with(|slot| {
        slot.borrow()
            .as_ref()
            .map(|(_, message)| message.clone())
            .unwrap_or_default()
    })
}

/// Code of the calling thread's last failure (see `BridgeError::code`),
/// or 0 when its last call succeeded.
#[no_mangle]
pub extern "C" fn comlink_last_error() -> c_int {
    last_code()
}

/// Copy the calling thread's last error message into `buffer`
/// (NUL-terminated, truncated to `capacity - 1` bytes).
///
/// Returns the full message length, so a caller can size a second attempt.
///
/// # Safety
/// `buffer` must be null or valid for writes of `capacity` bytes.
#[no_mangle]
pub unsafe extern "C" fn comlink_last_error_message(buffer: *mut c_char, capacity: c_int) -> c_int {
    let message = last_message();
    if let Some(dest) = out_buffer(buffer, capacity) {
        copy_c_string(&message, dest);
    }
    c_int::try_from(message.len()).unwrap_or(c_int::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_then_clear() {
        record(&BridgeError::InvalidHandle);
        assert_eq!(comlink_last_error(), BridgeError::InvalidHandle.code());
        assert_eq!(last_message(), "Invalid or closed port handle");

        clear();
        assert_eq!(comlink_last_error(), 0);
        assert!(last_message().is_empty());
    }

    #[test]
    fn errors_are_per_thread() {
        record(&BridgeError::Io("boom".into()));
        let other = std::thread::spawn(|| comlink_last_error()).join().unwrap();
        assert_eq!(other, 0);
        assert_eq!(comlink_last_error(), 6);
    }

    #[test]
    fn message_is_copied_and_length_reported() {
        record(&BridgeError::NotFound("COM5".into()));
        let mut buf = [0 as c_char; 8];
        let len = unsafe { comlink_last_error_message(buf.as_mut_ptr(), 8) };
        assert_eq!(len as usize, "Port not found: COM5".len());
        let copied: Vec<u8> = buf.iter().map(|&c| c as u8).collect();
        assert_eq!(&copied, b"Port no\0");
    }
}
