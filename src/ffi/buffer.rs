//! Helpers for caller-owned C buffers

use std::os::raw::{c_char, c_int};

/// View a caller buffer as bytes. `None` for a null pointer or a
/// non-positive capacity.
///
/// # Safety
/// `ptr` must be valid for writes of `capacity` bytes for `'a`.
pub(crate) unsafe fn out_buffer<'a>(ptr: *mut c_char, capacity: c_int) -> Option<&'a mut [u8]> {
    if ptr.is_null() || capacity <= 0 {
        return None;
    }
    Some(std::slice::from_raw_parts_mut(ptr.cast::<u8>(), capacity as usize))
}

/// Join port names with `delimiter`.
pub fn join_names(names: &[String], delimiter: char) -> String {
    let mut sep = [0u8; 4];
    names.join(&*delimiter.encode_utf8(&mut sep))
}

/// Copy `text` into `dest` and NUL-terminate it, truncating to
/// `dest.len() - 1` bytes without splitting a UTF-8 sequence.
/// Returns the number of bytes copied, excluding the terminator.
pub fn copy_c_string(text: &str, dest: &mut [u8]) -> usize {
    if dest.is_empty() {
        return 0;
    }
    let mut end = text.len().min(dest.len() - 1);
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    dest[..end].copy_from_slice(&text.as_bytes()[..end]);
    dest[end] = 0;
    end
}
