use std::ffi::{c_char, CStr};
use std::ptr;

use crate::error::{HostError, ReceiveError, SendError};
use crate::host::{self, HandleId};
use crate::logging::{self, LoggingConfig};

// Error codes
pub const CARDINAL_SUCCESS: i32 = 0;
pub const CARDINAL_ERROR_NULL_POINTER: i32 = -1;
pub const CARDINAL_ERROR_INVALID_ARG: i32 = -2;
pub const CARDINAL_ERROR_OPEN_FAILED: i32 = -3;
pub const CARDINAL_ERROR_REJECTED: i32 = -4;
pub const CARDINAL_EMPTY: i32 = -5;
pub const CARDINAL_ERROR_CORRUPT: i32 = -6;
pub const CARDINAL_ERROR_INTERNAL: i32 = -7;

/// Borrow a NUL-terminated C string as UTF-8.
unsafe fn borrow_str<'a>(raw: *const c_char) -> Option<&'a str> {
    if raw.is_null() {
        return None;
    }
    CStr::from_ptr(raw).to_str().ok()
}

fn host_error_code(err: &HostError) -> i32 {
    match err {
        HostError::UnknownHandle(_) | HostError::WrongMode { .. } => CARDINAL_ERROR_INVALID_ARG,
        HostError::BufferTooSmall { .. } => CARDINAL_ERROR_INVALID_ARG,
        HostError::Send(SendError::Encode(_)) => CARDINAL_ERROR_INVALID_ARG,
        HostError::Send(SendError::TransportRejected(_)) => CARDINAL_ERROR_REJECTED,
        HostError::Send(SendError::Closed) => CARDINAL_ERROR_INVALID_ARG,
        HostError::Receive(ReceiveError::CorruptPayload(_)) => CARDINAL_ERROR_CORRUPT,
        HostError::Receive(_) => CARDINAL_ERROR_INTERNAL,
    }
}

// -----------------------------------------------------------------------------
// Logging
// -----------------------------------------------------------------------------

/// Install the stderr log subscriber (honours `RUST_LOG`).
///
/// # Returns
/// * 1 if this call installed it, 0 if a subscriber was already present.
#[no_mangle]
pub extern "C" fn cardinal_init_logging() -> i32 {
    i32::from(logging::init_logging(&LoggingConfig::default()))
}

// -----------------------------------------------------------------------------
// Publisher API
// -----------------------------------------------------------------------------

/// Open a publisher on a named channel.
///
/// # Arguments
/// * `channel_name` - NUL-terminated UTF-8 channel name.
///
/// # Returns
/// * Non-zero handle id, or 0 on failure.
#[no_mangle]
pub extern "C" fn cardinal_publisher_open(channel_name: *const c_char) -> u64 {
    let Some(name) = (unsafe { borrow_str(channel_name) }) else {
        tracing::error!("cardinal_publisher_open: channel name is null or not UTF-8");
        return 0;
    };
    match host::open_publisher(name) {
        Ok(id) => id,
        Err(e) => {
            tracing::error!(channel = name, error = %e, "FFI: failed to open publisher");
            0
        }
    }
}

/// Publish one message.
///
/// # Arguments
/// * `handle` - Id returned by `cardinal_publisher_open`.
/// * `text` - NUL-terminated UTF-8 message text.
/// * `timestamp` - Application-defined timestamp carried with the message.
///
/// # Returns
/// * 0 on success, negative error code otherwise.
#[no_mangle]
pub extern "C" fn cardinal_publisher_send(
    handle: HandleId,
    text: *const c_char,
    timestamp: i64,
) -> i32 {
    if text.is_null() {
        return CARDINAL_ERROR_NULL_POINTER;
    }
    let Some(text) = (unsafe { borrow_str(text) }) else {
        return CARDINAL_ERROR_INVALID_ARG;
    };
    match host::send(handle, text, timestamp) {
        Ok(()) => CARDINAL_SUCCESS,
        Err(e) => {
            tracing::debug!(handle, error = %e, "FFI: send failed");
            host_error_code(&e)
        }
    }
}

/// Close a publisher. Unknown ids and 0 are ignored.
#[no_mangle]
pub extern "C" fn cardinal_publisher_close(handle: HandleId) {
    host::close_publisher(handle);
}

// -----------------------------------------------------------------------------
// Subscriber API
// -----------------------------------------------------------------------------

/// Open a subscriber on a named channel.
///
/// # Returns
/// * Non-zero handle id, or 0 on failure.
#[no_mangle]
pub extern "C" fn cardinal_subscriber_open(channel_name: *const c_char) -> u64 {
    let Some(name) = (unsafe { borrow_str(channel_name) }) else {
        tracing::error!("cardinal_subscriber_open: channel name is null or not UTF-8");
        return 0;
    };
    match host::open_subscriber(name) {
        Ok(id) => id,
        Err(e) => {
            tracing::error!(channel = name, error = %e, "FFI: failed to open subscriber");
            0
        }
    }
}

/// Take the next message without blocking.
///
/// # Arguments
/// * `handle` - Id returned by `cardinal_subscriber_open`.
/// * `out_buf` - Buffer receiving the text bytes (not NUL-terminated).
///   Null is treated as a zero-sized buffer.
/// * `out_len` - Input: size of buf, Output: length of the text.
/// * `out_timestamp` - Receives the message timestamp. May be null.
///
/// # Returns
/// * 0 on success.
/// * CARDINAL_EMPTY if no message was available.
/// * CARDINAL_ERROR_INVALID_ARG if the buffer is too small; `out_len` holds the
///   required size and the message is kept for the next call.
/// * CARDINAL_ERROR_CORRUPT if the sample failed to decode (it is consumed).
#[no_mangle]
pub extern "C" fn cardinal_subscriber_receive(
    handle: HandleId,
    out_buf: *mut u8,
    out_len: *mut usize,
    out_timestamp: *mut i64,
) -> i32 {
    if out_len.is_null() {
        return CARDINAL_ERROR_NULL_POINTER;
    }
    let capacity = if out_buf.is_null() { 0 } else { unsafe { *out_len } };

    let message = match host::try_receive_within(handle, capacity) {
        Ok(Some(message)) => message,
        Ok(None) => return CARDINAL_EMPTY,
        Err(HostError::BufferTooSmall { needed }) => {
            unsafe { *out_len = needed };
            return CARDINAL_ERROR_INVALID_ARG;
        }
        Err(e) => return host_error_code(&e),
    };

    let text = message.text.as_bytes();
    unsafe {
        if !text.is_empty() {
            ptr::copy_nonoverlapping(text.as_ptr(), out_buf, text.len());
        }
        *out_len = text.len();
        if !out_timestamp.is_null() {
            *out_timestamp = message.timestamp;
        }
    }
    CARDINAL_SUCCESS
}

/// Close a subscriber. Unknown ids and 0 are ignored.
#[no_mangle]
pub extern "C" fn cardinal_subscriber_close(handle: HandleId) {
    host::close_subscriber(handle);
}
