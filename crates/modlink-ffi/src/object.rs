use modlink_frame::{alloc_payload, decode_object, encode_object, free_payload, Frame};

use crate::error;
use crate::types::{ModlinkFrame, ModlinkResult};

/// Encode `len` bytes at `data` as an object frame tagged with `code`.
///
/// The payload is laid out exactly as a Rust module encoding a `Vec<u8>`
/// would, so either side can decode it. The new frame is written to
/// `out_frame` and owned by the caller.
///
/// # Safety
/// `data` must be readable for `len` bytes (or null with `len == 0`);
/// `out_frame` must be writable.
#[no_mangle]
pub unsafe extern "C" fn modlink_bytes_encode(
    data: *const u8,
    len: usize,
    code: i32,
    out_frame: *mut *mut ModlinkFrame,
) -> ModlinkResult {
    crate::ffi_boundary(ModlinkResult::Internal, || {
        error::clear_error_state();

        if out_frame.is_null() {
            return error::set_invalid_argument("out_frame cannot be null");
        }
        let bytes: &[u8] = if len == 0 {
            &[]
        } else if data.is_null() {
            return error::set_invalid_argument("data cannot be null when len > 0");
        } else {
            // SAFETY: the caller guarantees `len` readable bytes at `data`.
            unsafe { std::slice::from_raw_parts(data, len) }
        };

        match encode_object(bytes, code) {
            Ok(frame) => {
                // SAFETY: pointer was checked for null above.
                unsafe { *out_frame = frame.into_raw() };
                ModlinkResult::Ok
            }
            Err(err) => error::map_codec_error(&err),
        }
    })
}

/// Decode a byte payload produced by [`modlink_bytes_encode`] (or by a Rust
/// module encoding a `Vec<u8>`), consuming the frame and its payload.
///
/// On success a fresh buffer is written to `out_data` (release it with
/// [`modlink_buffer_free`]) and its length to `out_len`. The frame is freed
/// even when decoding fails.
///
/// # Safety
/// `frame` must be a caller-owned object frame; `out_data` and `out_len`
/// must be writable.
#[no_mangle]
pub unsafe extern "C" fn modlink_bytes_decode(
    frame: *mut ModlinkFrame,
    out_data: *mut *mut u8,
    out_len: *mut usize,
) -> ModlinkResult {
    crate::ffi_boundary(ModlinkResult::Internal, || {
        error::clear_error_state();

        // SAFETY: ownership is handed over by the caller.
        let Some(frame) = (unsafe { Frame::from_raw(frame) }) else {
            return error::set_invalid_argument("frame cannot be null");
        };
        if out_data.is_null() || out_len.is_null() {
            // SAFETY: the frame is ours now; its payload goes with it.
            unsafe { free_payload(frame.content()) };
            return error::set_invalid_argument("out_data and out_len cannot be null");
        }

        match decode_object::<Vec<u8>>(frame) {
            Ok(bytes) => {
                let buffer = alloc_payload(&bytes);
                // SAFETY: pointers were checked for null above.
                unsafe {
                    *out_data = buffer.as_ptr().cast();
                    *out_len = bytes.len();
                }
                ModlinkResult::Ok
            }
            Err(err) => error::map_codec_error(&err),
        }
    })
}

/// Release a buffer returned by [`modlink_bytes_decode`]. Null is a no-op.
///
/// # Safety
/// `data` must be null or a buffer returned by `modlink_bytes_decode` that
/// has not been released yet.
#[no_mangle]
pub unsafe extern "C" fn modlink_buffer_free(data: *mut u8) {
    crate::ffi_boundary((), || {
        // SAFETY: guaranteed by the caller.
        unsafe { free_payload(data.cast()) };
    });
}
