use std::ffi::c_void;
use std::ptr;

use modlink_frame::{decode_boolean, encode_boolean, free_payload, Frame};

use crate::error;
use crate::types::{ModlinkFrame, ModlinkResult};

/// Allocate a frame with the shared allocator.
///
/// Ownership of `content` (if any) is not interpreted; it travels with the frame.
#[no_mangle]
pub extern "C" fn modlink_frame_alloc(
    code: i32,
    size: i32,
    content: *mut c_void,
) -> *mut ModlinkFrame {
    crate::ffi_boundary(ptr::null_mut(), || {
        error::clear_error_state();
        Frame::allocate(code, size, content).into_raw()
    })
}

/// Free a frame struct. The payload it points at is left alone.
///
/// # Safety
/// `frame` must be null or a frame allocated by this library (or any unit
/// sharing the C allocator) that the caller owns.
#[no_mangle]
pub unsafe extern "C" fn modlink_frame_free(frame: *mut ModlinkFrame) {
    crate::ffi_boundary((), || {
        // SAFETY: ownership is handed over by the caller.
        drop(unsafe { Frame::from_raw(frame) });
    });
}

/// Free the payload buffer of `frame` and reset `content`/`size`.
///
/// # Safety
/// `frame` must point to a frame owned by the caller whose `content` is null
/// or a buffer allocated with the C allocator.
#[no_mangle]
pub unsafe extern "C" fn modlink_frame_free_payload(frame: *mut ModlinkFrame) -> ModlinkResult {
    crate::ffi_boundary(ModlinkResult::Internal, || {
        error::clear_error_state();

        if frame.is_null() {
            return error::set_invalid_argument("frame cannot be null");
        }

        let frame_ref = {
            // SAFETY: pointer validity is guaranteed by the caller.
            unsafe { &mut *frame }
        };

        // SAFETY: the caller guarantees the buffer came from the C allocator.
        unsafe { free_payload(frame_ref.content) };
        frame_ref.content = ptr::null_mut();
        frame_ref.size = 0;
        ModlinkResult::Ok
    })
}

/// Encode a boolean frame (`size` = 1 or 0, no payload).
#[no_mangle]
pub extern "C" fn modlink_bool_encode(value: bool, code: i32) -> *mut ModlinkFrame {
    crate::ffi_boundary(ptr::null_mut(), || {
        error::clear_error_state();
        encode_boolean(value, code).into_raw()
    })
}

/// Decode a boolean frame, consuming it.
///
/// The frame is freed even when `out_value` is rejected.
///
/// # Safety
/// `frame` must be a caller-owned frame; `out_value` must be writable.
#[no_mangle]
pub unsafe extern "C" fn modlink_bool_decode(
    frame: *mut ModlinkFrame,
    out_value: *mut bool,
) -> ModlinkResult {
    crate::ffi_boundary(ModlinkResult::Internal, || {
        error::clear_error_state();

        // SAFETY: ownership is handed over by the caller.
        let Some(frame) = (unsafe { Frame::from_raw(frame) }) else {
            return error::set_invalid_argument("frame cannot be null");
        };
        if out_value.is_null() {
            return error::set_invalid_argument("out_value cannot be null");
        }

        let value = decode_boolean(frame);
        // SAFETY: pointer was checked for null above.
        unsafe {
            *out_value = value;
        }
        ModlinkResult::Ok
    })
}

#[cfg(test)]
mod tests {
    use modlink_frame::alloc_payload;

    use super::*;

    #[test]
    fn bool_round_trip_through_exports() {
        for value in [true, false] {
            let frame = modlink_bool_encode(value, 12);
            assert!(!frame.is_null());
            // SAFETY: freshly allocated above.
            let code = unsafe { (*frame).code };
            assert_eq!(code, 12);

            let mut decoded = !value;
            // SAFETY: ownership of `frame` moves into the call.
            let result = unsafe { modlink_bool_decode(frame, &mut decoded) };
            assert_eq!(result, ModlinkResult::Ok);
            assert_eq!(decoded, value);
        }
    }

    #[test]
    fn bool_decode_rejects_null_out_pointer() {
        let frame = modlink_bool_encode(true, 1);
        // SAFETY: the frame is consumed even on error.
        let result = unsafe { modlink_bool_decode(frame, ptr::null_mut()) };
        assert_eq!(result, ModlinkResult::InvalidArgument);
    }

    #[test]
    fn bool_decode_rejects_null_frame() {
        let mut value = false;
        // SAFETY: null is rejected before anything is read.
        let result = unsafe { modlink_bool_decode(ptr::null_mut(), &mut value) };
        assert_eq!(result, ModlinkResult::InvalidArgument);
    }

    #[test]
    fn payload_can_be_freed_before_frame() {
        let payload = alloc_payload(b"abcd");
        let frame = modlink_frame_alloc(7, 4, payload.as_ptr());

        // SAFETY: the payload came from the C allocator.
        assert_eq!(unsafe { modlink_frame_free_payload(frame) }, ModlinkResult::Ok);
        // SAFETY: still a valid frame, now without payload.
        unsafe {
            assert!((*frame).content.is_null());
            assert_eq!((*frame).size, 0);
            modlink_frame_free(frame);
        }
    }

    #[test]
    fn frame_free_accepts_null() {
        // SAFETY: null is a documented no-op.
        unsafe { modlink_frame_free(ptr::null_mut()) };
        // SAFETY: null is rejected.
        assert_eq!(
            unsafe { modlink_frame_free_payload(ptr::null_mut()) },
            ModlinkResult::InvalidArgument
        );
    }
}
