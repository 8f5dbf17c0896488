//! modlink-ffi: C-ABI exports for modlink frames and output channels.
//!
//! Lets hosts and modules written in C share frames with Rust code (all
//! frame memory goes through the C allocator), exchange byte payloads in the
//! object encoding and drive an output channel from the host side. Errors
//! are reported per thread through [`modlink_last_error`].

mod error;
mod frame;
mod object;
mod output;
mod types;

use std::panic::AssertUnwindSafe;

pub use frame::{
    modlink_bool_decode, modlink_bool_encode, modlink_frame_alloc, modlink_frame_free,
    modlink_frame_free_payload,
};
pub use object::{modlink_buffer_free, modlink_bytes_decode, modlink_bytes_encode};
pub use output::{
    modlink_output_connected, modlink_output_endpoint, modlink_output_free, modlink_output_open,
    modlink_output_ping, modlink_output_send, modlink_output_shutdown,
};
pub use types::{
    ModlinkEndpoint, ModlinkFrame, ModlinkOutputHandle, ModlinkResult, MODLINK_CODE_COMPOSITE,
    MODLINK_CODE_PING, MODLINK_CODE_SHUTDOWN,
};

fn ffi_boundary<T>(on_panic: T, f: impl FnOnce() -> T) -> T {
    match std::panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => value,
        Err(_) => {
            error::set_panic_error();
            on_panic
        }
    }
}

#[no_mangle]
pub extern "C" fn modlink_init() -> ModlinkResult {
    ffi_boundary(ModlinkResult::Internal, || {
        error::clear_error_state();
        ModlinkResult::Ok
    })
}

#[no_mangle]
pub extern "C" fn modlink_cleanup() {
    ffi_boundary((), error::clear_error_state);
}

/// Message describing the last failure on the calling thread, or an empty
/// string. Valid until the next modlink call on the same thread.
#[no_mangle]
pub extern "C" fn modlink_last_error() -> *const std::os::raw::c_char {
    ffi_boundary(std::ptr::null(), error::last_error_ptr)
}

#[cfg(test)]
mod tests {
    use std::ffi::CStr;
    use std::ptr;

    use super::*;

    fn last_error() -> String {
        let ptr = modlink_last_error();
        assert!(!ptr.is_null());
        // SAFETY: modlink_last_error returns a pointer to a thread-local CString.
        unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned()
    }

    #[test]
    fn init_and_cleanup_are_ok() {
        assert_eq!(modlink_init(), ModlinkResult::Ok);
        modlink_cleanup();
        assert!(last_error().is_empty());
    }

    #[test]
    fn failures_populate_last_error() {
        let mut value = false;
        // SAFETY: null is rejected before anything is read.
        let result = unsafe { modlink_bool_decode(ptr::null_mut(), &mut value) };
        assert_eq!(result, ModlinkResult::InvalidArgument);
        assert_eq!(last_error(), "frame cannot be null");

        assert_eq!(modlink_init(), ModlinkResult::Ok);
        assert!(last_error().is_empty());
    }

    #[test]
    fn reserved_codes_match_frame_crate() {
        assert_eq!(MODLINK_CODE_SHUTDOWN, -1);
        assert_eq!(MODLINK_CODE_PING, 1);
        assert_eq!(MODLINK_CODE_COMPOSITE, 200);
    }
}
