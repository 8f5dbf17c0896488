use std::ptr;

use modlink_channel::Endpoint;
use modlink_frame::Frame;

use crate::error;
use crate::types::{
    ModlinkEndpoint, ModlinkFrame, ModlinkOutputHandle, ModlinkResult, OutputHandle,
};

fn with_output_mut<T>(
    handle: ModlinkOutputHandle,
    on_error: T,
    f: impl FnOnce(&mut OutputHandle) -> T,
) -> T {
    if handle.is_null() {
        let _ = error::set_invalid_argument("output handle cannot be null");
        return on_error;
    }

    let output = {
        // SAFETY: pointer validity is guaranteed by the caller.
        unsafe { &mut *handle.cast::<OutputHandle>() }
    };

    f(output)
}

fn write_response_out(out_response: *mut *mut ModlinkFrame, response: Option<Frame>) {
    let raw = response.map_or(ptr::null_mut(), Frame::into_raw);
    // SAFETY: callers check `out_response` for null before sending.
    unsafe {
        *out_response = raw;
    }
}

/// Open a new endpoint and return the output channel handle driving it.
#[no_mangle]
pub extern "C" fn modlink_output_open() -> ModlinkOutputHandle {
    crate::ffi_boundary(ptr::null_mut(), || {
        error::clear_error_state();
        let handle = OutputHandle {
            channel: Endpoint::open(),
        };
        Box::into_raw(Box::new(handle)).cast()
    })
}

/// Endpoint address to hand to a module's handshake, or null on error.
///
/// # Safety
/// `output` must be a handle returned by `modlink_output_open`.
#[no_mangle]
pub unsafe extern "C" fn modlink_output_endpoint(
    output: ModlinkOutputHandle,
) -> *mut ModlinkEndpoint {
    crate::ffi_boundary(ptr::null_mut(), || {
        error::clear_error_state();

        with_output_mut(output, ptr::null_mut(), |output| {
            if !output.channel.is_open() {
                let _ = error::set_closed("output channel has been shut down");
                return ptr::null_mut();
            }
            output.channel.handle()
        })
    })
}

/// Report whether a module currently owns the endpoint.
///
/// # Safety
/// `output` must be a handle returned by `modlink_output_open`; `out_connected`
/// must be writable.
#[no_mangle]
pub unsafe extern "C" fn modlink_output_connected(
    output: ModlinkOutputHandle,
    out_connected: *mut bool,
) -> ModlinkResult {
    crate::ffi_boundary(ModlinkResult::Internal, || {
        error::clear_error_state();

        if out_connected.is_null() {
            return error::set_invalid_argument("out_connected cannot be null");
        }

        with_output_mut(output, ModlinkResult::InvalidArgument, |output| {
            let connected = output.channel.is_connected();
            // SAFETY: pointer was checked for null above.
            unsafe {
                *out_connected = connected;
            }
            ModlinkResult::Ok
        })
    })
}

/// Send `frame` (ownership moves into the call) and write the module's
/// response, or null, to `out_response`.
///
/// # Safety
/// `output` must be a handle returned by `modlink_output_open`, `frame` a
/// caller-owned frame and `out_response` writable.
#[no_mangle]
pub unsafe extern "C" fn modlink_output_send(
    output: ModlinkOutputHandle,
    frame: *mut ModlinkFrame,
    out_response: *mut *mut ModlinkFrame,
) -> ModlinkResult {
    crate::ffi_boundary(ModlinkResult::Internal, || {
        error::clear_error_state();

        // SAFETY: ownership is handed over by the caller.
        let Some(frame) = (unsafe { Frame::from_raw(frame) }) else {
            return error::set_invalid_argument("frame cannot be null");
        };
        if out_response.is_null() {
            return error::set_invalid_argument("out_response cannot be null");
        }

        with_output_mut(output, ModlinkResult::InvalidArgument, |output| {
            if !output.channel.is_open() {
                return error::set_closed("output channel has been shut down");
            }
            write_response_out(out_response, output.channel.send(frame));
            ModlinkResult::Ok
        })
    })
}

/// Send a ping and write the response, or null, to `out_response`.
///
/// # Safety
/// `output` must be a handle returned by `modlink_output_open`; `out_response`
/// must be writable.
#[no_mangle]
pub unsafe extern "C" fn modlink_output_ping(
    output: ModlinkOutputHandle,
    out_response: *mut *mut ModlinkFrame,
) -> ModlinkResult {
    crate::ffi_boundary(ModlinkResult::Internal, || {
        error::clear_error_state();

        if out_response.is_null() {
            return error::set_invalid_argument("out_response cannot be null");
        }

        with_output_mut(output, ModlinkResult::InvalidArgument, |output| {
            if !output.channel.is_open() {
                return error::set_closed("output channel has been shut down");
            }
            write_response_out(out_response, output.channel.send_ping());
            ModlinkResult::Ok
        })
    })
}

/// Notify the module and release the endpoint. The handle stays valid
/// until `modlink_output_free`; later sends report `Closed`.
///
/// # Safety
/// `output` must be a handle returned by `modlink_output_open`.
#[no_mangle]
pub unsafe extern "C" fn modlink_output_shutdown(output: ModlinkOutputHandle) -> ModlinkResult {
    crate::ffi_boundary(ModlinkResult::Internal, || {
        error::clear_error_state();

        with_output_mut(output, ModlinkResult::InvalidArgument, |output| {
            output.channel.shutdown();
            ModlinkResult::Ok
        })
    })
}

/// Shut the channel down (if still open) and free the handle.
///
/// # Safety
/// `output` must be null or a handle returned by `modlink_output_open`.
#[no_mangle]
pub unsafe extern "C" fn modlink_output_free(output: ModlinkOutputHandle) {
    crate::ffi_boundary((), || {
        if output.is_null() {
            return;
        }

        // SAFETY: caller guarantees this handle was allocated by modlink_output_open.
        unsafe {
            drop(Box::from_raw(output.cast::<OutputHandle>()));
        }
    });
}
