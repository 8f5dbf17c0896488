use std::ffi::c_void;
use std::ptr::NonNull;

use modlink_frame::{decode_pointer, Frame, RawFrame};

use crate::error::{ChannelError, Result};
use crate::input::InputChannel;
use crate::output::OutputChannel;

/// Callback written into an endpoint by the installing side.
///
/// Receives the owner token and a frame (ownership of the frame passes to the
/// callee; null means the peer is going away) and returns an optional
/// response frame owned by the caller.
pub type EndpointHandler =
    unsafe extern "C" fn(owner_token: *mut c_void, frame: *mut RawFrame) -> *mut RawFrame;

/// The shared mailbox between a host and a module.
///
/// Allocated (zeroed) by [`Endpoint::open`], addressed by raw handle from both
/// sides, and released by [`OutputChannel::shutdown`]. Only the input channel
/// whose token is stored in `owner_token` may clear the fields.
#[repr(C)]
#[derive(Debug)]
pub struct Endpoint {
    pub handler: Option<EndpointHandler>,
    pub owner_token: *mut c_void,
}

impl Endpoint {
    /// Allocate a fresh endpoint and return the sending view over it.
    pub fn open() -> OutputChannel {
        OutputChannel::open()
    }

    /// Install an input channel on an endpoint opened elsewhere, taking over
    /// ownership of it.
    ///
    /// Installation always overwrites the handler and owner token; it is only
    /// safe once the previous owner has disconnected (or never existed).
    ///
    /// # Safety
    /// `handle` must be null or point to a live `Endpoint` that stays
    /// allocated until the returned channel has disconnected.
    ///
    /// The endpoint's fields are plain memory shared with the sender. The
    /// caller must ensure that `install`, [`InputChannel::disconnect`] (on
    /// any clone of the returned channel) and every send through the
    /// endpoint never run concurrently on different threads. Calling
    /// `disconnect` from inside the listener is fine: it runs on the
    /// sender's thread, within the send.
    pub unsafe fn install(handle: *mut Endpoint) -> Result<InputChannel> {
        let handle = NonNull::new(handle).ok_or(ChannelError::NullEndpoint)?;
        Ok(InputChannel::install(handle))
    }

    /// Install an input channel from a handshake frame produced by
    /// [`OutputChannel::handshake_frame`].
    ///
    /// # Safety
    /// Same contract as [`Endpoint::install`] for the address carried by the frame.
    pub unsafe fn install_from_handshake(frame: Frame) -> Result<InputChannel> {
        let code = frame.code();
        let address = decode_pointer(&frame).cast::<Endpoint>();
        drop(frame);

        match NonNull::new(address) {
            Some(handle) if address.is_aligned() => Ok(InputChannel::install(handle)),
            _ => Err(ChannelError::InvalidHandshake { code }),
        }
    }

    /// Both a handler and an owner are present.
    pub fn is_connected(&self) -> bool {
        self.handler.is_some() && !self.owner_token.is_null()
    }
}

#[cfg(test)]
mod tests {
    use std::mem;
    use std::ptr;

    use modlink_frame::{encode_pointer, PING};

    use super::*;

    #[test]
    fn endpoint_is_two_pointers_wide() {
        assert_eq!(mem::size_of::<Endpoint>(), 2 * mem::size_of::<*mut c_void>());
        assert_eq!(mem::offset_of!(Endpoint, owner_token), mem::size_of::<usize>());
    }

    #[test]
    fn install_rejects_null_handle() {
        // SAFETY: null is explicitly rejected.
        let result = unsafe { Endpoint::install(ptr::null_mut()) };
        assert!(matches!(result, Err(ChannelError::NullEndpoint)));
    }

    #[test]
    fn install_from_handshake_rejects_null_content() {
        let frame = encode_pointer(ptr::null_mut(), PING);
        // SAFETY: the frame carries no address, so nothing is dereferenced.
        let result = unsafe { Endpoint::install_from_handshake(frame) };
        assert!(matches!(
            result,
            Err(ChannelError::InvalidHandshake { code: PING })
        ));
    }

    #[test]
    fn install_from_handshake_connects_endpoint() {
        let mut output = Endpoint::open();
        assert!(!output.is_connected());

        // SAFETY: `output` keeps the endpoint alive for the duration of the test.
        let input = unsafe { Endpoint::install_from_handshake(output.handshake_frame()) }
            .expect("handshake should install");
        assert!(output.is_connected());
        assert_eq!(input.handle(), output.handle());

        input.disconnect();
        assert!(!output.is_connected());
        output.shutdown();
    }
}
