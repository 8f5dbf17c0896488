use std::alloc::{handle_alloc_error, Layout};
use std::ffi::c_void;
use std::mem;
use std::ptr::{self, NonNull};

use modlink_frame::{encode_pointer, CodecError, Frame, Message, PING};
use tracing::{debug, trace};

use crate::endpoint::{Endpoint, EndpointHandler};

/// The sending view over an [`Endpoint`].
///
/// Sends are synchronous: [`send`](Self::send) calls the handler installed in
/// the endpoint on the current thread and returns whatever it returns. There
/// is no queue, no timeout and no cancellation; a handler that never returns
/// blocks the sender.
///
/// Operations take `&mut self`, so the borrow checker serialises Rust
/// callers. The type is `Send` but not `Sync`.
pub struct OutputChannel {
    endpoint: NonNull<Endpoint>,
    open: bool,
}

// SAFETY: the channel owns its endpoint allocation; mutation goes through `&mut self`.
unsafe impl Send for OutputChannel {}

impl OutputChannel {
    pub(crate) fn open() -> Self {
        // SAFETY: plain zeroed allocation; a null result is handled below.
        let raw = unsafe { libc::calloc(1, mem::size_of::<Endpoint>()) }.cast::<Endpoint>();
        let endpoint =
            NonNull::new(raw).unwrap_or_else(|| handle_alloc_error(Layout::new::<Endpoint>()));
        debug!(endpoint = ?raw, "opened output channel");
        Self {
            endpoint,
            open: true,
        }
    }

    /// Raw endpoint address, the value handed to the other side.
    pub fn handle(&self) -> *mut Endpoint {
        self.endpoint.as_ptr()
    }

    /// True until [`shutdown`](Self::shutdown) is called.
    ///
    /// An open channel is not necessarily connected; it only means an input
    /// channel may still be installed on it.
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Whether an input channel currently owns the endpoint.
    pub fn is_connected(&self) -> bool {
        self.open && self.endpoint().is_connected()
    }

    /// A pointer frame carrying this channel's endpoint address.
    pub fn handshake_frame(&self) -> Frame {
        encode_pointer(self.handle().cast::<c_void>(), PING)
    }

    /// Deliver `frame` to the installed handler and return its response.
    ///
    /// Returns `None` without side effects when the channel is closed, and
    /// drops the frame when nobody is installed.
    pub fn send(&mut self, frame: Frame) -> Option<Frame> {
        if !self.open {
            trace!(code = frame.code(), "send on closed channel ignored");
            return None;
        }

        let Some((handler, owner)) = self.installed() else {
            trace!(code = frame.code(), "no handler installed; dropping frame");
            return None;
        };

        trace!(code = frame.code(), size = frame.size(), "sending frame");
        // SAFETY: the handler was installed by the owning side together with `owner`;
        // ownership of the frame moves to the callee.
        let response = unsafe { handler(owner, frame.into_raw()) };
        // SAFETY: handlers return null or a frame allocated for the caller to own.
        unsafe { Frame::from_raw(response) }
    }

    /// Encode `message` and [`send`](Self::send) it.
    pub fn send_message<M: Message>(&mut self, message: &M) -> Result<Option<Frame>, CodecError> {
        let frame = message.encode()?;
        Ok(self.send(frame))
    }

    /// Send an empty [`PING`] frame.
    pub fn send_ping(&mut self) -> Option<Frame> {
        self.send(Frame::new(PING))
    }

    /// Notify the installed handler with a null frame, then release the endpoint.
    ///
    /// The receiving side treats the null frame as the peer going away and
    /// disconnects itself. Every later `send` is a no-op.
    pub fn shutdown(&mut self) {
        if !self.open {
            return;
        }

        if let Some((handler, owner)) = self.installed() {
            // SAFETY: same contract as in `send`; a null frame is the shutdown probe.
            let response = unsafe { handler(owner, ptr::null_mut()) };
            // SAFETY: handlers return null or a caller-owned frame.
            drop(unsafe { Frame::from_raw(response) });
        }

        // SAFETY: allocated with `calloc` in `open` and released exactly once.
        unsafe { libc::free(self.endpoint.as_ptr().cast()) };
        self.open = false;
        debug!(endpoint = ?self.endpoint, "output channel shut down");
    }

    fn endpoint(&self) -> &Endpoint {
        // SAFETY: only called while `open`, i.e. before the endpoint is freed.
        unsafe { self.endpoint.as_ref() }
    }

    fn installed(&self) -> Option<(EndpointHandler, *mut c_void)> {
        let endpoint = self.endpoint();
        endpoint.handler.map(|handler| (handler, endpoint.owner_token))
    }
}

impl Drop for OutputChannel {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for OutputChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputChannel")
            .field("endpoint", &self.endpoint)
            .field("open", &self.open)
            .field("connected", &self.is_connected())
            .finish()
    }
}
