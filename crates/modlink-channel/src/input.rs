use std::ffi::c_void;
use std::ptr::{self, NonNull};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use modlink_frame::{Frame, Message, RawFrame, SHUTDOWN};
use tracing::{debug, trace, warn};

use crate::endpoint::Endpoint;
use crate::registry::{self, OwnerToken};

/// Function receiving frames on an [`InputChannel`] and optionally answering them.
pub type Listener = Box<dyn FnMut(Frame) -> Option<Frame> + Send>;

/// The receiving view over an [`Endpoint`].
///
/// Installing a channel writes its dispatch callback and a fresh owner token
/// into the endpoint. The registration keeps the channel (and its listener)
/// alive until [`disconnect`](Self::disconnect) is called or the sending side
/// shuts down; dropping an `InputChannel` value does not disconnect it.
///
/// Cloning produces another handle to the same registration. Clones may
/// move to other threads (listeners must be `Send`), but disconnecting
/// must not race a send on the same endpoint; see [`Endpoint::install`].
#[derive(Clone)]
pub struct InputChannel {
    inner: Arc<InputInner>,
}

impl InputChannel {
    pub(crate) fn install(endpoint: NonNull<Endpoint>) -> Self {
        let token = registry::next_token();
        let inner = Arc::new(InputInner {
            endpoint,
            token,
            state: Mutex::new(ListenerState::default()),
            disposed: AtomicBool::new(false),
        });
        registry::insert(token, Arc::clone(&inner));

        // SAFETY: the installer guarantees `endpoint` is live.
        unsafe {
            let endpoint = endpoint.as_ptr();
            (*endpoint).handler = Some(dispatch);
            (*endpoint).owner_token = token.as_ptr();
        }

        debug!(token = token.get(), endpoint = ?endpoint, "installed input channel");
        Self { inner }
    }

    /// Raw address of the endpoint this channel was installed on.
    pub fn handle(&self) -> *mut Endpoint {
        self.inner.endpoint.as_ptr()
    }

    pub fn token(&self) -> OwnerToken {
        self.inner.token
    }

    /// Whether this channel has already disconnected.
    pub fn is_disconnected(&self) -> bool {
        self.inner.disposed.load(Ordering::Acquire)
    }

    /// Whether this channel is still the endpoint's registered owner.
    pub fn is_owner(&self) -> bool {
        !self.is_disconnected() && self.inner.owns_endpoint()
    }

    /// Register `responder` as the only listener, replacing any previous one.
    ///
    /// Whatever the responder returns is handed back to the sender.
    pub fn listen<F>(&self, responder: F)
    where
        F: FnMut(Frame) -> Option<Frame> + Send + 'static,
    {
        self.inner.set_listener(Some(Box::new(responder)));
    }

    /// Like [`listen`](Self::listen), but never answers.
    pub fn subscribe<F>(&self, mut callback: F)
    where
        F: FnMut(Frame) + Send + 'static,
    {
        self.listen(move |frame| {
            callback(frame);
            None
        })
    }

    /// Listen with frames decoded as `M` and responses encoded from `R`.
    ///
    /// Frames that fail to decode are dropped with a warning and get no response.
    pub fn listen_as<M, R, F>(&self, mut responder: F)
    where
        M: Message,
        R: Message,
        F: FnMut(M) -> Option<R> + Send + 'static,
    {
        self.listen(move |frame| {
            let message = decode_or_warn::<M>(frame)?;
            let response = responder(message)?;
            match response.encode() {
                Ok(frame) => Some(frame),
                Err(err) => {
                    warn!(code = response.code(), error = %err, "failed to encode response");
                    None
                }
            }
        })
    }

    /// Subscribe with frames decoded as `M`.
    pub fn subscribe_as<M, F>(&self, mut callback: F)
    where
        M: Message,
        F: FnMut(M) + Send + 'static,
    {
        self.listen(move |frame| {
            if let Some(message) = decode_or_warn::<M>(frame) {
                callback(message);
            }
            None
        })
    }

    /// Remove the listener. Ownership of the endpoint is kept, so a new
    /// listener can be registered later.
    pub fn unsubscribe(&self) {
        self.inner.set_listener(None);
    }

    /// Stop listening and release the endpoint if this channel still owns it.
    ///
    /// If another channel has since been installed on the same endpoint, the
    /// endpoint is left untouched and only this channel's registration is
    /// released. Calling this more than once is a no-op.
    pub fn disconnect(&self) {
        self.inner.disconnect();
    }
}

impl std::fmt::Debug for InputChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InputChannel")
            .field("endpoint", &self.inner.endpoint)
            .field("token", &self.inner.token.get())
            .field("disconnected", &self.is_disconnected())
            .finish()
    }
}

#[derive(Default)]
struct ListenerState {
    listener: Option<Listener>,
    /// Bumped on every listener change; lets `deliver` tell whether the
    /// listener it borrowed has been replaced in the meantime.
    epoch: u64,
}

pub(crate) struct InputInner {
    endpoint: NonNull<Endpoint>,
    token: OwnerToken,
    state: Mutex<ListenerState>,
    disposed: AtomicBool,
}

// SAFETY: the endpoint is only written by the owning channel (checked by token),
// and `Endpoint::install` makes callers keep endpoint writes and sends from racing.
unsafe impl Send for InputInner {}
// SAFETY: see above; listener state is behind a mutex.
unsafe impl Sync for InputInner {}

impl InputInner {
    fn state(&self) -> MutexGuard<'_, ListenerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_listener(&self, listener: Option<Listener>) {
        let previous = {
            let mut state = self.state();
            state.epoch = state.epoch.wrapping_add(1);
            std::mem::replace(&mut state.listener, listener)
        };
        drop(previous);
    }

    fn owns_endpoint(&self) -> bool {
        // SAFETY: the endpoint outlives every channel installed on it.
        let endpoint = unsafe { self.endpoint.as_ref() };
        OwnerToken::from_ptr(endpoint.owner_token) == Some(self.token)
    }

    /// Hand `frame` to the listener without holding any lock while it runs,
    /// so the listener may re-register, unsubscribe or disconnect.
    ///
    /// The listener is put back even if it panics; the panic itself is left
    /// to the dispatch boundary.
    fn deliver(&self, frame: Frame) -> Option<Frame> {
        let mut borrowed = {
            let mut state = self.state();
            match state.listener.take() {
                Some(listener) => BorrowedListener {
                    inner: self,
                    listener: Some(listener),
                    epoch: state.epoch,
                },
                None => {
                    trace!(
                        token = self.token.get(),
                        code = frame.code(),
                        "no listener; dropping frame"
                    );
                    return None;
                }
            }
        };

        let response = borrowed.listener.as_mut().and_then(|listener| listener(frame));
        response
    }

    fn disconnect(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }

        if self.owns_endpoint() {
            // SAFETY: we hold the matching owner token, so the fields are ours to clear.
            unsafe {
                let endpoint = self.endpoint.as_ptr();
                (*endpoint).handler = None;
                (*endpoint).owner_token = ptr::null_mut();
            }
            debug!(token = self.token.get(), "input channel released endpoint");
        } else {
            debug!(
                token = self.token.get(),
                "endpoint owned by another channel; leaving it untouched"
            );
        }

        self.set_listener(None);
        drop(registry::remove(self.token));
    }
}

/// A listener taken out of its slot for one delivery.
///
/// Dropping it returns the listener to the slot unless it was replaced or
/// removed in the meantime, in which case the borrowed one is discarded.
struct BorrowedListener<'a> {
    inner: &'a InputInner,
    listener: Option<Listener>,
    epoch: u64,
}

impl Drop for BorrowedListener<'_> {
    fn drop(&mut self) {
        let stale = {
            let mut state = self.inner.state();
            if state.epoch == self.epoch && state.listener.is_none() {
                state.listener = self.listener.take();
                None
            } else {
                self.listener.take()
            }
        };
        drop(stale);
    }
}

fn decode_or_warn<M: Message>(frame: Frame) -> Option<M> {
    let code = frame.code();
    match M::decode(frame) {
        Ok(message) => Some(message),
        Err(err) => {
            warn!(code, error = %err, "failed to decode incoming frame");
            None
        }
    }
}

/// The handler written into every endpoint installed by this unit.
unsafe extern "C" fn dispatch(owner_token: *mut c_void, raw: *mut RawFrame) -> *mut RawFrame {
    crate::ffi_boundary(ptr::null_mut(), || {
        // SAFETY: the sender hands ownership of the frame over with the call.
        let frame = unsafe { Frame::from_raw(raw) };

        let Some(inner) = OwnerToken::from_ptr(owner_token).and_then(registry::lookup) else {
            trace!("dispatch to unknown owner token; dropping frame");
            return ptr::null_mut();
        };

        match frame {
            Some(frame) => {
                trace!(token = inner.token.get(), code = frame.code(), "dispatching frame");
                inner
                    .deliver(frame)
                    .map_or(ptr::null_mut(), Frame::into_raw)
            }
            None => {
                debug!(token = inner.token.get(), "peer is shutting the channel down");
                drop(inner.deliver(Frame::new(SHUTDOWN)));
                inner.disconnect();
                ptr::null_mut()
            }
        }
    })
}
