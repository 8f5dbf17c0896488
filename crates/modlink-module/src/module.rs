use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use modlink_channel::{ChannelError, Endpoint, InputChannel};
use modlink_frame::Frame;
use tracing::{debug, error, warn};

/// The module side of the protocol.
///
/// Implementations are constructed inside the library's exported handshake
/// (see [`export_module!`](crate::export_module)), then receive every frame
/// the host sends, except the shutdown sentinel, which always tears the
/// module down instead.
pub trait Module: Send + 'static {
    /// Module-specific initialisation, run right after the channel is
    /// installed. The result becomes the handshake's return value.
    fn load(&mut self) -> bool;

    /// Handle one frame from the host and optionally answer it.
    fn handle_message(&mut self, frame: Frame) -> Option<Frame>;

    /// Teardown hook. The channel is disconnected right after it returns.
    fn unload(&mut self) {}
}

/// A module installed on an endpoint, together with its input channel.
///
/// The channel registration keeps the module alive; dropping this value
/// does not unload it.
pub struct Installed<M> {
    channel: InputChannel,
    module: Arc<Mutex<M>>,
}

impl<M: Module> Installed<M> {
    /// Run the module's [`Module::load`] hook.
    pub fn load(&self) -> bool {
        self.module().load()
    }

    pub fn channel(&self) -> &InputChannel {
        &self.channel
    }

    /// Borrow the module mutably.
    pub fn with_module<R>(&self, f: impl FnOnce(&mut M) -> R) -> R {
        f(&mut self.module())
    }

    /// Run the teardown hook and disconnect the channel.
    pub fn unload(&self) {
        self.module().unload();
        self.channel.disconnect();
    }

    fn dispatch(&self, frame: Frame) -> Option<Frame> {
        if frame.is_shutdown() {
            debug!(token = self.channel.token().get(), "shutdown sentinel received");
            self.unload();
            return None;
        }
        self.module().handle_message(frame)
    }

    fn module(&self) -> MutexGuard<'_, M> {
        self.module.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<M> Clone for Installed<M> {
    fn clone(&self) -> Self {
        Self {
            channel: self.channel.clone(),
            module: Arc::clone(&self.module),
        }
    }
}

/// Install an input channel on `endpoint`, build the module with `factory`
/// and route every incoming frame through the module's dispatcher.
///
/// # Safety
/// Same contract as [`Endpoint::install`].
pub unsafe fn install<M, F>(
    endpoint: *mut Endpoint,
    factory: F,
) -> Result<Installed<M>, ChannelError>
where
    M: Module,
    F: FnOnce(&InputChannel) -> M,
{
    // SAFETY: forwarded from the caller.
    let channel = unsafe { Endpoint::install(endpoint) }?;
    let module = Arc::new(Mutex::new(factory(&channel)));
    let installed = Installed { channel, module };

    let dispatcher = installed.clone();
    installed.channel.listen(move |frame| dispatcher.dispatch(frame));

    Ok(installed)
}

/// Body of a module's exported handshake: install, load, report.
///
/// A rejected load disconnects the channel again. Panics are caught here and
/// reported as a rejected handshake.
///
/// # Safety
/// Same contract as [`Endpoint::install`].
pub unsafe fn handshake_entry<M, F>(endpoint: *mut Endpoint, factory: F) -> bool
where
    M: Module,
    F: FnOnce(&InputChannel) -> M,
{
    let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| {
        // SAFETY: forwarded from the caller.
        let installed = match unsafe { install(endpoint, factory) } {
            Ok(installed) => installed,
            Err(err) => {
                warn!(error = %err, "handshake could not install a channel");
                return false;
            }
        };

        if installed.load() {
            debug!(token = installed.channel().token().get(), "module loaded");
            true
        } else {
            debug!("module load hook rejected the handshake");
            installed.channel().disconnect();
            false
        }
    }));

    outcome.unwrap_or_else(|_| {
        error!("panic during module handshake");
        false
    })
}

/// Export a `handshake` symbol that installs the module built by `$factory`.
///
/// `$factory` receives the freshly installed [`InputChannel`] and returns a
/// [`Module`] implementation.
///
/// ```ignore
/// modlink_module::export_module!(|_| EchoModule::default());
/// ```
#[macro_export]
macro_rules! export_module {
    ($factory:expr) => {
        /// Handshake entry point resolved by the host's library loader.
        ///
        /// # Safety
        /// `endpoint` must be null or point to a live endpoint opened by the host.
        #[no_mangle]
        pub unsafe extern "C" fn handshake(endpoint: *mut $crate::channel::Endpoint) -> bool {
            // SAFETY: forwarded from the caller.
            unsafe { $crate::handshake_entry(endpoint, $factory) }
        }
    };
}
