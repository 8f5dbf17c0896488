use std::path::{Path, PathBuf};

use modlink_channel::{Endpoint, OutputChannel};
use modlink_frame::{CodecError, Frame, Message, SHUTDOWN};
use tracing::{debug, warn};

use crate::error::{ModuleLoadError, Result};
use crate::loader::{LibraryLoader, NativeLoader, HANDSHAKE_SYMBOL};

/// Host-side loading options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostConfig {
    /// Exported symbol called to hand the endpoint to the module.
    pub handshake_symbol: String,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            handshake_symbol: HANDSHAKE_SYMBOL.to_owned(),
        }
    }
}

impl HostConfig {
    pub fn with_handshake_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.handshake_symbol = symbol.into();
        self
    }
}

/// One loaded module library and the output channel connected to it.
///
/// Lifecycle: [`load`](Self::load) opens the library, resolves and calls its
/// handshake; [`unload`](Self::unload) sends the shutdown sentinel, releases
/// the endpoint and closes the library. A host dropped without `unload` runs
/// the same teardown and logs any failure.
pub struct ModuleHost<L: LibraryLoader = NativeLoader> {
    name: String,
    path: PathBuf,
    channel: OutputChannel,
    library: Option<L::Library>,
    loader: L,
}

impl ModuleHost<NativeLoader> {
    /// Load the module at `path` with the platform loader and default options.
    ///
    /// # Safety
    /// Loading runs the library's initialisation code and calls its handshake
    /// export, which must have the [`HandshakeFn`](crate::HandshakeFn) signature.
    pub unsafe fn load(path: impl AsRef<Path>) -> Result<Self> {
        // SAFETY: forwarded from the caller.
        unsafe { Self::load_with_config(NativeLoader, path, &HostConfig::default()) }
    }
}

impl<L: LibraryLoader> ModuleHost<L> {
    /// Load the module at `path` through `loader`.
    ///
    /// # Safety
    /// See [`ModuleHost::load`].
    pub unsafe fn load_with_config(
        loader: L,
        path: impl AsRef<Path>,
        config: &HostConfig,
    ) -> Result<Self> {
        // SAFETY: forwarded from the caller.
        unsafe { Self::load_with(loader, path, config, |host| host) }
    }

    /// Load the module at `path`, then wrap the connected host with `factory`.
    ///
    /// Failures are reported in the order they are detected: the library
    /// cannot be opened, the handshake symbol is missing, the handshake
    /// returned false. Every failure after opening closes the library again.
    ///
    /// # Safety
    /// See [`ModuleHost::load`].
    pub unsafe fn load_with<T, F>(
        loader: L,
        path: impl AsRef<Path>,
        config: &HostConfig,
        factory: F,
    ) -> Result<T>
    where
        F: FnOnce(Self) -> T,
    {
        let path = path.as_ref();

        // SAFETY: forwarded from the caller.
        let library =
            unsafe { loader.open(path) }.map_err(|source| ModuleLoadError::LibraryNotFound {
                path: path.to_path_buf(),
                source,
            })?;

        // SAFETY: the caller vouches for the export's signature.
        let resolved = unsafe { loader.resolve_handshake(&library, &config.handshake_symbol) };
        let Some(handshake) = resolved else {
            close_quietly(&loader, library, path);
            return Err(ModuleLoadError::SymbolNotFound {
                path: path.to_path_buf(),
                symbol: config.handshake_symbol.clone(),
            });
        };

        let mut channel = Endpoint::open();
        // SAFETY: the endpoint stays allocated until `channel` shuts down.
        let accepted = unsafe { handshake(channel.handle()) };
        if !accepted {
            channel.shutdown();
            close_quietly(&loader, library, path);
            return Err(ModuleLoadError::HandshakeRejected {
                path: path.to_path_buf(),
            });
        }

        let name = display_name(path);
        debug!(module = %name, path = %path.display(), "module loaded");

        Ok(factory(Self {
            name,
            path: path.to_path_buf(),
            channel,
            library: Some(library),
            loader,
        }))
    }

    /// Library file name without directory or extension.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn channel(&self) -> &OutputChannel {
        &self.channel
    }

    /// Whether the module still owns the endpoint.
    pub fn is_connected(&self) -> bool {
        self.channel.is_connected()
    }

    /// Send a frame to the module and return its response.
    pub fn send(&mut self, frame: Frame) -> Option<Frame> {
        self.channel.send(frame)
    }

    /// Encode `message` and send it to the module.
    pub fn send_message<M: Message>(
        &mut self,
        message: &M,
    ) -> std::result::Result<Option<Frame>, CodecError> {
        self.channel.send_message(message)
    }

    /// Send a liveness ping.
    pub fn ping(&mut self) -> Option<Frame> {
        self.channel.send_ping()
    }

    /// Send the shutdown sentinel, release the endpoint and close the library.
    pub fn unload(mut self) -> Result<()> {
        self.teardown()
    }

    fn teardown(&mut self) -> Result<()> {
        let Some(library) = self.library.take() else {
            return Ok(());
        };

        // Nothing useful can come back from a module told to terminate.
        drop(self.channel.send(Frame::new(SHUTDOWN)));
        self.channel.shutdown();

        self.loader.close(library).map_err(|source| ModuleLoadError::UnloadFailed {
            name: self.name.clone(),
            source,
        })?;
        debug!(module = %self.name, "module unloaded");
        Ok(())
    }
}

impl<L: LibraryLoader> Drop for ModuleHost<L> {
    fn drop(&mut self) {
        if let Err(err) = self.teardown() {
            warn!(module = %self.name, error = %err, "module teardown on drop failed");
        }
    }
}

impl<L: LibraryLoader> std::fmt::Debug for ModuleHost<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleHost")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("channel", &self.channel)
            .field("loaded", &self.library.is_some())
            .finish()
    }
}

fn close_quietly<L: LibraryLoader>(loader: &L, library: L::Library, path: &Path) {
    if let Err(err) = loader.close(library) {
        warn!(path = %path.display(), error = %err, "failed to close library after load failure");
    }
}

/// Module name derived from a library path: the final path segment (either
/// separator style) with its last extension removed.
///
/// ```
/// use modlink_module::display_name;
/// use std::path::Path;
///
/// assert_eq!(display_name(Path::new("/opt/mods/libecho.so")), "libecho");
/// assert_eq!(display_name(Path::new(r"C:\mods\echo.dll")), "echo");
/// ```
pub fn display_name(path: &Path) -> String {
    let text = path.to_string_lossy();
    let file = text.rsplit(['/', '\\']).next().unwrap_or_default();
    match file.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem.to_owned(),
        _ => file.to_owned(),
    }
}
