use std::path::Path;

use modlink_channel::Endpoint;

/// Signature every module exports under [`HANDSHAKE_SYMBOL`].
pub type HandshakeFn = unsafe extern "C" fn(endpoint: *mut Endpoint) -> bool;

/// Name of the exported handshake function.
pub const HANDSHAKE_SYMBOL: &str = "handshake";

/// Boxed error returned by loader implementations.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Opens shared libraries, resolves their handshake and closes them again.
///
/// [`NativeLoader`] talks to the operating system; tests substitute their own.
pub trait LibraryLoader {
    /// An open library. Dropping it may or may not unload it; hosts always
    /// go through [`close`](Self::close).
    type Library;

    /// Open the library at `path`.
    ///
    /// # Safety
    /// Opening a library runs its initialisation code in this process.
    unsafe fn open(&self, path: &Path) -> Result<Self::Library, BoxError>;

    /// Resolve `symbol` as a handshake function, or `None` if it is not exported.
    ///
    /// # Safety
    /// The caller asserts that the exported symbol has the [`HandshakeFn`] signature.
    unsafe fn resolve_handshake(&self, library: &Self::Library, symbol: &str)
        -> Option<HandshakeFn>;

    /// Unload the library.
    fn close(&self, library: Self::Library) -> Result<(), BoxError>;
}

/// [`LibraryLoader`] backed by the platform's dynamic linker (`dlopen`/`LoadLibrary`).
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeLoader;

impl LibraryLoader for NativeLoader {
    type Library = libloading::Library;

    unsafe fn open(&self, path: &Path) -> Result<Self::Library, BoxError> {
        // SAFETY: forwarded from the caller.
        let library = unsafe { libloading::Library::new(path) }?;
        Ok(library)
    }

    unsafe fn resolve_handshake(
        &self,
        library: &Self::Library,
        symbol: &str,
    ) -> Option<HandshakeFn> {
        // SAFETY: the caller vouches for the symbol's signature.
        let symbol = unsafe { library.get::<HandshakeFn>(symbol.as_bytes()) }.ok()?;
        Some(*symbol)
    }

    fn close(&self, library: Self::Library) -> Result<(), BoxError> {
        library.close()?;
        Ok(())
    }
}
