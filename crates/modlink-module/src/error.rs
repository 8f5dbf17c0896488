use std::path::PathBuf;

use crate::loader::BoxError;

/// Errors raised while loading or unloading a module.
#[derive(Debug, thiserror::Error)]
pub enum ModuleLoadError {
    /// The library loader could not open the path.
    #[error("failed to load module library {path}: {source}")]
    LibraryNotFound {
        path: PathBuf,
        #[source]
        source: BoxError,
    },

    /// The library does not export the handshake function.
    #[error("module library {path} does not export `{symbol}`")]
    SymbolNotFound { path: PathBuf, symbol: String },

    /// The module's handshake returned false.
    #[error("module {path} rejected the handshake")]
    HandshakeRejected { path: PathBuf },

    /// The library loader failed to unload the library.
    #[error("failed to unload module {name}: {source}")]
    UnloadFailed {
        name: String,
        #[source]
        source: BoxError,
    },
}

pub type Result<T> = std::result::Result<T, ModuleLoadError>;
