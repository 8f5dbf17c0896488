//! Module lifecycle on both sides of the boundary.
//!
//! Host side: [`ModuleHost`] opens a shared library through a
//! [`LibraryLoader`], resolves its `handshake` export and hands it a freshly
//! opened endpoint. Module side: [`Module`] plus [`export_module!`] generate
//! that export, install an input channel and route frames to the module.
//!
//! ```ignore
//! use modlink_module::{Module, frame::Frame};
//!
//! struct Echo;
//!
//! impl Module for Echo {
//!     fn load(&mut self) -> bool { true }
//!     fn handle_message(&mut self, frame: Frame) -> Option<Frame> { Some(frame) }
//! }
//!
//! modlink_module::export_module!(|_| Echo);
//! ```

pub mod error;
pub mod host;
pub mod loader;
pub mod module;

pub use modlink_channel as channel;
pub use modlink_frame as frame;

pub use error::{ModuleLoadError, Result};
pub use host::{display_name, HostConfig, ModuleHost};
pub use loader::{BoxError, HandshakeFn, LibraryLoader, NativeLoader, HANDSHAKE_SYMBOL};
pub use module::{handshake_entry, install, Installed, Module};
