//! Load native modules in-process and talk to them over an ABI-stable frame protocol.
//!
//! # Crate Structure
//!
//! - [`frame`]: the `#[repr(C)]` wire frame, reserved codes and message codecs
//! - [`channel`]: the shared endpoint and its output/input channel views
//! - [`module`]: library loading, the host lifecycle and the module runtime
//!
//! ```ignore
//! use modlink::{frame::CompositeMessage, ModuleHost};
//!
//! let mut host = unsafe { ModuleHost::load("target/debug/libecho_module.so") }?;
//! let request = CompositeMessage::compose_default(|msg| msg.set("greeting", "Hello"))?;
//! let response = host.send(request);
//! host.unload()?;
//! ```

/// Re-export frame types.
pub mod frame {
    pub use modlink_frame::*;
}

/// Re-export channel types.
pub mod channel {
    pub use modlink_channel::*;
}

/// Re-export module lifecycle types.
pub mod module {
    pub use modlink_module::*;
}

pub use modlink_module::{export_module, HostConfig, Module, ModuleHost, ModuleLoadError};
