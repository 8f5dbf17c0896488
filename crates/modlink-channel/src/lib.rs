//! Shared-mailbox channels between a host and its loaded modules.
//!
//! The host opens an [`Endpoint`] and keeps the sending [`OutputChannel`];
//! the module receives the endpoint address through the handshake and
//! installs an [`InputChannel`] on it, registering itself as the owner.
//! Sending a frame is a direct, synchronous call into the module's handler.

pub mod endpoint;
pub mod error;
pub mod input;
pub mod output;
pub mod registry;

use std::panic::AssertUnwindSafe;

pub use endpoint::{Endpoint, EndpointHandler};
pub use error::{ChannelError, Result};
pub use input::{InputChannel, Listener};
pub use output::OutputChannel;
pub use registry::OwnerToken;

fn ffi_boundary<T>(on_panic: T, f: impl FnOnce() -> T) -> T {
    match std::panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => value,
        Err(_) => {
            tracing::error!("panic in channel dispatch; swallowed at the boundary");
            on_panic
        }
    }
}
