use std::ffi::c_void;

use modlink_channel::OutputChannel;

/// Status returned by every fallible export.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModlinkResult {
    Ok = 0,
    InvalidArgument = 1,
    /// The output channel has been shut down.
    Closed = 2,
    CodecError = 3,
    Internal = 99,
}

pub const MODLINK_CODE_SHUTDOWN: i32 = modlink_frame::SHUTDOWN;
pub const MODLINK_CODE_PING: i32 = modlink_frame::PING;
pub const MODLINK_CODE_COMPOSITE: i32 = modlink_frame::COMPOSITE;

/// Wire frame as seen from C: `{ int32_t code; int32_t size; void *content; }`.
pub type ModlinkFrame = modlink_frame::RawFrame;
/// Endpoint as seen from C: `{ handler; void *owner_token; }`.
pub type ModlinkEndpoint = modlink_channel::Endpoint;
pub type ModlinkOutputHandle = *mut c_void;

pub(crate) struct OutputHandle {
    pub(crate) channel: OutputChannel,
}
