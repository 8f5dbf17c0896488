use std::alloc::{handle_alloc_error, Layout};
use std::ffi::c_void;
use std::fmt;
use std::mem;
use std::ptr::{self, NonNull};

use crate::code::{code_name, PING, SHUTDOWN};
use crate::error::Result;
use crate::message::Message;

/// The fixed-layout message struct shared by every compiled unit.
///
/// Layout:
/// ```text
/// ┌──────────────┬──────────────┬──────────────────────────┐
/// │ code (i32)   │ size (i32)   │ content (pointer-sized)  │
/// └──────────────┴──────────────┴──────────────────────────┘
/// ```
///
/// How `size` and `content` are interpreted depends on the payload kind:
/// boolean frames keep their value in `size`, pointer frames carry a bare
/// address in `content`, and object frames point `content` at a buffer of
/// `size` bytes.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RawFrame {
    pub code: i32,
    pub size: i32,
    pub content: *mut c_void,
}

/// Owning handle to a heap-allocated [`RawFrame`].
///
/// Frames are allocated with the C allocator so they can be released by
/// whichever side of the boundary ends up consuming them. Dropping a `Frame`
/// releases the struct only; payload buffers are released by the decode
/// function matching the payload kind.
pub struct Frame {
    raw: NonNull<RawFrame>,
}

// SAFETY: a `Frame` is the unique owner of its allocation.
unsafe impl Send for Frame {}

impl Frame {
    /// Allocate a frame with an empty payload.
    pub fn new(code: i32) -> Self {
        Self::allocate(code, 0, ptr::null_mut())
    }

    /// Allocate a frame with the given fields. The caller owns it until it is
    /// consumed by a decode function or sent through a channel.
    pub fn allocate(code: i32, size: i32, content: *mut c_void) -> Self {
        let raw = c_alloc::<RawFrame>();
        // SAFETY: `raw` is a fresh, suitably sized and aligned allocation.
        unsafe { raw.as_ptr().write(RawFrame { code, size, content }) };
        Self { raw }
    }

    pub fn code(&self) -> i32 {
        self.fields().code
    }

    pub fn size(&self) -> i32 {
        self.fields().size
    }

    pub fn content(&self) -> *mut c_void {
        self.fields().content
    }

    /// True for the `-1` termination sentinel.
    pub fn is_shutdown(&self) -> bool {
        self.code() == SHUTDOWN
    }

    pub fn is_ping(&self) -> bool {
        self.code() == PING
    }

    /// Decode this frame as a concrete message kind.
    pub fn decode_as<M: Message>(self) -> Result<M> {
        M::decode(self)
    }

    /// Pointer to the underlying struct, still owned by this frame.
    pub fn as_ptr(&self) -> *const RawFrame {
        self.raw.as_ptr()
    }

    /// Give up ownership, e.g. to hand the frame across the boundary.
    pub fn into_raw(self) -> *mut RawFrame {
        let raw = self.raw.as_ptr();
        mem::forget(self);
        raw
    }

    /// Take ownership of a frame received from the other side.
    ///
    /// Returns `None` for a null pointer.
    ///
    /// # Safety
    /// `raw` must be null or point to a `RawFrame` allocated with the C
    /// allocator that nobody else will free.
    pub unsafe fn from_raw(raw: *mut RawFrame) -> Option<Self> {
        NonNull::new(raw).map(|raw| Self { raw })
    }

    fn fields(&self) -> &RawFrame {
        // SAFETY: `raw` is valid for as long as this frame is alive.
        unsafe { self.raw.as_ref() }
    }
}

impl Drop for Frame {
    fn drop(&mut self) {
        // SAFETY: allocated with `malloc` in `allocate` or handed over via `from_raw`.
        unsafe { libc::free(self.raw.as_ptr().cast()) };
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("code", &self.code())
            .field("kind", &code_name(self.code()))
            .field("size", &self.size())
            .field("content", &self.content())
            .finish()
    }
}

fn c_alloc<T>() -> NonNull<T> {
    // SAFETY: plain allocation; a null result is handled below.
    let raw = unsafe { libc::malloc(mem::size_of::<T>()) }.cast::<T>();
    NonNull::new(raw).unwrap_or_else(|| handle_alloc_error(Layout::new::<T>()))
}

/// Copy `bytes` into a buffer owned by the C allocator.
///
/// Empty payloads still get a (one byte) allocation so that `content` is
/// never null for object frames.
pub fn alloc_payload(bytes: &[u8]) -> NonNull<c_void> {
    let len = bytes.len().max(1);
    // SAFETY: plain allocation; a null result is handled below.
    let raw = unsafe { libc::malloc(len) }.cast::<u8>();
    let Some(buf) = NonNull::new(raw) else {
        handle_alloc_error(Layout::array::<u8>(len).unwrap_or(Layout::new::<u8>()));
    };
    // SAFETY: `buf` has room for at least `bytes.len()` bytes and does not overlap `bytes`.
    unsafe { ptr::copy_nonoverlapping(bytes.as_ptr(), buf.as_ptr(), bytes.len()) };
    buf.cast()
}

/// Release a payload buffer allocated by [`alloc_payload`] (or by C code with `malloc`).
///
/// # Safety
/// `content` must be null or an unreleased C-allocator buffer.
pub unsafe fn free_payload(content: *mut c_void) {
    if !content.is_null() {
        // SAFETY: guaranteed by the caller.
        unsafe { libc::free(content) };
    }
}
