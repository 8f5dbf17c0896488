use std::ffi::c_void;

use crate::codec::{decode_boolean, decode_pointer, encode_boolean, encode_pointer};
use crate::error::Result;
use crate::frame::Frame;

/// A typed view over a [`Frame`].
///
/// `encode` produces a frame owned by the caller; `decode` consumes one,
/// releasing whatever payload memory the message kind owns.
pub trait Message: Sized {
    /// The message-type tag carried in the frame.
    fn code(&self) -> i32;

    /// Encode this message into a new frame.
    fn encode(&self) -> Result<Frame>;

    /// Decode a frame into this message kind, consuming it.
    fn decode(frame: Frame) -> Result<Self>;
}

/// A message whose value lives in the frame's `size` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BooleanMessage {
    pub code: i32,
    pub value: bool,
}

impl BooleanMessage {
    pub fn new(value: bool, code: i32) -> Self {
        Self { code, value }
    }
}

impl Message for BooleanMessage {
    fn code(&self) -> i32 {
        self.code
    }

    fn encode(&self) -> Result<Frame> {
        Ok(encode_boolean(self.value, self.code))
    }

    fn decode(frame: Frame) -> Result<Self> {
        let code = frame.code();
        Ok(Self {
            code,
            value: decode_boolean(frame),
        })
    }
}

/// A message carrying a bare address. The address is never owned by the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointerMessage {
    pub code: i32,
    pub address: *mut c_void,
}

impl PointerMessage {
    pub fn new(address: *mut c_void, code: i32) -> Self {
        Self { code, address }
    }

    pub fn is_null(&self) -> bool {
        self.address.is_null()
    }
}

impl Message for PointerMessage {
    fn code(&self) -> i32 {
        self.code
    }

    fn encode(&self) -> Result<Frame> {
        Ok(encode_pointer(self.address, self.code))
    }

    fn decode(frame: Frame) -> Result<Self> {
        Ok(Self {
            code: frame.code(),
            address: decode_pointer(&frame),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boolean_message_decodes_code_and_value() {
        let frame = BooleanMessage::new(true, 12).encode().unwrap();
        let message: BooleanMessage = frame.decode_as().unwrap();
        assert_eq!(message, BooleanMessage::new(true, 12));
    }

    #[test]
    fn pointer_message_roundtrip() {
        let mut slot = 0u64;
        let address = (&mut slot as *mut u64).cast::<c_void>();

        let frame = PointerMessage::new(address, 1).encode().unwrap();
        let message = PointerMessage::decode(frame).unwrap();
        assert_eq!(message.address, address);
        assert_eq!(message.code(), 1);
        assert!(!message.is_null());
    }
}
