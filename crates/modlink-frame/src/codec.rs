use std::collections::HashMap;
use std::ffi::c_void;
use std::ptr;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::trace;

use crate::error::{CodecError, Result};
use crate::frame::{alloc_payload, free_payload, Frame};

/// Payload of a composite message: string keys mapped to independently encoded values.
pub type CompositeMap = HashMap<String, Vec<u8>>;

/// Largest payload the 32-bit `size` field can describe.
pub const MAX_PAYLOAD: usize = i32::MAX as usize;

/// Encode a boolean in the `size` field (`1`/`0`); `content` stays null.
pub fn encode_boolean(value: bool, code: i32) -> Frame {
    Frame::allocate(code, i32::from(value), ptr::null_mut())
}

/// Read a boolean produced by [`encode_boolean`], consuming the frame.
///
/// Frames of any other kind are not rejected; their `size` is simply compared to `1`.
pub fn decode_boolean(frame: Frame) -> bool {
    frame.size() == 1
}

/// Store a bare address in `content`. Used for handshakes.
pub fn encode_pointer(address: *mut c_void, code: i32) -> Frame {
    Frame::allocate(code, 0, address)
}

/// Read back the address stored by [`encode_pointer`].
///
/// Pointer frames never own their content, so the frame is only borrowed.
pub fn decode_pointer(frame: &Frame) -> *mut c_void {
    frame.content()
}

/// Serialize `value` into a C-allocated buffer referenced by a new frame.
pub fn encode_object<T: Serialize + ?Sized>(value: &T, code: i32) -> Result<Frame> {
    let bytes = bincode::serialize(value)?;
    let size = i32::try_from(bytes.len()).map_err(|_| CodecError::PayloadTooLarge {
        size: bytes.len(),
        max: MAX_PAYLOAD,
    })?;

    let content = alloc_payload(&bytes);
    trace!(code, size, "encoded object payload");
    Ok(Frame::allocate(code, size, content.as_ptr()))
}

/// Deserialize the buffer referenced by `frame`.
///
/// Decoding is destructive: the frame and its payload buffer are released,
/// and must not be touched again by anyone.
pub fn decode_object<T: DeserializeOwned>(frame: Frame) -> Result<T> {
    let code = frame.code();
    let content = frame.content();
    if content.is_null() {
        return Err(CodecError::decode(code, "content pointer is null"));
    }
    let _payload = PayloadGuard(content);

    let len = usize::try_from(frame.size())
        .map_err(|_| CodecError::decode(code, format!("negative payload size {}", frame.size())))?;

    // SAFETY: object frames point `content` at a buffer of `size` bytes.
    let bytes = unsafe { std::slice::from_raw_parts(content.cast::<u8>().cast_const(), len) };
    let value = bincode::deserialize(bytes)?;
    trace!(code, size = len, "decoded object payload");
    Ok(value)
}

/// Encode a composite mapping with the structured-value codec.
pub fn encode_composite(map: &CompositeMap, code: i32) -> Result<Frame> {
    encode_object(map, code)
}

/// Decode a composite mapping, releasing the frame and its buffer.
pub fn decode_composite(frame: Frame) -> Result<CompositeMap> {
    decode_object(frame)
}

/// Releases a payload buffer when the decode scope ends, success or not.
struct PayloadGuard(*mut c_void);

impl Drop for PayloadGuard {
    fn drop(&mut self) {
        // SAFETY: only constructed over a non-null object payload owned by the frame being decoded.
        unsafe { free_payload(self.0) };
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Reading {
        sensor: String,
        values: Vec<i64>,
    }

    #[test]
    fn boolean_roundtrip_preserves_code() {
        for value in [true, false] {
            let frame = encode_boolean(value, 17);
            assert_eq!(frame.code(), 17);
            assert!(frame.content().is_null());
            assert_eq!(decode_boolean(frame), value);
        }
    }

    #[test]
    fn pointer_frame_carries_address() {
        let mut target = 5u32;
        let address = (&mut target as *mut u32).cast::<c_void>();

        let frame = encode_pointer(address, 1);
        assert_eq!(frame.size(), 0);
        assert_eq!(decode_pointer(&frame), address);
    }

    #[test]
    fn object_roundtrip() {
        let reading = Reading {
            sensor: "thermo".to_string(),
            values: vec![-3, 0, 12],
        };

        let frame = encode_object(&reading, 300).unwrap();
        assert_eq!(frame.code(), 300);
        assert!(frame.size() > 0);
        assert!(!frame.content().is_null());

        let decoded: Reading = decode_object(frame).unwrap();
        assert_eq!(decoded, reading);
    }

    #[test]
    fn decode_object_without_content_fails() {
        let result = decode_object::<Reading>(Frame::new(300));
        assert!(matches!(result, Err(CodecError::Decode { code: 300, .. })));
    }

    #[test]
    fn decode_object_with_negative_size_fails() {
        let content = alloc_payload(b"xyz");
        let frame = Frame::allocate(9, -4, content.as_ptr());
        let result = decode_object::<String>(frame);
        assert!(matches!(result, Err(CodecError::Decode { code: 9, .. })));
    }

    #[test]
    fn decode_object_with_garbage_fails() {
        let content = alloc_payload(&[0xFF, 0xFF]);
        let frame = Frame::allocate(9, 2, content.as_ptr());
        let result = decode_object::<String>(frame);
        assert!(matches!(result, Err(CodecError::Codec(_))));
    }

    #[test]
    fn composite_roundtrip_keeps_raw_values() {
        let mut map = CompositeMap::new();
        map.insert("a".to_string(), vec![1, 2, 3]);
        map.insert("b".to_string(), Vec::new());

        let frame = encode_composite(&map, 200).unwrap();
        let decoded = decode_composite(frame).unwrap();
        assert_eq!(decoded, map);
    }
}
