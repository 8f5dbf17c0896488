//! Fixed-layout wire frames and typed message codecs.
//!
//! Every message exchanged between a host and a loaded module is a
//! [`RawFrame`]:
//! - a 4-byte signed message code
//! - a 4-byte signed payload size
//! - a pointer-sized content address
//!
//! On top of the raw frame this crate provides boolean, pointer, object and
//! composite (string-keyed) payload encodings. Decoding a payload consumes
//! the frame that carried it.

pub mod code;
pub mod codec;
pub mod composite;
pub mod error;
pub mod frame;
pub mod message;

pub use code::{code_name, is_reserved, COMPOSITE, PING, SHUTDOWN};
pub use codec::{
    decode_boolean, decode_composite, decode_object, decode_pointer, encode_boolean,
    encode_composite, encode_object, encode_pointer, CompositeMap, MAX_PAYLOAD,
};
pub use composite::CompositeMessage;
pub use error::{CodecError, Result};
pub use frame::{alloc_payload, free_payload, Frame, RawFrame};
pub use message::{BooleanMessage, Message, PointerMessage};
