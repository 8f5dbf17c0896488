/// Errors that can occur while encoding or decoding frame payloads.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The frame does not carry a payload that can be decoded.
    #[error("unable to decode frame (code {code}): {reason}")]
    Decode { code: i32, reason: String },

    /// A strict composite accessor was used on a key that is not present.
    #[error("field {0} not found in message")]
    FieldNotFound(String),

    /// The payload exceeds what the 32-bit `size` field can describe.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The structured-value codec rejected a value.
    #[error("codec error: {0}")]
    Codec(#[from] bincode::Error),
}

impl CodecError {
    pub(crate) fn decode(code: i32, reason: impl Into<String>) -> Self {
        Self::Decode {
            code,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CodecError>;
