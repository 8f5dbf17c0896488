use modlink_frame::CodecError;

/// Errors that can occur while installing a channel.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// A null endpoint address was supplied.
    #[error("endpoint handle cannot be null")]
    NullEndpoint,

    /// The handshake frame does not carry a usable endpoint address.
    #[error("handshake frame (code {code}) does not point to a valid endpoint")]
    InvalidHandshake { code: i32 },

    /// Frame-level encoding or decoding error.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
}

pub type Result<T> = std::result::Result<T, ChannelError>;
