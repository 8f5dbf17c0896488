use std::fmt;

use modlink_frame::CodecError;
use modlink_module::ModuleLoadError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const LOAD_FAILED: i32 = 3;
pub const HANDSHAKE_REJECTED: i32 = 4;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn load_error(context: &str, err: ModuleLoadError) -> CliError {
    let code = match err {
        ModuleLoadError::LibraryNotFound { .. } | ModuleLoadError::SymbolNotFound { .. } => {
            LOAD_FAILED
        }
        ModuleLoadError::HandshakeRejected { .. } => HANDSHAKE_REJECTED,
        ModuleLoadError::UnloadFailed { .. } => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn codec_error(context: &str, err: CodecError) -> CliError {
    let code = match err {
        CodecError::PayloadTooLarge { .. } | CodecError::Codec(_) => DATA_INVALID,
        CodecError::Decode { .. } | CodecError::FieldNotFound(_) => FAILURE,
    };
    CliError::new(code, format!("{context}: {err}"))
}
