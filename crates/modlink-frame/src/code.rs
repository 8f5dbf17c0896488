//! Reserved message codes.
//!
//! Every other code is application-defined.

/// Terminate the receiving module. Always bypasses the module's message handler.
pub const SHUTDOWN: i32 = -1;

/// Liveness probe.
pub const PING: i32 = 1;

/// Default tag for composite (key/value) messages.
pub const COMPOSITE: i32 = 200;

/// Returns a human-readable name for a message code.
pub fn code_name(code: i32) -> &'static str {
    match code {
        SHUTDOWN => "SHUTDOWN",
        PING => "PING",
        COMPOSITE => "COMPOSITE",
        _ => "USER",
    }
}

/// Returns true if the code has a meaning fixed by the protocol.
pub fn is_reserved(code: i32) -> bool {
    matches!(code, SHUTDOWN | PING | COMPOSITE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_codes_have_names() {
        assert_eq!(code_name(SHUTDOWN), "SHUTDOWN");
        assert_eq!(code_name(PING), "PING");
        assert_eq!(code_name(COMPOSITE), "COMPOSITE");
        assert_eq!(code_name(42), "USER");
    }

    #[test]
    fn user_codes_are_not_reserved() {
        assert!(is_reserved(-1));
        assert!(!is_reserved(0));
        assert!(!is_reserved(-2));
        assert!(!is_reserved(201));
    }
}
