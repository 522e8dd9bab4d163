//! Header injection checks (CWE-113, HTTP response splitting).

use crate::error::ProxyError;

/// Validates a header before it is attached to an outbound request.
///
/// Every copied and every forwarded header passes through the guard. A
/// rejection aborts the build; nothing reaches the wire.
pub trait HeaderGuard: Send + Sync {
    fn check(&self, name: &str, value: &str) -> Result<(), ProxyError>;
}

/// Rejects CR or LF anywhere in the name or the value.
#[derive(Debug, Clone, Copy, Default)]
pub struct CrLfGuard;

impl HeaderGuard for CrLfGuard {
    fn check(&self, name: &str, value: &str) -> Result<(), ProxyError> {
        if contains_new_line(name) || contains_new_line(value) {
            tracing::warn!(header = %name.escape_debug(), "Rejected header carrying CR/LF");
            return Err(ProxyError::HeaderInjection {
                name: name.escape_debug().to_string(),
            });
        }
        Ok(())
    }
}

fn contains_new_line(s: &str) -> bool {
    s.bytes().any(|b| b == b'\r' || b == b'\n')
}
