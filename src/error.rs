//! Error types for the proxy engine.
//!
//! Everything that can stop a proxy operation is a [`ProxyError`]. Only
//! [`ProxyError::Transport`] can happen after network activity has started;
//! every other variant is raised before the outbound connection is opened.

use thiserror::Error;

/// Failure of a single proxy operation.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// Target URL is blank, unparsable, or not http/https.
    #[error("invalid target '{target}': {reason}")]
    InvalidTarget { target: String, reason: String },

    /// Inbound method is not one of GET, POST, PUT, DELETE.
    #[error("unsupported method: {0}")]
    UnsupportedMethod(String),

    /// A header name or value carries CR or LF.
    #[error("invalid characters found (CR/LF) in header '{name}'")]
    HeaderInjection { name: String },

    /// A header cannot be represented on the wire for another reason.
    #[error("header '{name}' cannot be forwarded: {reason}")]
    InvalidHeader { name: String, reason: String },

    /// Network failure while talking to the upstream or relaying its body.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl ProxyError {
    /// Short label used for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ProxyError::InvalidTarget { .. } => "invalid_target",
            ProxyError::UnsupportedMethod(_) => "unsupported_method",
            ProxyError::HeaderInjection { .. } => "header_injection",
            ProxyError::InvalidHeader { .. } => "invalid_header",
            ProxyError::Transport(_) => "transport",
        }
    }

    /// True when the failure happened before anything was sent upstream.
    pub fn is_pre_flight(&self) -> bool {
        !matches!(self, ProxyError::Transport(_))
    }
}

/// Network-level failure.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connect, DNS, TLS, timeout or protocol failure from the HTTP client.
    #[error("upstream request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Read or write failure while streaming a body.
    #[error("body stream failed: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for ProxyError {
    fn from(e: reqwest::Error) -> Self {
        ProxyError::Transport(TransportError::Http(e))
    }
}

impl From<std::io::Error> for ProxyError {
    fn from(e: std::io::Error) -> Self {
        ProxyError::Transport(TransportError::Io(e))
    }
}
