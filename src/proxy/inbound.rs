//! The host side of a proxy operation.
//!
//! The engine never sees the server that accepted the request. It reads the
//! inbound request through [`InboundRequest`] and writes the result through
//! [`InboundResponse`]. The HTTP server in [`crate::http`] provides one pair of
//! implementations; tests provide their own.

use axum::http::{HeaderName, HeaderValue, StatusCode};
use tokio::io::{AsyncRead, AsyncWrite};

/// Request attribute naming the upstream proxy (`host` or `host:port`).
pub const USE_PROXY_ATTRIBUTE: &str = "use-proxy";

/// Body stream handed over by the host. Read at most once.
pub type BodyReader = Box<dyn AsyncRead + Send + Unpin>;

/// Read-only view of the request the host received.
pub trait InboundRequest: Send {
    /// Request method as sent by the client.
    fn method(&self) -> &str;

    /// Every header name, in arrival order, without duplicates.
    fn header_names(&self) -> Vec<String>;

    /// Every value of the named header (case-insensitive lookup).
    fn header_values(&self, name: &str) -> Vec<String>;

    /// Takes the body stream. Later calls return `None`.
    fn take_body(&mut self) -> Option<BodyReader>;

    /// Declared body length, if the client sent one. Must not depend on
    /// whether the body was already taken.
    fn content_length(&self) -> Option<u64>;

    /// Declared content type, if the client sent one.
    fn content_type(&self) -> Option<String>;

    /// Named request-scoped attribute set by the host or a rewrite rule.
    fn attribute(&self, name: &str) -> Option<String>;

    fn remote_addr(&self) -> String;

    fn remote_host(&self) -> String;

    fn remote_port(&self) -> u16;

    fn scheme(&self) -> String;

    fn server_name(&self) -> String;

    fn server_port(&self) -> u16;

    /// Path prefix the host mounted this application under ("" for root).
    fn context_path(&self) -> String;
}

/// Write-only view of the response the host will send back.
pub trait InboundResponse: Send {
    /// Adds a header value; repeated calls with one name keep every value.
    fn add_header(&mut self, name: &HeaderName, value: &HeaderValue);

    fn set_status(&mut self, status: StatusCode);

    /// Body sink owned by the host. The engine writes and flushes but never
    /// shuts it down.
    fn output(&mut self) -> &mut (dyn AsyncWrite + Send + Unpin);
}
