//! Inbound request adapter.
//!
//! # Responsibilities
//! - Expose an axum request to the engine as an [`InboundRequest`]
//! - Derive server name/port from config, then Host header, then listener
//! - Hand the body over as a byte stream, once
//! - Refuse header values that are not UTF-8 rather than rewriting them

use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::str::FromStr;

use axum::body::Body;
use axum::http::uri::Authority;
use axum::http::{header, request::Parts, HeaderMap};
use futures_util::TryStreamExt;
use tokio_util::io::StreamReader;

use crate::config::ServerConfig;
use crate::error::ProxyError;
use crate::proxy::{BodyReader, InboundRequest};

/// Header carrying the request id.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Inbound request received by [`crate::http::HttpServer`].
pub struct HttpInbound {
    method: String,
    headers: HeaderMap,
    body: Option<Body>,
    peer: SocketAddr,
    server_name: String,
    server_port: u16,
    context_path: String,
    attributes: HashMap<String, String>,
}

impl HttpInbound {
    /// Fails with [`ProxyError::InvalidHeader`] when a header value is not
    /// valid UTF-8; such values cannot be exposed as text without loss.
    pub fn new(
        parts: Parts,
        body: Body,
        peer: SocketAddr,
        local: SocketAddr,
        server: &ServerConfig,
    ) -> Result<Self, ProxyError> {
        for (name, value) in &parts.headers {
            if let Err(e) = std::str::from_utf8(value.as_bytes()) {
                return Err(ProxyError::InvalidHeader {
                    name: name.as_str().to_string(),
                    reason: format!("value is not valid UTF-8: {e}"),
                });
            }
        }

        let authority = parts
            .headers
            .get(header::HOST)
            .and_then(|h| h.to_str().ok())
            .and_then(|h| Authority::from_str(h).ok());

        let server_name = server
            .name
            .clone()
            .or_else(|| authority.as_ref().map(|a| a.host().to_string()))
            .unwrap_or_else(|| local.ip().to_string());
        let server_port = server
            .port
            .or_else(|| authority.as_ref().and_then(Authority::port_u16))
            .unwrap_or_else(|| local.port());

        Ok(Self {
            method: parts.method.as_str().to_string(),
            headers: parts.headers,
            body: Some(body),
            peer,
            server_name,
            server_port,
            context_path: server.context_path.clone(),
            attributes: HashMap::new(),
        })
    }

    /// Sets a request-scoped attribute (e.g. `use-proxy`).
    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(name.into(), value.into());
    }

    pub fn request_id(&self) -> Option<&str> {
        self.headers.get(X_REQUEST_ID).and_then(|v| v.to_str().ok())
    }
}

impl InboundRequest for HttpInbound {
    fn method(&self) -> &str {
        &self.method
    }

    fn header_names(&self) -> Vec<String> {
        self.headers.keys().map(|k| k.as_str().to_string()).collect()
    }

    fn header_values(&self, name: &str) -> Vec<String> {
        self.headers
            .get_all(name)
            .iter()
            .filter_map(|v| std::str::from_utf8(v.as_bytes()).ok())
            .map(str::to_string)
            .collect()
    }

    fn take_body(&mut self) -> Option<BodyReader> {
        let body = self.body.take()?;
        let stream = Box::pin(body.into_data_stream().map_err(io::Error::other));
        Some(Box::new(StreamReader::new(stream)))
    }

    fn content_length(&self) -> Option<u64> {
        self.headers
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse().ok())
    }

    fn content_type(&self) -> Option<String> {
        self.headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }

    fn attribute(&self, name: &str) -> Option<String> {
        self.attributes.get(name).cloned()
    }

    fn remote_addr(&self) -> String {
        self.peer.ip().to_string()
    }

    // No reverse lookups; the address doubles as the host.
    fn remote_host(&self) -> String {
        self.peer.ip().to_string()
    }

    fn remote_port(&self) -> u16 {
        self.peer.port()
    }

    fn scheme(&self) -> String {
        "http".to_string()
    }

    fn server_name(&self) -> String {
        self.server_name.clone()
    }

    fn server_port(&self) -> u16 {
        self.server_port
    }

    fn context_path(&self) -> String {
        self.context_path.clone()
    }
}
