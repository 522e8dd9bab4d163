//! Outbound request construction.
//!
//! # Header rules
//! - `Host`, `Content-Length` and `Accept-Encoding` are never copied: the
//!   client sets the first two, and only encodings the client itself can
//!   decode may be advertised upstream.
//! - With `drop_cookies`, every header whose name starts with `cookie` is
//!   dropped.
//! - Forwarded headers are applied after the copy, in configured order.
//! - Every value passes the [`HeaderGuard`] first.

use std::fmt;

use axum::http::{HeaderMap, HeaderName, HeaderValue, Method};
use url::Url;

use crate::error::ProxyError;
use crate::proxy::configuration::ProxyConfiguration;
use crate::proxy::connector::ProxyHost;
use crate::proxy::forwarding;
use crate::proxy::guard::HeaderGuard;
use crate::proxy::inbound::{BodyReader, InboundRequest};

/// Inbound headers the transport manages itself.
const TRANSPORT_MANAGED: [&str; 3] = ["host", "content-length", "accept-encoding"];

/// The request to send upstream.
#[derive(Debug)]
pub struct OutboundRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<OutboundBody>,
    pub follow_redirects: bool,
    /// Upstream proxy to route through; direct connection when `None`.
    pub proxy: Option<ProxyHost>,
}

/// Request body streamed from the inbound request.
pub struct OutboundBody {
    pub reader: BodyReader,
    /// Declared length; `None` means chunked.
    pub length: Option<u64>,
    pub content_type: Option<String>,
}

impl fmt::Debug for OutboundBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutboundBody")
            .field("length", &self.length)
            .field("content_type", &self.content_type)
            .finish_non_exhaustive()
    }
}

/// Parses and checks a resolved target URL.
pub fn parse_target(target: &str) -> Result<Url, ProxyError> {
    let invalid = |reason: String| ProxyError::InvalidTarget {
        target: target.to_string(),
        reason,
    };

    if target.trim().is_empty() {
        return Err(invalid("target address is blank".into()));
    }
    let url = Url::parse(target).map_err(|e| invalid(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => {}
        other => return Err(invalid(format!("unsupported scheme '{other}'"))),
    }
    if url.host_str().is_none() {
        return Err(invalid("missing host".into()));
    }
    Ok(url)
}

/// Maps an inbound method onto the supported set.
pub fn outbound_method(name: &str) -> Result<Method, ProxyError> {
    if name.eq_ignore_ascii_case("GET") {
        Ok(Method::GET)
    } else if name.eq_ignore_ascii_case("POST") {
        Ok(Method::POST)
    } else if name.eq_ignore_ascii_case("PUT") {
        Ok(Method::PUT)
    } else if name.eq_ignore_ascii_case("DELETE") {
        Ok(Method::DELETE)
    } else {
        Err(ProxyError::UnsupportedMethod(name.to_string()))
    }
}

/// Builds the outbound request for `inbound`.
///
/// The inbound body is taken only once every header has been accepted, so a
/// rejected build leaves the stream untouched.
pub fn build(
    inbound: &mut dyn InboundRequest,
    target: &str,
    config: &ProxyConfiguration,
    guard: &dyn HeaderGuard,
) -> Result<OutboundRequest, ProxyError> {
    let url = parse_target(target)?;
    let method = match outbound_method(inbound.method()) {
        Ok(m) => m,
        Err(e) => {
            tracing::warn!(method = %inbound.method(), "Unsupported HTTP method requested");
            return Err(e);
        }
    };

    let mut headers = copy_headers(&*inbound, config, guard)?;
    apply_forwarded(&mut headers, &*inbound, config, guard)?;

    let body = if method == Method::POST || method == Method::PUT {
        // Hosts may tie the declared length to the stream; read it first.
        let length = inbound.content_length();
        let content_type = inbound.content_type();
        Some(match inbound.take_body() {
            Some(reader) => OutboundBody {
                reader,
                length,
                content_type,
            },
            None => OutboundBody {
                reader: Box::new(tokio::io::empty()),
                length: Some(0),
                content_type,
            },
        })
    } else {
        None
    };

    tracing::debug!(
        method = %method,
        url = %url,
        headers = headers.len(),
        forwarded = config.forwarded_headers.len(),
        has_body = body.is_some(),
        "Outbound request built"
    );

    Ok(OutboundRequest {
        method,
        url,
        headers,
        body,
        follow_redirects: config.follow_redirects,
        proxy: None,
    })
}

fn copy_headers(
    inbound: &dyn InboundRequest,
    config: &ProxyConfiguration,
    guard: &dyn HeaderGuard,
) -> Result<HeaderMap, ProxyError> {
    let mut headers = HeaderMap::new();
    for name in inbound.header_names() {
        if TRANSPORT_MANAGED.iter().any(|m| name.eq_ignore_ascii_case(m)) {
            continue;
        }
        if config.drop_cookies && name.to_ascii_lowercase().starts_with("cookie") {
            continue;
        }

        let values = inbound.header_values(&name);
        for value in &values {
            guard.check(&name, value)?;
        }
        let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
            ProxyError::InvalidHeader {
                name: name.clone(),
                reason: e.to_string(),
            }
        })?;
        for value in values {
            tracing::trace!(header = %header_name, value = %value, "Copying request header");
            headers.append(header_name.clone(), header_value(&name, &value)?);
        }
    }
    Ok(headers)
}

fn apply_forwarded(
    headers: &mut HeaderMap,
    inbound: &dyn InboundRequest,
    config: &ProxyConfiguration,
    guard: &dyn HeaderGuard,
) -> Result<(), ProxyError> {
    for fwd in forwarding::apply(&config.forwarded_headers, inbound) {
        let value = fwd.resolve(headers);
        guard.check(fwd.name.as_str(), &value)?;
        let value = header_value(fwd.name.as_str(), &value)?;
        tracing::trace!(header = %fwd.name, value = ?value, mode = ?fwd.mode, "Applying forwarded header");
        headers.insert(fwd.name, value);
    }
    Ok(())
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue, ProxyError> {
    HeaderValue::from_str(value).map_err(|e| ProxyError::InvalidHeader {
        name: name.to_string(),
        reason: e.to_string(),
    })
}
