//! Outbound connection execution.
//!
//! # Responsibilities
//! - Resolve the upstream proxy from the `use-proxy` attribute
//! - Build a single-use client (no pooling across calls)
//! - Execute one request, surface every network failure as a transport error
//!
//! # Design Decisions
//! - The client lives only for one execution; dropping the returned body
//!   releases the connection
//! - Redirect following is taken from the request, never from a second knob
//! - Ambient proxy variables are honored only with `use_system_network_settings`

use std::fmt;
use std::io;
use std::time::Duration;

use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use futures_util::TryStreamExt;
use hyper::ext::ReasonPhrase;
use reqwest::redirect::Policy;
use tokio_util::io::{ReaderStream, StreamReader};

use crate::error::ProxyError;
use crate::proxy::builder::OutboundRequest;
use crate::proxy::inbound::BodyReader;

/// Redirect hops followed when redirects are enabled.
const MAX_REDIRECTS: usize = 10;

/// Port used when `use-proxy` has a non-numeric port suffix.
const FALLBACK_PROXY_PORT: u16 = 80;

/// Upstream proxy endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyHost {
    pub host: String,
    /// `None` leaves the port to the transport's default.
    pub port: Option<u16>,
}

impl ProxyHost {
    /// Parses `host` or `host:port`.
    ///
    /// A port suffix that is not all digits falls back to port 80. Absent or
    /// blank input means no upstream proxy.
    pub fn parse(value: Option<&str>) -> Option<ProxyHost> {
        let value = value?.trim();
        if value.is_empty() {
            return None;
        }
        match value.split_once(':') {
            Some((host, port)) => {
                let port = if !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) {
                    port.parse().unwrap_or(FALLBACK_PROXY_PORT)
                } else {
                    FALLBACK_PROXY_PORT
                };
                Some(ProxyHost {
                    host: host.to_string(),
                    port: Some(port),
                })
            }
            None => Some(ProxyHost {
                host: value.to_string(),
                port: None,
            }),
        }
    }

    fn url(&self) -> String {
        format!("http://{self}")
    }
}

impl fmt::Display for ProxyHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.port {
            Some(port) => write!(f, "{}:{}", self.host, port),
            None => f.write_str(&self.host),
        }
    }
}

/// Response received from the upstream.
pub struct UpstreamResponse {
    pub status: StatusCode,
    /// Reason phrase as sent by the upstream; the canonical phrase when the
    /// upstream used it.
    pub reason: Option<String>,
    pub headers: HeaderMap,
    /// Absent for responses that never carry an entity (1xx, 204, 304).
    pub body: Option<BodyReader>,
}

impl fmt::Debug for UpstreamResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpstreamResponse")
            .field("status", &self.status)
            .field("reason", &self.reason)
            .field("headers", &self.headers)
            .field("has_body", &self.body.is_some())
            .finish()
    }
}

/// Executes outbound requests, one connection per call.
#[derive(Debug, Clone, Default)]
pub struct Connector {
    use_system_network_settings: bool,
    connect_timeout: Option<Duration>,
    timeout: Option<Duration>,
}

impl Connector {
    pub fn new(use_system_network_settings: bool) -> Self {
        Self {
            use_system_network_settings,
            ..Self::default()
        }
    }

    /// Bound on establishing the connection.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Bound on the whole exchange, body included.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn client(&self, request: &OutboundRequest) -> Result<reqwest::Client, ProxyError> {
        let policy = if request.follow_redirects {
            Policy::limited(MAX_REDIRECTS)
        } else {
            Policy::none()
        };

        let mut builder = reqwest::Client::builder()
            .pool_max_idle_per_host(0)
            .redirect(policy);

        if !self.use_system_network_settings {
            builder = builder.no_proxy();
        }
        if let Some(proxy) = &request.proxy {
            builder = builder.proxy(reqwest::Proxy::all(proxy.url())?);
        }
        if let Some(t) = self.connect_timeout {
            builder = builder.connect_timeout(t);
        }
        if let Some(t) = self.timeout {
            builder = builder.timeout(t);
        }
        Ok(builder.build()?)
    }

    /// Sends `request` and waits for the response head.
    pub async fn execute(&self, request: OutboundRequest) -> Result<UpstreamResponse, ProxyError> {
        let client = self.client(&request)?;

        tracing::debug!(
            method = %request.method,
            url = %request.url,
            proxy = ?request.proxy.as_ref().map(ToString::to_string),
            follow_redirects = request.follow_redirects,
            "Executing upstream request"
        );

        let OutboundRequest {
            method,
            url,
            mut headers,
            body,
            ..
        } = request;

        let mut builder = client.request(method, url);
        if let Some(body) = body {
            if let Some(len) = body.length {
                headers.insert(header::CONTENT_LENGTH, HeaderValue::from(len));
            }
            if !headers.contains_key(header::CONTENT_TYPE) {
                if let Some(ct) = body.content_type.as_deref().and_then(|ct| HeaderValue::from_str(ct).ok()) {
                    headers.insert(header::CONTENT_TYPE, ct);
                }
            }
            builder = builder.body(reqwest::Body::wrap_stream(ReaderStream::new(body.reader)));
        }

        let response = builder.headers(headers).send().await.map_err(|e| {
            tracing::warn!(error = %e, "Upstream request failed");
            ProxyError::from(e)
        })?;

        Ok(into_upstream(response))
    }
}

fn into_upstream(response: reqwest::Response) -> UpstreamResponse {
    let status = response.status();
    let reason = reason_phrase(&response);
    let headers = response.headers().clone();
    let body = if carries_entity(status) {
        let stream = Box::pin(response.bytes_stream().map_err(io::Error::other));
        Some(Box::new(StreamReader::new(stream)) as BodyReader)
    } else {
        None
    };

    UpstreamResponse {
        status,
        reason,
        headers,
        body,
    }
}

// hyper records the phrase only when it differs from the canonical one.
fn reason_phrase(response: &reqwest::Response) -> Option<String> {
    match response.extensions().get::<ReasonPhrase>() {
        Some(phrase) => Some(String::from_utf8_lossy(phrase.as_bytes()).into_owned()),
        None => response.status().canonical_reason().map(str::to_string),
    }
}

fn carries_entity(status: StatusCode) -> bool {
    !(status.is_informational()
        || status == StatusCode::NO_CONTENT
        || status == StatusCode::NOT_MODIFIED)
}
