//! In-memory host doubles for unit tests.

use std::collections::HashMap;

use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};

use crate::proxy::inbound::{BodyReader, InboundRequest, InboundResponse};

/// Inbound request assembled field by field.
pub struct FakeRequest {
    method: String,
    headers: Vec<(String, String)>,
    body: Option<Vec<u8>>,
    content_type: Option<String>,
    attributes: HashMap<String, String>,
    remote_addr: String,
    remote_host: String,
    remote_port: u16,
    scheme: String,
    server_name: String,
    server_port: u16,
    context_path: String,
}

impl FakeRequest {
    pub fn new(method: &str) -> Self {
        Self {
            method: method.to_string(),
            headers: Vec::new(),
            body: None,
            content_type: None,
            attributes: HashMap::new(),
            remote_addr: "127.0.0.1".into(),
            remote_host: "localhost".into(),
            remote_port: 40000,
            scheme: "http".into(),
            server_name: "localhost".into(),
            server_port: 8080,
            context_path: String::new(),
        }
    }

    pub fn get() -> Self {
        Self::new("GET")
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn body(mut self, bytes: &[u8], content_type: &str) -> Self {
        self.content_type = Some(content_type.to_string());
        self.body = Some(bytes.to_vec());
        self
    }

    pub fn attribute(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_string(), value.to_string());
        self
    }

    pub fn remote(mut self, addr: &str, host: &str, port: u16) -> Self {
        self.remote_addr = addr.into();
        self.remote_host = host.into();
        self.remote_port = port;
        self
    }

    pub fn server(mut self, name: &str, port: u16) -> Self {
        self.server_name = name.into();
        self.server_port = port;
        self
    }

    pub fn scheme(mut self, scheme: &str) -> Self {
        self.scheme = scheme.into();
        self
    }

    pub fn context_path(mut self, path: &str) -> Self {
        self.context_path = path.into();
        self
    }
}

impl InboundRequest for FakeRequest {
    fn method(&self) -> &str {
        &self.method
    }

    fn header_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for (n, _) in &self.headers {
            if !names.iter().any(|seen| seen.eq_ignore_ascii_case(n)) {
                names.push(n.clone());
            }
        }
        names
    }

    fn header_values(&self, name: &str) -> Vec<String> {
        self.headers
            .iter()
            .filter(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.clone())
            .collect()
    }

    fn take_body(&mut self) -> Option<BodyReader> {
        self.body
            .take()
            .map(|b| Box::new(std::io::Cursor::new(b)) as BodyReader)
    }

    // Known only while the body is still attached.
    fn content_length(&self) -> Option<u64> {
        self.body.as_ref().map(|b| b.len() as u64)
    }

    fn content_type(&self) -> Option<String> {
        self.content_type.clone()
    }

    fn attribute(&self, name: &str) -> Option<String> {
        self.attributes.get(name).cloned()
    }

    fn remote_addr(&self) -> String {
        self.remote_addr.clone()
    }

    fn remote_host(&self) -> String {
        self.remote_host.clone()
    }

    fn remote_port(&self) -> u16 {
        self.remote_port
    }

    fn scheme(&self) -> String {
        self.scheme.clone()
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

/// Records what the engine writes.
#[derive(Default)]
pub struct RecordingResponse {
    pub status: Option<StatusCode>,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl InboundResponse for RecordingResponse {
    fn add_header(&mut self, name: &HeaderName, value: &HeaderValue) {
        self.headers.append(name.clone(), value.clone());
    }

    fn set_status(&mut self, status: StatusCode) {
        self.status = Some(status);
    }

    fn output(&mut self) -> &mut (dyn tokio::io::AsyncWrite + Send + Unpin) {
        &mut self.body
    }
}
