//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

use rewrite_proxy::proxy::{BodyReader, InboundRequest, InboundResponse};

/// A request as seen on the wire by a mock backend.
#[derive(Debug, Clone)]
pub struct Captured {
    pub head: String,
    pub body: Vec<u8>,
}

impl Captured {
    pub fn request_line(&self) -> &str {
        self.head.lines().next().unwrap_or_default()
    }

    pub fn path(&self) -> &str {
        self.request_line().split(' ').nth(1).unwrap_or_default()
    }

    /// Every value of `name`, case-insensitive.
    pub fn headers(&self, name: &str) -> Vec<String> {
        self.head
            .lines()
            .skip(1)
            .filter_map(|line| line.split_once(':'))
            .filter(|(n, _)| n.trim().eq_ignore_ascii_case(name))
            .map(|(_, v)| v.trim().to_string())
            .collect()
    }

    pub fn header(&self, name: &str) -> Option<String> {
        self.headers(name).into_iter().next()
    }
}

/// Start a mock backend on an ephemeral port. Every request is reported on
/// the returned channel and answered with the raw HTTP text `respond` builds.
pub async fn start_backend<F>(respond: F) -> (SocketAddr, mpsc::UnboundedReceiver<Captured>)
where
    F: Fn(&Captured) -> String + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::unbounded_channel();
    let respond = Arc::new(respond);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let tx = tx.clone();
                    let respond = respond.clone();
                    tokio::spawn(async move {
                        let Ok(captured) = read_request(&mut socket).await else {
                            return;
                        };
                        let response = respond(&captured);
                        let _ = tx.send(captured);
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    (addr, rx)
}

/// Start a mock backend that always answers 200 with `body`.
pub async fn start_mock_backend(body: &'static str) -> (SocketAddr, mpsc::UnboundedReceiver<Captured>) {
    start_backend(move |_| ok_response(body, &[])).await
}

/// Raw `200 OK` response with extra header lines.
pub fn ok_response(body: &str, headers: &[(&str, &str)]) -> String {
    raw_response("200 OK", body, headers)
}

pub fn raw_response(status_line: &str, body: &str, headers: &[(&str, &str)]) -> String {
    let mut out = format!("HTTP/1.1 {status_line}\r\nContent-Length: {}\r\nConnection: close\r\n", body.len());
    for (n, v) in headers {
        out.push_str(&format!("{n}: {v}\r\n"));
    }
    out.push_str("\r\n");
    out.push_str(body);
    out
}

/// Start a backend that accepts connections and never answers.
pub async fn start_silent_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut sink = Vec::new();
                let _ = socket.read_to_end(&mut sink).await;
            });
        }
    });
    addr
}

/// A port with nothing listening on it.
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

async fn read_request(socket: &mut TcpStream) -> std::io::Result<Captured> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let head_end = loop {
        if let Some(pos) = find(&buf, b"\r\n\r\n") {
            break pos + 4;
        }
        let n = socket.read(&mut chunk).await?;
        if n == 0 {
            return Err(std::io::ErrorKind::UnexpectedEof.into());
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).into_owned();
    let mut captured = Captured {
        head,
        body: buf[head_end..].to_vec(),
    };

    if let Some(len) = captured.header("content-length").and_then(|v| v.parse::<usize>().ok()) {
        while captured.body.len() < len {
            let n = socket.read(&mut chunk).await?;
            if n == 0 {
                break;
            }
            captured.body.extend_from_slice(&chunk[..n]);
        }
    } else if captured
        .header("transfer-encoding")
        .is_some_and(|v| v.eq_ignore_ascii_case("chunked"))
    {
        while !captured.body.ends_with(b"0\r\n\r\n") {
            let n = socket.read(&mut chunk).await?;
            if n == 0 {
                break;
            }
            captured.body.extend_from_slice(&chunk[..n]);
        }
        captured.body = dechunk(&captured.body);
    }

    Ok(captured)
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn dechunk(mut data: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    while let Some(line_end) = find(data, b"\r\n") {
        let size_str = String::from_utf8_lossy(&data[..line_end]);
        let size = usize::from_str_radix(size_str.split(';').next().unwrap_or("0").trim(), 16).unwrap_or(0);
        data = &data[line_end + 2..];
        if size == 0 || data.len() < size {
            break;
        }
        out.extend_from_slice(&data[..size]);
        data = &data[(size + 2).min(data.len())..];
    }
    out
}

/// Inbound request double.
pub struct TestRequest {
    pub method: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
    pub attributes: HashMap<String, String>,
    pub remote_addr: String,
}

impl TestRequest {
    pub fn new(method: &str) -> Self {
        Self {
            method: method.into(),
            headers: Vec::new(),
            body: None,
            attributes: HashMap::new(),
            remote_addr: "127.0.0.1".into(),
        }
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn body(mut self, body: &[u8]) -> Self {
        self.body = Some(body.to_vec());
        self
    }

    pub fn attribute(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn remote_addr(mut self, addr: &str) -> Self {
        self.remote_addr = addr.into();
        self
    }
}

impl InboundRequest for TestRequest {
    fn method(&self) -> &str {
        &self.method
    }

    fn header_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for (n, _) in &self.headers {
            if !names.iter().any(|m| m.eq_ignore_ascii_case(n)) {
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
        self.body.take().map(|b| Box::new(std::io::Cursor::new(b)) as BodyReader)
    }

    fn content_length(&self) -> Option<u64> {
        self.body.as_ref().map(|b| b.len() as u64)
    }

    fn content_type(&self) -> Option<String> {
        self.header_values("content-type").into_iter().next()
    }

    fn attribute(&self, name: &str) -> Option<String> {
        self.attributes.get(name).cloned()
    }

    fn remote_addr(&self) -> String {
        self.remote_addr.clone()
    }

    fn remote_host(&self) -> String {
        self.remote_addr.clone()
    }

    fn remote_port(&self) -> u16 {
        50000
    }

    fn scheme(&self) -> String {
        "http".into()
    }

    fn server_name(&self) -> String {
        "proxy.test".into()
    }

    fn server_port(&self) -> u16 {
        8080
    }

    fn context_path(&self) -> String {
        String::new()
    }
}

/// Inbound response double.
#[derive(Default)]
pub struct TestResponse {
    pub status: Option<StatusCode>,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl InboundResponse for TestResponse {
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
