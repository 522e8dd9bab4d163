//! Upstream response relay.

use axum::http::{HeaderName, StatusCode};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::ProxyError;
use crate::proxy::configuration::ProxyConfiguration;
use crate::proxy::connector::UpstreamResponse;
use crate::proxy::inbound::InboundResponse;

/// Size of the intermediate copy buffer.
pub const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// Response headers re-framed by the relay and never copied.
const REFRAMED: [&str; 3] = ["content-encoding", "content-length", "transfer-encoding"];

/// True if `name` survives filtering under `config`.
pub fn is_relayed(name: &HeaderName, config: &ProxyConfiguration) -> bool {
    let name = name.as_str();
    if REFRAMED.contains(&name) {
        return false;
    }
    // Names are lowercase already. A cookie set by the origin would land in
    // the caller's own session.
    !(config.drop_cookies && (name.starts_with("cookie") || name.starts_with("set-cookie")))
}

/// Writes `upstream` onto `response`: filtered headers, then the status when
/// it is not 200, then the body. Returns the number of body bytes relayed.
///
/// The upstream body is dropped on every path out of this function.
pub async fn translate(
    upstream: UpstreamResponse,
    config: &ProxyConfiguration,
    response: &mut dyn InboundResponse,
) -> Result<u64, ProxyError> {
    let UpstreamResponse {
        status,
        reason,
        headers,
        body,
    } = upstream;

    tracing::debug!(status = status.as_u16(), reason = ?reason, "Translating upstream response");

    for (name, value) in headers.iter() {
        if !is_relayed(name, config) {
            tracing::trace!(header = %name, "Dropping response header");
            continue;
        }
        response.add_header(name, value);
    }

    if status != StatusCode::OK {
        response.set_status(status);
    }

    let copied = match body {
        Some(mut body) => copy_stream(&mut body, response.output()).await?,
        None => 0,
    };

    tracing::info!(status = status.as_u16(), bytes = copied, "Relayed upstream response");
    Ok(copied)
}

/// Copies `input` to `output` through a fixed 64 KiB buffer until end of
/// stream, then flushes. `output` is not shut down.
pub async fn copy_stream<R, W>(input: &mut R, output: &mut W) -> Result<u64, ProxyError>
where
    R: AsyncRead + Unpin + ?Sized,
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut buf = vec![0u8; COPY_BUFFER_SIZE];
    let mut total = 0u64;
    loop {
        let n = input.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        output.write_all(&buf[..n]).await?;
        total += n as u64;
    }
    output.flush().await?;
    Ok(total)
}
