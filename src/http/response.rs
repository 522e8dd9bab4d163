//! Response handling and transformation.
//!
//! # Responsibilities
//! - Collect status and headers written by the engine
//! - Release the response head on the first body write
//! - Stream the body to the client through a bounded in-memory pipe
//! - Map engine errors to gateway status codes
//!
//! # Design Decisions
//! - Streaming responses avoid buffering entire body
//! - Errors after the head is released end the body stream with an error, so
//!   the connection is aborted instead of closing a truncated body cleanly

use std::io;

use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use futures_util::{stream, StreamExt};
use tokio::io::{AsyncWrite, DuplexStream};
use tokio::sync::oneshot;
use tokio_util::io::ReaderStream;

use crate::error::{ProxyError, TransportError};
use crate::proxy::translator::COPY_BUFFER_SIZE;
use crate::proxy::InboundResponse;

/// Status line and headers of a relayed response.
#[derive(Debug)]
pub struct ResponseHead {
    pub status: StatusCode,
    pub headers: HeaderMap,
}

type HeadSender = oneshot::Sender<Result<ResponseHead, ProxyError>>;

/// How the body ended; sent once the writer side is done.
type Outcome = Result<(), io::Error>;

/// Receiving half of a [`StreamingResponse`].
pub struct PendingResponse {
    head: oneshot::Receiver<Result<ResponseHead, ProxyError>>,
    body: DuplexStream,
    outcome: oneshot::Receiver<Outcome>,
}

impl PendingResponse {
    /// Waits until the head is released or the operation fails before
    /// writing anything.
    pub async fn into_response(self) -> Result<Response, ProxyError> {
        let head = match self.head.await {
            Ok(head) => head?,
            Err(_) => {
                return Err(ProxyError::from(io::Error::other(
                    "proxy task ended without a response",
                )))
            }
        };

        // Bytes first, then the outcome: a failed or abandoned operation
        // surfaces as a body error rather than a clean end of stream.
        let outcome = stream::once(self.outcome).filter_map(|outcome| async move {
            match outcome {
                Ok(Ok(())) => None,
                Ok(Err(e)) => Some(Err::<Bytes, _>(e)),
                Err(_) => Some(Err(io::Error::other(
                    "proxy task ended before the body completed",
                ))),
            }
        });
        let body = ReaderStream::new(self.body).chain(outcome);

        let mut response = Response::new(Body::from_stream(body));
        *response.status_mut() = head.status;
        *response.headers_mut() = head.headers;
        Ok(response)
    }
}

/// [`InboundResponse`] backed by an axum response under construction.
pub struct StreamingResponse {
    status: StatusCode,
    headers: HeaderMap,
    head: Option<HeadSender>,
    body: DuplexStream,
    outcome: oneshot::Sender<Outcome>,
}

impl StreamingResponse {
    pub fn channel() -> (StreamingResponse, PendingResponse) {
        let (head_tx, head_rx) = oneshot::channel();
        let (outcome_tx, outcome_rx) = oneshot::channel();
        let (writer, reader) = tokio::io::duplex(COPY_BUFFER_SIZE);
        (
            StreamingResponse {
                status: StatusCode::OK,
                headers: HeaderMap::new(),
                head: Some(head_tx),
                body: writer,
                outcome: outcome_tx,
            },
            PendingResponse {
                head: head_rx,
                body: reader,
                outcome: outcome_rx,
            },
        )
    }

    fn commit(&mut self) {
        if let Some(tx) = self.head.take() {
            let head = ResponseHead {
                status: self.status,
                headers: std::mem::take(&mut self.headers),
            };
            // The receiver is gone only if the client disconnected.
            let _ = tx.send(Ok(head));
        }
    }

    /// Completes the operation; releases the head if nothing was written.
    pub fn finish(mut self) {
        self.commit();
        let _ = self.outcome.send(Ok(()));
    }

    /// Reports `err` to the client side. Before the head is released the
    /// client gets an error response; afterwards the body stream fails and
    /// `err` is handed back for logging.
    pub fn fail(mut self, err: ProxyError) -> Option<ProxyError> {
        match self.head.take() {
            Some(tx) => {
                let _ = tx.send(Err(err));
                None
            }
            None => {
                let _ = self.outcome.send(Err(io::Error::other(err.to_string())));
                Some(err)
            }
        }
    }
}

impl InboundResponse for StreamingResponse {
    fn add_header(&mut self, name: &HeaderName, value: &HeaderValue) {
        self.headers.append(name.clone(), value.clone());
    }

    fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    fn output(&mut self) -> &mut (dyn AsyncWrite + Send + Unpin) {
        self.commit();
        &mut self.body
    }
}

/// Gateway status for a failed proxy operation.
pub fn error_status(err: &ProxyError) -> StatusCode {
    match err {
        ProxyError::InvalidTarget { .. } => StatusCode::BAD_GATEWAY,
        ProxyError::UnsupportedMethod(_) => StatusCode::METHOD_NOT_ALLOWED,
        ProxyError::HeaderInjection { .. } | ProxyError::InvalidHeader { .. } => StatusCode::BAD_REQUEST,
        ProxyError::Transport(TransportError::Http(e)) if e.is_timeout() => StatusCode::GATEWAY_TIMEOUT,
        ProxyError::Transport(_) => StatusCode::BAD_GATEWAY,
    }
}

/// Plain-text error response for `err`.
pub fn error_response(err: &ProxyError) -> Response {
    let status = error_status(err);
    let message = match err {
        ProxyError::Transport(_) => "Upstream request failed".to_string(),
        other => other.to_string(),
    };
    (status, message).into_response()
}
