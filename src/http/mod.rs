//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, rule lookup)
//!     → request.rs (axum request → InboundRequest)
//!     → proxy engine (build, execute, translate)
//!     → response.rs (InboundResponse → streamed axum response)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{HttpInbound, X_REQUEST_ID};
pub use response::{PendingResponse, StreamingResponse};
pub use server::HttpServer;
