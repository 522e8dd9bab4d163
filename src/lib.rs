//! URL-rewriting proxy: request/response translation engine and its HTTP host.

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod proxy;
pub mod routing;

pub use config::schema::ProxyConfig;
pub use error::{ProxyError, TransportError};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use proxy::{ProxyConfiguration, RequestProxy};
