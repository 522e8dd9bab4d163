//! Request/response translation engine.
//!
//! # Data Flow
//! ```text
//! InboundRequest + target URL + ProxyConfiguration
//!     → forwarding.rs (forwarded-header values, pure)
//!     → builder.rs (method, headers, body → OutboundRequest)
//!     → connector.rs (single-use client, optional upstream proxy)
//!     → translator.rs (filtered headers, status, 64 KiB body copy)
//!     → InboundResponse
//! ```
//!
//! # Design Decisions
//! - Nothing is shared between requests; every value is built per call
//! - Everything that can be rejected is rejected before the connection opens
//! - Upstream 4xx/5xx responses are relayed, not treated as errors

pub mod builder;
pub mod configuration;
pub mod connector;
pub mod forwarding;
pub mod guard;
pub mod inbound;
pub mod request_proxy;
pub mod translator;

#[cfg(test)]
pub(crate) mod testing;

pub use builder::{OutboundBody, OutboundRequest};
pub use configuration::ProxyConfiguration;
pub use connector::{Connector, ProxyHost, UpstreamResponse};
pub use forwarding::{ApplyMode, ForwardedHeader, ForwardedHeaders, ProxyHeader};
pub use guard::{CrLfGuard, HeaderGuard};
pub use inbound::{BodyReader, InboundRequest, InboundResponse, USE_PROXY_ATTRIBUTE};
pub use request_proxy::RequestProxy;
