//! Routing subsystem.
//!
//! Stand-in for a full URL-rewriting rule engine: maps a request path to a
//! fully-resolved target URL and the proxy policy to use for it.
//!
//! # Data Flow
//! ```text
//! Incoming Request (path, query)
//!     → router.rs (rule lookup, in configuration order)
//!     → matcher.rs (evaluate path prefix)
//!     → Return: (rule, target URL) or NoMatch
//! ```
//!
//! # Design Decisions
//! - Rules compiled at startup, immutable at runtime
//! - No regex in hot path (prefix matching only)
//! - First match wins

pub mod matcher;
pub mod router;

pub use router::{Router, Rule};
