//! Forwarded-header policy.
//!
//! Each [`ProxyHeader`] variant owns one entry in a static registry: the
//! header it writes, how the value combines with what is already on the
//! outbound request, and a pure function computing the value from the inbound
//! request. The set of variants is closed; the functions are plain `fn`
//! pointers so every rule can be tested on its own.
//!
//! | Variant              | Value                                  | Mode        |
//! |----------------------|----------------------------------------|-------------|
//! | `HOST`               | `serverName:serverPort`                | Overwrite   |
//! | `X_FORWARDED_BY`     | `serverName:serverPort`                | AppendOrSet |
//! | `X_FORWARDED_FOR`    | `remoteAddr`                           | AppendOrSet |
//! | `X_FORWARDED_HOST`   | existing, else `remoteHost:remotePort` | Overwrite   |
//! | `X_FORWARDED_PROTO`  | existing, else `scheme`                | Overwrite   |
//! | `X_FORWARDED_PREFIX` | existing, else `contextPath`           | Overwrite   |

use std::fmt;
use std::str::FromStr;

use axum::http::{header, HeaderMap, HeaderName};
use serde::{Deserialize, Deserializer};
use thiserror::Error;

use crate::proxy::inbound::InboundRequest;

/// One forwarding directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProxyHeader {
    /// Sends the host this proxy was addressed as instead of the target's.
    Host,
    /// Chain of proxy hops.
    XForwardedBy,
    /// Chain of client and proxy addresses.
    XForwardedFor,
    XForwardedHost,
    XForwardedProto,
    XForwardedPrefix,
}

impl ProxyHeader {
    /// Canonical declaration order, used for `All`.
    pub const ALL: [ProxyHeader; 6] = [
        ProxyHeader::Host,
        ProxyHeader::XForwardedBy,
        ProxyHeader::XForwardedFor,
        ProxyHeader::XForwardedHost,
        ProxyHeader::XForwardedProto,
        ProxyHeader::XForwardedPrefix,
    ];

    /// Registry entry for this variant.
    pub fn directive(self) -> &'static Directive {
        &REGISTRY[self as usize]
    }

    pub fn header_name(self) -> &'static HeaderName {
        &self.directive().name
    }

    /// Configuration identifier, e.g. `X_FORWARDED_FOR`.
    pub fn ident(self) -> &'static str {
        self.directive().ident
    }
}

impl fmt::Display for ProxyHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.ident())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown forwarded header '{0}'")]
pub struct UnknownProxyHeader(pub String);

impl FromStr for ProxyHeader {
    type Err = UnknownProxyHeader;

    /// Accepts the identifier (`X_FORWARDED_FOR`) or the header name
    /// (`X-Forwarded-For`), ignoring case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        ProxyHeader::ALL
            .into_iter()
            .find(|h| {
                let d = h.directive();
                s.eq_ignore_ascii_case(d.ident) || s.eq_ignore_ascii_case(d.name.as_str())
            })
            .ok_or_else(|| UnknownProxyHeader(s.to_string()))
    }
}

/// How a computed value combines with the outbound request's headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyMode {
    /// Replace every value already present.
    Overwrite,
    /// Append to the comma-separated chain already present, or set it.
    AppendOrSet,
}

/// Registry entry: one directive's header, mode and value rule.
pub struct Directive {
    pub header: ProxyHeader,
    pub ident: &'static str,
    pub name: HeaderName,
    pub mode: ApplyMode,
    compute: fn(&dyn InboundRequest) -> String,
}

impl Directive {
    /// Computes this directive's value for the given request.
    pub fn compute(&self, original: &dyn InboundRequest) -> String {
        (self.compute)(original)
    }
}

impl fmt::Debug for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Directive")
            .field("ident", &self.ident)
            .field("name", &self.name)
            .field("mode", &self.mode)
            .finish()
    }
}

// Indexed by `ProxyHeader as usize`; keep in declaration order.
static REGISTRY: [Directive; 6] = [
    Directive {
        header: ProxyHeader::Host,
        ident: "HOST",
        name: header::HOST,
        mode: ApplyMode::Overwrite,
        compute: server_authority,
    },
    Directive {
        header: ProxyHeader::XForwardedBy,
        ident: "X_FORWARDED_BY",
        name: HeaderName::from_static("x-forwarded-by"),
        mode: ApplyMode::AppendOrSet,
        compute: server_authority,
    },
    Directive {
        header: ProxyHeader::XForwardedFor,
        ident: "X_FORWARDED_FOR",
        name: HeaderName::from_static("x-forwarded-for"),
        mode: ApplyMode::AppendOrSet,
        compute: remote_addr,
    },
    Directive {
        header: ProxyHeader::XForwardedHost,
        ident: "X_FORWARDED_HOST",
        name: HeaderName::from_static("x-forwarded-host"),
        mode: ApplyMode::Overwrite,
        compute: forwarded_host,
    },
    Directive {
        header: ProxyHeader::XForwardedProto,
        ident: "X_FORWARDED_PROTO",
        name: HeaderName::from_static("x-forwarded-proto"),
        mode: ApplyMode::Overwrite,
        compute: forwarded_proto,
    },
    Directive {
        header: ProxyHeader::XForwardedPrefix,
        ident: "X_FORWARDED_PREFIX",
        name: HeaderName::from_static("x-forwarded-prefix"),
        mode: ApplyMode::Overwrite,
        compute: forwarded_prefix,
    },
];

fn server_authority(req: &dyn InboundRequest) -> String {
    format!("{}:{}", req.server_name(), req.server_port())
}

fn remote_addr(req: &dyn InboundRequest) -> String {
    req.remote_addr()
}

fn forwarded_host(req: &dyn InboundRequest) -> String {
    existing(req, "x-forwarded-host")
        .unwrap_or_else(|| format!("{}:{}", req.remote_host(), req.remote_port()))
}

fn forwarded_proto(req: &dyn InboundRequest) -> String {
    existing(req, "x-forwarded-proto").unwrap_or_else(|| req.scheme())
}

fn forwarded_prefix(req: &dyn InboundRequest) -> String {
    existing(req, "x-forwarded-prefix").unwrap_or_else(|| req.context_path())
}

fn existing(req: &dyn InboundRequest, name: &str) -> Option<String> {
    let values = req.header_values(name);
    if values.is_empty() {
        None
    } else {
        Some(values.join(", "))
    }
}

/// A computed forwarded header, ready to merge into an outbound request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardedHeader {
    pub name: HeaderName,
    pub value: String,
    pub mode: ApplyMode,
}

impl ForwardedHeader {
    /// Final value once combined with `current` according to the mode.
    pub fn resolve(&self, current: &HeaderMap) -> String {
        match self.mode {
            ApplyMode::Overwrite => self.value.clone(),
            ApplyMode::AppendOrSet => {
                let mut chain: Vec<&str> = current
                    .get_all(&self.name)
                    .iter()
                    .filter_map(|v| v.to_str().ok())
                    .filter(|v| !v.trim().is_empty())
                    .collect();
                chain.push(&self.value);
                chain.join(", ")
            }
        }
    }
}

/// Computes the forwarded headers for `original`, in directive order.
pub fn apply(directives: &ForwardedHeaders, original: &dyn InboundRequest) -> Vec<ForwardedHeader> {
    directives
        .iter()
        .map(|h| {
            let d = h.directive();
            ForwardedHeader {
                name: d.name.clone(),
                value: d.compute(original),
                mode: d.mode,
            }
        })
        .collect()
}

/// Ordered, duplicate-free set of directives. Insertion order is application
/// order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ForwardedHeaders(Vec<ProxyHeader>);

impl ForwardedHeaders {
    /// Literal selecting every directive in declaration order.
    pub const INCLUDE_ALL: &'static str = "All";

    pub fn none() -> Self {
        Self(Vec::new())
    }

    pub fn all() -> Self {
        Self(ProxyHeader::ALL.to_vec())
    }

    pub fn iter(&self) -> impl Iterator<Item = ProxyHeader> + '_ {
        self.0.iter().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn contains(&self, header: ProxyHeader) -> bool {
        self.0.contains(&header)
    }
}

impl FromIterator<ProxyHeader> for ForwardedHeaders {
    /// Later duplicates are dropped; the first occurrence keeps its place.
    fn from_iter<I: IntoIterator<Item = ProxyHeader>>(iter: I) -> Self {
        let mut set = Vec::new();
        for h in iter {
            if !set.contains(&h) {
                set.push(h);
            }
        }
        Self(set)
    }
}

impl FromStr for ForwardedHeaders {
    type Err = UnknownProxyHeader;

    /// `All`, or a comma-separated list of directive names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case(Self::INCLUDE_ALL) {
            return Ok(Self::all());
        }
        s.split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(ProxyHeader::from_str)
            .collect()
    }
}

impl<'de> Deserialize<'de> for ForwardedHeaders {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            One(String),
            Many(Vec<String>),
        }

        match Raw::deserialize(deserializer)? {
            Raw::One(s) => s.parse().map_err(serde::de::Error::custom),
            Raw::Many(names) => names
                .iter()
                .map(|n| n.parse::<ProxyHeader>())
                .collect::<Result<ForwardedHeaders, _>>()
                .map_err(serde::de::Error::custom),
        }
    }
}
