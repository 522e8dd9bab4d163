//! Per-call proxy policy.

use serde::Deserialize;

use crate::proxy::forwarding::ForwardedHeaders;

/// Policy for one proxy operation. Treated as an immutable snapshot.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ProxyConfiguration {
    /// Strip cookies from the outbound request and from the relayed response.
    pub drop_cookies: bool,

    /// Let the outbound client follow upstream redirects.
    pub follow_redirects: bool,

    /// Inherit proxy settings from the process environment.
    pub use_system_network_settings: bool,

    /// Forwarding directives, applied in order.
    pub forwarded_headers: ForwardedHeaders,
}

impl Default for ProxyConfiguration {
    fn default() -> Self {
        Self {
            drop_cookies: true,
            follow_redirects: false,
            use_system_network_settings: false,
            forwarded_headers: ForwardedHeaders::none(),
        }
    }
}
