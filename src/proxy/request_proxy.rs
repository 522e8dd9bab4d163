//! One proxy operation, end to end.

use std::sync::Arc;
use std::time::Duration;

use crate::error::ProxyError;
use crate::proxy::builder;
use crate::proxy::configuration::ProxyConfiguration;
use crate::proxy::connector::{Connector, ProxyHost};
use crate::proxy::guard::{CrLfGuard, HeaderGuard};
use crate::proxy::inbound::{InboundRequest, InboundResponse, USE_PROXY_ATTRIBUTE};
use crate::proxy::translator;

/// Proxies inbound requests to resolved targets under one configuration.
///
/// Holds no per-request state; a single value can serve concurrent calls.
#[derive(Clone)]
pub struct RequestProxy {
    config: ProxyConfiguration,
    guard: Arc<dyn HeaderGuard>,
    connector: Connector,
}

impl RequestProxy {
    pub fn new(config: ProxyConfiguration) -> Self {
        let connector = Connector::new(config.use_system_network_settings);
        Self {
            config,
            guard: Arc::new(CrLfGuard),
            connector,
        }
    }

    /// Replaces the default CR/LF header check.
    pub fn with_guard(mut self, guard: Arc<dyn HeaderGuard>) -> Self {
        self.guard = guard;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connector = self.connector.connect_timeout(timeout);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.connector = self.connector.timeout(timeout);
        self
    }

    /// Sends `inbound` to `target` and relays the answer onto `response`.
    ///
    /// Target, method and header failures are reported before any network
    /// activity and leave `response` untouched. Returns the number of body
    /// bytes relayed.
    pub async fn execute(
        &self,
        target: &str,
        inbound: &mut dyn InboundRequest,
        response: &mut dyn InboundResponse,
    ) -> Result<u64, ProxyError> {
        tracing::info!(target = %target, method = %inbound.method(), "Proxying request");

        let mut outbound = match builder::build(inbound, target, &self.config, self.guard.as_ref()) {
            Ok(outbound) => outbound,
            Err(e) => {
                tracing::error!(target = %target, error = %e, "Outbound request rejected");
                return Err(e);
            }
        };
        outbound.proxy = ProxyHost::parse(inbound.attribute(USE_PROXY_ATTRIBUTE).as_deref());

        let upstream = self.connector.execute(outbound).await?;
        translator::translate(upstream, &self.config, response).await
    }
}

impl std::fmt::Debug for RequestProxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestProxy")
            .field("config", &self.config)
            .field("connector", &self.connector)
            .finish_non_exhaustive()
    }
}
