//! Rule lookup and target resolution.

use std::time::Duration;

use crate::config::{ProxyConfig, RuleConfig};
use crate::proxy::RequestProxy;
use crate::routing::matcher::{Matcher, PathPrefixMatcher};

/// A compiled rewrite rule.
#[derive(Debug)]
pub struct Rule {
    pub name: String,
    matcher: PathPrefixMatcher,
    to: String,
    pub use_proxy: Option<String>,
    pub proxy: RequestProxy,
}

impl Rule {
    fn compile(config: &RuleConfig, connect_timeout: Duration, timeout: Duration) -> Self {
        Self {
            name: config.name.clone(),
            matcher: PathPrefixMatcher::new(config.from.as_str()),
            to: config.to.trim_end_matches('/').to_string(),
            use_proxy: config.use_proxy.clone(),
            proxy: RequestProxy::new(config.proxy.clone())
                .connect_timeout(connect_timeout)
                .timeout(timeout),
        }
    }

    /// Target URL for `path` and `query`, or `None` if the rule does not apply.
    pub fn resolve(&self, path: &str, query: Option<&str>) -> Option<String> {
        let rest = self.matcher.strip(path)?;
        let mut target = format!("{}{}", self.to, rest);
        if let Some(q) = query {
            target.push('?');
            target.push_str(q);
        }
        Some(target)
    }
}

/// Ordered rule set; the first matching rule wins.
#[derive(Debug, Default)]
pub struct Router {
    rules: Vec<Rule>,
}

impl Router {
    /// Compile every rule in configuration order.
    pub fn from_config(config: &ProxyConfig) -> Self {
        let connect = Duration::from_secs(config.timeouts.connect_secs);
        let total = Duration::from_secs(config.timeouts.request_secs);
        let rules = config
            .rules
            .iter()
            .map(|r| Rule::compile(r, connect, total))
            .collect();
        Self { rules }
    }

    /// Find the rule for `path` together with the resolved target.
    pub fn route(&self, path: &str, query: Option<&str>) -> Option<(&Rule, String)> {
        self.rules
            .iter()
            .find_map(|rule| rule.resolve(path, query).map(|target| (rule, target)))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
