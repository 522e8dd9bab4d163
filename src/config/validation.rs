//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check rule targets are absolute http/https URLs
//! - Validate value ranges (timeouts > 0, addresses parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::ProxyConfig;
use crate::proxy::builder::parse_target;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("listener.bind_address '{0}' is not a socket address")]
    BindAddress(String),

    #[error("observability.metrics_address '{0}' is not a socket address")]
    MetricsAddress(String),

    #[error("timeouts.{0} must be greater than zero")]
    ZeroTimeout(&'static str),

    #[error("rule '{0}' is defined more than once")]
    DuplicateRule(String),

    #[error("rule '{rule}': 'from' must start with '/' (got '{from}')")]
    RulePrefix { rule: String, from: String },

    #[error("rule '{rule}': {reason}")]
    RuleTarget { rule: String, reason: String },
}

/// Check `config` for semantic errors.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }
    if config.timeouts.connect_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("connect_secs"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("request_secs"));
    }

    let mut seen = HashSet::new();
    for rule in &config.rules {
        if !seen.insert(rule.name.as_str()) {
            errors.push(ValidationError::DuplicateRule(rule.name.clone()));
        }
        if !rule.from.starts_with('/') {
            errors.push(ValidationError::RulePrefix {
                rule: rule.name.clone(),
                from: rule.from.clone(),
            });
        }
        if let Err(e) = parse_target(&rule.to) {
            errors.push(ValidationError::RuleTarget {
                rule: rule.name.clone(),
                reason: e.to_string(),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::RuleConfig;

    fn rule(name: &str, from: &str, to: &str) -> RuleConfig {
        RuleConfig {
            name: name.into(),
            from: from.into(),
            to: to.into(),
            use_proxy: None,
            proxy: Default::default(),
        }
    }

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&ProxyConfig::default()).is_ok());
    }

    #[test]
    fn collects_every_error() {
        let mut cfg = ProxyConfig::default();
        cfg.listener.bind_address = "nowhere".into();
        cfg.timeouts.request_secs = 0;
        cfg.rules.push(rule("a", "api", "http://origin"));
        cfg.rules.push(rule("a", "/b", "mailto:someone@example.com"));

        let errors = validate_config(&cfg).unwrap_err();
        assert_eq!(errors.len(), 5);
        assert!(errors.contains(&ValidationError::BindAddress("nowhere".into())));
        assert!(errors.contains(&ValidationError::ZeroTimeout("request_secs")));
        assert!(errors.contains(&ValidationError::DuplicateRule("a".into())));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::RuleTarget { .. })));
    }
}
