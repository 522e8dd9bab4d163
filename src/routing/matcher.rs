//! Path matching logic.
//!
//! # Design Decisions
//! - Path matching is case-sensitive
//! - A prefix matches whole segments only: `/api` matches `/api` and
//!   `/api/users`, never `/apiary`
//! - No regex to guarantee O(n) matching

/// Trait for matching request paths against conditions.
pub trait Matcher: Send + Sync + std::fmt::Debug {
    /// Returns the unmatched remainder of `path` when it matches.
    fn strip<'a>(&self, path: &'a str) -> Option<&'a str>;

    fn matches(&self, path: &str) -> bool {
        self.strip(path).is_some()
    }
}

/// Matches the request path prefix.
#[derive(Debug, Clone)]
pub struct PathPrefixMatcher {
    prefix: String,
}

impl PathPrefixMatcher {
    /// Create a new path prefix matcher. A trailing slash is ignored.
    pub fn new(prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        Self {
            prefix: prefix.trim_end_matches('/').to_string(),
        }
    }
}

impl Matcher for PathPrefixMatcher {
    fn strip<'a>(&self, path: &'a str) -> Option<&'a str> {
        let rest = path.strip_prefix(self.prefix.as_str())?;
        if rest.is_empty() || rest.starts_with('/') {
            Some(rest)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_matcher() {
        let matcher = PathPrefixMatcher::new("/api");
        assert_eq!(matcher.strip("/api/v1"), Some("/v1"));
        assert_eq!(matcher.strip("/api"), Some(""));
        assert!(!matcher.matches("/apiary"));
        assert!(!matcher.matches("/images"));
        assert!(!matcher.matches("/API/v1"));
    }

    #[test]
    fn test_root_matcher() {
        let matcher = PathPrefixMatcher::new("/");
        assert_eq!(matcher.strip("/"), Some("/"));
        assert_eq!(matcher.strip("/anything"), Some("/anything"));
    }

    #[test]
    fn trailing_slash_ignored() {
        let matcher = PathPrefixMatcher::new("/static/");
        assert_eq!(matcher.strip("/static/app.js"), Some("/app.js"));
    }
}
