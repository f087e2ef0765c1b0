//! Path prefix matching.
//!
//! # Design Decisions
//! - Case-sensitive, plain `starts_with` (no regex, no normalization)
//! - The prefix is replaced by `/` exactly once to form the render URL

/// Matches a request target against a site prefix such as `/test/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPrefixMatcher {
    prefix: String,
}

impl PathPrefixMatcher {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn matches(&self, target: &str) -> bool {
        target.starts_with(&self.prefix)
    }

    /// Render URL for a matching target: the prefix replaced by `/`.
    pub fn strip(&self, target: &str) -> String {
        target.replacen(&self.prefix, "/", 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_match() {
        let matcher = PathPrefixMatcher::new("/test/");
        assert!(matcher.matches("/test/"));
        assert!(matcher.matches("/test/about"));
        assert!(!matcher.matches("/test"));
        assert!(!matcher.matches("/test2/about"));
        assert!(!matcher.matches("/Test/about"));
        assert!(!matcher.matches("/other/test/"));
    }

    #[test]
    fn test_strip() {
        let matcher = PathPrefixMatcher::new("/test/");
        assert_eq!(matcher.strip("/test/"), "/");
        assert_eq!(matcher.strip("/test/about"), "/about");
        assert_eq!(matcher.strip("/test/a/test/b?q=/test/"), "/a/test/b?q=/test/");
    }

    #[test]
    fn test_strip_second_prefix() {
        let matcher = PathPrefixMatcher::new("/test2/");
        assert_eq!(matcher.strip("/test2/x"), "/x");
    }
}
