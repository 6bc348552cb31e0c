//! Path matching utilities

use crate::route::Route;
use quay_core::{Error, Result};
use regex::Regex;
use std::collections::HashMap;

/// Result of a successful route match
#[derive(Debug, Clone)]
pub struct Match {
    /// The matched route
    pub route: Route,

    /// Extracted path parameters
    pub params: HashMap<String, String>,

    /// Wildcard match (if any)
    pub wildcard: Option<String>,
}

/// Path pattern matcher
#[derive(Debug)]
pub struct PathMatcher {
    pattern: String,
    regex: Option<Regex>,
    param_names: Vec<String>,
    has_wildcard: bool,
}

impl PathMatcher {
    /// Compile a path pattern
    ///
    /// Patterns:
    /// - `/users` - static path
    /// - `/users/:id` - dynamic path with parameter
    /// - `/assets/*filepath` - wildcard (must be at end)
    pub fn new(pattern: impl Into<String>) -> Result<Self> {
        let pattern = pattern.into();
        let mut param_names = Vec::new();
        let mut has_wildcard = false;

        for segment in pattern.split('/') {
            if let Some(name) = segment.strip_prefix(':') {
                param_names.push(name.to_string());
            } else if let Some(name) = segment.strip_prefix('*') {
                has_wildcard = true;
                param_names.push(name.to_string());
            }
        }

        let regex = if param_names.is_empty() {
            None
        } else {
            Some(Self::pattern_to_regex(&pattern)?)
        };

        Ok(Self {
            pattern,
            regex,
            param_names,
            has_wildcard,
        })
    }

    fn pattern_to_regex(pattern: &str) -> Result<Regex> {
        let mut regex_str = String::from("^");

        for segment in pattern.split('/').filter(|s| !s.is_empty()) {
            regex_str.push('/');

            if segment.starts_with(':') {
                regex_str.push_str("([^/]+)");
            } else if segment.starts_with('*') {
                regex_str.push_str("(.*)");
            } else {
                regex_str.push_str(&regex::escape(segment));
            }
        }

        regex_str.push('$');

        Regex::new(&regex_str)
            .map_err(|e| Error::Config(format!("Invalid route pattern '{pattern}': {e}")))
    }

    /// Match a path against this pattern
    pub fn matches(&self, path: &str) -> Option<HashMap<String, String>> {
        let Some(regex) = &self.regex else {
            return (path == self.pattern).then(HashMap::new);
        };

        regex.captures(path).map(|captures| {
            self.param_names
                .iter()
                .enumerate()
                .filter_map(|(i, name)| {
                    captures
                        .get(i + 1)
                        .map(|m| (name.clone(), m.as_str().to_string()))
                })
                .collect()
        })
    }

    /// Get the pattern
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Is this a static path?
    pub fn is_static(&self) -> bool {
        self.regex.is_none()
    }

    /// Has wildcard?
    pub fn has_wildcard(&self) -> bool {
        self.has_wildcard
    }

    /// Get parameter names
    pub fn param_names(&self) -> &[String] {
        &self.param_names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_path() {
        let matcher = PathMatcher::new("/users").unwrap();
        assert!(matcher.is_static());
        assert!(!matcher.has_wildcard());

        assert!(matcher.matches("/users").is_some());
        assert!(matcher.matches("/users/123").is_none());
    }

    #[test]
    fn test_single_param() {
        let matcher = PathMatcher::new("/users/:id").unwrap();
        assert_eq!(matcher.param_names(), &["id"]);

        let params = matcher.matches("/users/123").unwrap();
        assert_eq!(params.get("id"), Some(&"123".to_string()));

        assert!(matcher.matches("/users").is_none());
        assert!(matcher.matches("/users/123/extra").is_none());
    }

    #[test]
    fn test_wildcard() {
        let matcher = PathMatcher::new("/assets/*filepath").unwrap();
        assert!(matcher.has_wildcard());

        let params = matcher.matches("/assets/css/main.css").unwrap();
        assert_eq!(params.get("filepath"), Some(&"css/main.css".to_string()));
    }

    #[test]
    fn test_static_segments_are_escaped() {
        let matcher = PathMatcher::new("/v1.0/:id").unwrap();

        assert!(matcher.matches("/v1.0/7").is_some());
        assert!(matcher.matches("/v1x0/7").is_none());
    }
}
