//! Request context and utilities

use crate::Request;
use std::collections::HashMap;

/// Path parameters extracted by the router (`/users/:id` → `id`)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams(HashMap<String, String>);

impl PathParams {
    /// Wrap a parameter map
    pub fn new(params: HashMap<String, String>) -> Self {
        Self(params)
    }

    /// Get a parameter value
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(|s| s.as_str())
    }

    /// Number of parameters
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no parameters were captured
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Context attached to each request as an extension
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// Identifier of the connection the request arrived on
    pub request_id: String,

    /// Route parameters extracted from path
    pub params: PathParams,

    /// Matched route pattern
    pub route: Option<String>,

    /// Remainder captured by a trailing wildcard segment
    pub wildcard: Option<String>,
}

impl RequestContext {
    /// Create a new request context
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            ..Default::default()
        }
    }

    /// Get the context attached to a request
    pub fn of(req: &Request) -> Option<&RequestContext> {
        req.extensions().get::<RequestContext>()
    }

    /// Get a path parameter
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn test_request_context() {
        let mut map = HashMap::new();
        map.insert("user_id".to_string(), "123".to_string());

        let mut ctx = RequestContext::new("conn-1");
        ctx.params = PathParams::new(map);

        assert_eq!(ctx.request_id, "conn-1");
        assert_eq!(ctx.param("user_id"), Some("123"));
        assert_eq!(ctx.param("missing"), None);
    }

    #[test]
    fn test_context_as_extension() {
        let mut req = http::Request::new(Bytes::new());
        assert!(RequestContext::of(&req).is_none());

        req.extensions_mut().insert(RequestContext::new("abc"));
        assert_eq!(RequestContext::of(&req).unwrap().request_id, "abc");
    }
}
