//! Route definition and builder

use http::Method;
use quay_core::{Error, Handler, Result};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Route definition
#[derive(Clone)]
pub struct Route {
    /// HTTP method
    pub method: Method,

    /// Path pattern (e.g., "/users/:id")
    pub path: String,

    /// Priority (higher = matched first)
    pub priority: i32,

    /// Route metadata
    pub metadata: HashMap<String, String>,

    /// Handler invoked at the end of the middleware chain
    pub handler: Arc<dyn Handler>,
}

impl Route {
    /// Create a new route builder
    pub fn builder() -> RouteBuilder {
        RouteBuilder::new()
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("priority", &self.priority)
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}

/// Builder for constructing routes
#[derive(Default)]
pub struct RouteBuilder {
    method: Option<Method>,
    path: Option<String>,
    priority: i32,
    metadata: HashMap<String, String>,
    handler: Option<Arc<dyn Handler>>,
}

impl fmt::Debug for RouteBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteBuilder")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("priority", &self.priority)
            .field("has_handler", &self.handler.is_some())
            .finish()
    }
}

impl RouteBuilder {
    /// Create a new route builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the HTTP method
    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    /// Set the path pattern
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Set the priority
    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Add metadata
    pub fn metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Set the handler
    pub fn handler(mut self, handler: impl Handler + 'static) -> Self {
        self.handler = Some(Arc::new(handler));
        self
    }

    /// Set an already shared handler
    pub fn shared_handler(mut self, handler: Arc<dyn Handler>) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Build the route
    pub fn build(self) -> Result<Route> {
        let method = self
            .method
            .ok_or_else(|| Error::Config("method is required".to_string()))?;

        let path = self
            .path
            .ok_or_else(|| Error::Config("path is required".to_string()))?;

        let handler = self
            .handler
            .ok_or_else(|| Error::Config("handler is required".to_string()))?;

        if !path.starts_with('/') {
            return Err(Error::Config("path must start with '/'".to_string()));
        }

        if let Some(pos) = path.find("/*") {
            if path[pos + 1..].contains('/') {
                return Err(Error::Config(format!(
                    "wildcard must be the last segment: {path}"
                )));
            }
        }

        Ok(Route {
            method,
            path,
            priority: self.priority,
            metadata: self.metadata,
            handler,
        })
    }
}
