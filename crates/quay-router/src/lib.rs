//! # Quay Router
//!
//! Trie-based router and the request-serving side of the [`Dispatch`] contract:
//! - HTTP/1.x request parsing bounded by configured limits
//! - Path parameter extraction (`/users/:id`)
//! - Wildcard matching (`/static/*filepath`)
//! - Method-based routing that tells 404 apart from 405
//! - Global middleware published as a copy-on-write snapshot
//! - Static file and directory serving
//! - Custom error responses via [`Catchers`]

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod catchers;
pub mod matcher;
pub mod parser;
pub mod route;
pub mod static_files;
pub mod trie;

pub use catchers::{Catcher, Catchers};
pub use matcher::{Match, PathMatcher};
pub use parser::ParseLimits;
pub use route::{Route, RouteBuilder};
pub use trie::RouteTrie;

use arc_swap::ArcSwap;
use dashmap::DashMap;
use http::Method;
use quay_core::response::write_response;
use quay_core::{
    ConnectionScope, Dispatch, DispatchError, Error, Handler, Middleware, MiddlewareStack, Next,
    PathParams, RequestContext, Result, Stream,
};
use std::path::PathBuf;
use std::sync::Arc;

/// Router for managing and matching routes
#[derive(Debug)]
pub struct Router {
    /// Trie for each HTTP method
    tries: DashMap<Method, RouteTrie>,

    /// Global middleware chain; each append publishes a new snapshot
    middleware: ArcSwap<Vec<Arc<dyn Middleware>>>,

    /// Custom error responses
    catchers: Catchers,

    /// Request size limits
    limits: ParseLimits,
}

impl Router {
    /// Create a new router with default request limits
    pub fn new() -> Self {
        Self::with_limits(ParseLimits::default())
    }

    /// Create a new router with explicit request limits
    pub fn with_limits(limits: ParseLimits) -> Self {
        Self {
            tries: DashMap::new(),
            middleware: ArcSwap::from_pointee(Vec::new()),
            catchers: Catchers::new(),
            limits,
        }
    }

    /// Request limits applied while parsing
    pub fn limits(&self) -> ParseLimits {
        self.limits
    }

    /// Add a route
    pub fn add_route(&self, route: Route) -> Result<()> {
        let method = route.method.clone();
        let path = route.path.clone();

        self.tries
            .entry(method.clone())
            .or_insert_with(RouteTrie::new)
            .insert(route)?;

        tracing::debug!(method = %method, path = %path, "Route added to router");

        Ok(())
    }

    /// Register a handler for a method and path
    pub fn route(&self, method: Method, path: &str, handler: impl Handler + 'static) -> Result<()> {
        self.add_route(
            Route::builder()
                .method(method)
                .path(path)
                .handler(handler)
                .build()?,
        )
    }

    /// Register a GET handler
    pub fn get(&self, path: &str, handler: impl Handler + 'static) -> Result<()> {
        self.route(Method::GET, path, handler)
    }

    /// Register a POST handler
    pub fn post(&self, path: &str, handler: impl Handler + 'static) -> Result<()> {
        self.route(Method::POST, path, handler)
    }

    /// Register a PUT handler
    pub fn put(&self, path: &str, handler: impl Handler + 'static) -> Result<()> {
        self.route(Method::PUT, path, handler)
    }

    /// Register a DELETE handler
    pub fn delete(&self, path: &str, handler: impl Handler + 'static) -> Result<()> {
        self.route(Method::DELETE, path, handler)
    }

    /// Match a request against the route table
    ///
    /// A path registered only under other methods yields
    /// [`DispatchError::MethodNotAllowed`]; an unknown path yields
    /// [`DispatchError::NotFound`].
    pub fn match_route(&self, method: &Method, path: &str) -> Result<Match, DispatchError> {
        let found = self
            .tries
            .get(method)
            .and_then(|trie| trie.match_path(path));

        if let Some(matched) = found {
            return Ok(matched);
        }

        if self.allowed_methods(path).is_empty() {
            Err(DispatchError::NotFound)
        } else {
            Err(DispatchError::MethodNotAllowed)
        }
    }

    /// Methods that have a route matching `path`
    pub fn allowed_methods(&self, path: &str) -> Vec<Method> {
        self.tries
            .iter()
            .filter(|entry| entry.value().match_path(path).is_some())
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Append middleware to the global chain
    pub fn use_middleware(&self, middleware: Arc<dyn Middleware>) {
        self.middleware.rcu(|current| {
            let mut chain = Vec::clone(current);
            chain.push(Arc::clone(&middleware));
            chain
        });
        tracing::debug!(middleware = ?middleware, "Middleware added to router");
    }

    /// Snapshot of the global chain
    pub fn middleware(&self) -> MiddlewareStack {
        self.middleware.load_full()
    }

    /// Serve a single file at `path`
    pub fn static_file(&self, path: &str, file: impl Into<PathBuf>) -> Result<()> {
        let file = file.into();
        tracing::debug!(path = %path, file = %file.display(), "Mounting static file");
        self.get(path, static_files::file_handler(file))
    }

    /// Serve the tree below `dir` under the `prefix` path
    pub fn static_dir(&self, prefix: &str, dir: impl Into<PathBuf>) -> Result<()> {
        let dir = dir.into();
        if !dir.is_dir() {
            return Err(Error::Config(format!(
                "static directory does not exist: {}",
                dir.display()
            )));
        }

        let base = prefix.trim_end_matches('/');
        let root_path = if base.is_empty() { "/" } else { base };

        tracing::debug!(prefix = %root_path, dir = %dir.display(), "Mounting static directory");

        self.get(root_path, static_files::dir_handler(dir.clone()))?;
        self.get(&format!("{base}/*filepath"), static_files::dir_handler(dir))
    }

    /// Custom error responses
    pub fn catchers(&self) -> &Catchers {
        &self.catchers
    }

    /// Get route count for a method
    pub fn route_count(&self, method: &Method) -> usize {
        self.tries.get(method).map(|trie| trie.len()).unwrap_or(0)
    }

    /// Get total route count across all methods
    pub fn total_route_count(&self) -> usize {
        self.tries.iter().map(|entry| entry.value().len()).sum()
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatch for Router {
    fn handle_conn(
        &self,
        scope: &mut ConnectionScope,
        stream: &mut dyn Stream,
        buffer: &[u8],
    ) -> Result<(), DispatchError> {
        let mut request = parser::read_request(scope, stream, buffer, &self.limits)?;

        let matched = self.match_route(request.method(), request.uri().path())?;

        let mut ctx = RequestContext::new(scope.id().to_string());
        ctx.params = PathParams::new(matched.params);
        ctx.route = Some(matched.route.path.clone());
        ctx.wildcard = matched.wildcard;
        request.extensions_mut().insert(ctx);

        let method = request.method().clone();
        let path = request.uri().path().to_string();

        let next = Next::with_handler(self.middleware(), Arc::clone(&matched.route.handler));
        let response = match next.run(request) {
            Ok(response) => response,
            Err(Error::NotFound(what)) => {
                tracing::debug!(path = %path, resource = %what, "Handler reported missing resource");
                return Err(DispatchError::NotFound);
            }
            Err(e) => return Err(e.into()),
        };

        write_response(stream, &response)?;

        tracing::debug!(
            method = %method,
            path = %path,
            status = response.status().as_u16(),
            "Request handled"
        );

        Ok(())
    }
}
