//! Middleware trait and utilities

use crate::{Error, Request, Response, Result};
use std::fmt;
use std::sync::Arc;

/// Final request handler at the end of a middleware chain
pub trait Handler: Send + Sync {
    /// Produce a response for the request
    fn call(&self, req: Request) -> Result<Response>;
}

impl<F> Handler for F
where
    F: Fn(Request) -> Result<Response> + Send + Sync,
{
    fn call(&self, req: Request) -> Result<Response> {
        self(req)
    }
}

/// Middleware trait for request/response processing
pub trait Middleware: Send + Sync + fmt::Debug {
    /// Process a request
    ///
    /// # Arguments
    ///
    /// * `req` - The parsed HTTP request
    /// * `next` - The next middleware/handler in the chain
    ///
    /// # Returns
    ///
    /// Returns the HTTP response or an error
    fn call(&self, req: Request, next: Next) -> Result<Response>;
}

/// Shared, immutable middleware chain
pub type MiddlewareStack = Arc<Vec<Arc<dyn Middleware>>>;

/// Represents the next middleware/handler in the chain
pub struct Next {
    middleware_stack: MiddlewareStack,
    index: usize,
    final_handler: Option<Arc<dyn Handler>>,
}

impl Next {
    /// Create a new Next from a middleware stack
    pub fn new(middleware_stack: MiddlewareStack) -> Self {
        Self {
            middleware_stack,
            index: 0,
            final_handler: None,
        }
    }

    /// Create a new Next with a final handler
    pub fn with_handler(middleware_stack: MiddlewareStack, handler: Arc<dyn Handler>) -> Self {
        Self {
            middleware_stack,
            index: 0,
            final_handler: Some(handler),
        }
    }

    /// Run the next middleware or final handler
    pub fn run(self, req: Request) -> Result<Response> {
        if let Some(middleware) = self.middleware_stack.get(self.index) {
            let next = Self {
                middleware_stack: Arc::clone(&self.middleware_stack),
                index: self.index + 1,
                final_handler: self.final_handler.clone(),
            };
            middleware.call(req, next)
        } else if let Some(handler) = self.final_handler {
            handler.call(req)
        } else {
            Err(Error::Internal(
                "Middleware chain completed without handler".to_string(),
            ))
        }
    }
}

impl Clone for Next {
    fn clone(&self) -> Self {
        Self {
            middleware_stack: Arc::clone(&self.middleware_stack),
            index: self.index,
            final_handler: self.final_handler.clone(),
        }
    }
}

impl fmt::Debug for Next {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next")
            .field("index", &self.index)
            .field("remaining", &(self.middleware_stack.len() - self.index))
            .finish()
    }
}

/// Middleware built from a closure
pub struct FnMiddleware<F> {
    name: &'static str,
    func: F,
}

impl<F> fmt::Debug for FnMiddleware<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnMiddleware")
            .field("name", &self.name)
            .finish()
    }
}

impl<F> Middleware for FnMiddleware<F>
where
    F: Fn(Request, Next) -> Result<Response> + Send + Sync,
{
    fn call(&self, req: Request, next: Next) -> Result<Response> {
        (self.func)(req, next)
    }
}

/// Wrap a closure as middleware
pub fn from_fn<F>(name: &'static str, func: F) -> Arc<dyn Middleware>
where
    F: Fn(Request, Next) -> Result<Response> + Send + Sync + 'static,
{
    Arc::new(FnMiddleware { name, func })
}
