//! # Quay Core
//!
//! Core types, traits, and error handling for the Quay HTTP engine.
//!
//! This crate provides the foundational abstractions shared by the engine and
//! its router:
//! - Error types and the three-way dispatch outcome
//! - The [`Dispatch`] contract between accept loop and router
//! - Per-connection scoped allocation
//! - Middleware trait
//! - Request/response helpers

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod dispatch;
pub mod error;
pub mod middleware;
pub mod request;
pub mod response;
pub mod scope;

pub use dispatch::{Dispatch, Stream};
pub use error::{DispatchError, Error, Result};
pub use middleware::{from_fn, Handler, Middleware, MiddlewareStack, Next};
pub use request::{PathParams, RequestContext};
pub use response::ResponseBuilder;
pub use scope::ConnectionScope;

// Re-export commonly used HTTP types
pub use bytes::Bytes;
pub use http::{Method, StatusCode};

/// Request type flowing through middleware and handlers
pub type Request = http::Request<Bytes>;

/// Response type produced by middleware and handlers
pub type Response = http::Response<Bytes>;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::dispatch::{Dispatch, Stream};
    pub use crate::error::{DispatchError, Error, Result};
    pub use crate::middleware::{from_fn, Handler, Middleware, Next};
    pub use crate::request::{PathParams, RequestContext};
    pub use crate::response::{responses, ResponseBuilder};
    pub use crate::scope::ConnectionScope;
    pub use crate::{Request, Response};
}
