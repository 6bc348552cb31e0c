//! Error types for the Quay engine

use std::net::SocketAddr;

/// Result type alias using [`Error`]
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Main error type for the Quay engine
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Listener could not be bound
    #[error("Failed to bind to {addr}: {source}")]
    Bind {
        /// Address that was requested
        addr: SocketAddr,
        /// Underlying socket error
        #[source]
        source: std::io::Error,
    },

    /// Listen address could not be resolved
    #[error("Invalid listen address '{0}'")]
    InvalidAddress(String),

    /// Worker thread could not be started
    #[error("Failed to spawn worker thread {index}: {source}")]
    Spawn {
        /// Worker index
        index: usize,
        /// Underlying OS error
        #[source]
        source: std::io::Error,
    },

    /// Invalid HTTP request
    #[error("Invalid HTTP request: {0}")]
    InvalidRequest(String),

    /// Request exceeded a configured size limit
    #[error("{what} exceeds limit of {limit} bytes")]
    TooLarge {
        /// Which part of the request overflowed
        what: &'static str,
        /// Configured limit
        limit: usize,
    },

    /// Requested resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Route handler failed
    #[error("Handler error: {0}")]
    Handler(String),

    /// Middleware error
    #[error("Middleware error: {0}")]
    Middleware(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("HTTP error: {0}")]
    HttpError(#[from] http::Error),

    /// Internal error (should not happen in production)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Convert error to HTTP status code
    pub fn to_status_code(&self) -> http::StatusCode {
        use http::StatusCode;
        match self {
            Error::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Error::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Create a handler error
    pub fn handler(message: impl Into<String>) -> Self {
        Error::Handler(message.into())
    }
}

/// Outcome classes a router may surface for a connection.
///
/// The accept loop maps these onto wire responses: `NotFound` to 404,
/// `MethodNotAllowed` to 405 and everything else to 500.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// No registered route matches the request path
    #[error("no route matches the request path")]
    NotFound,

    /// A route matches the path but not the request method
    #[error("method not allowed for the matched route")]
    MethodNotAllowed,

    /// Any other failure
    #[error(transparent)]
    Other(#[from] Error),
}

impl DispatchError {
    /// Status code written on the wire for this outcome
    pub fn status(&self) -> http::StatusCode {
        match self {
            DispatchError::NotFound => http::StatusCode::NOT_FOUND,
            DispatchError::MethodNotAllowed => http::StatusCode::METHOD_NOT_ALLOWED,
            DispatchError::Other(_) => http::StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<std::io::Error> for DispatchError {
    fn from(err: std::io::Error) -> Self {
        DispatchError::Other(Error::Io(err))
    }
}
