//! Custom error responses keyed by status code

use http::StatusCode;
use parking_lot::RwLock;
use quay_core::Response;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Builder for the response written in place of a bare error status
pub type Catcher = Arc<dyn Fn(StatusCode) -> Response + Send + Sync>;

/// Table of error catchers
///
/// When a catcher is registered for a status, the engine writes its response
/// instead of the default status-line-only reply.
#[derive(Default)]
pub struct Catchers {
    catchers: RwLock<HashMap<StatusCode, Catcher>>,
}

impl Catchers {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a catcher, replacing any previous one for the same status
    pub fn register<F>(&self, status: StatusCode, catcher: F)
    where
        F: Fn(StatusCode) -> Response + Send + Sync + 'static,
    {
        self.catchers.write().insert(status, Arc::new(catcher));
        tracing::debug!(status = status.as_u16(), "Catcher registered");
    }

    /// Render the response for a status, if a catcher exists
    pub fn render(&self, status: StatusCode) -> Option<Response> {
        let catcher = self.catchers.read().get(&status).cloned()?;
        let mut response = catcher(status);
        *response.status_mut() = status;
        Some(response)
    }

    /// Whether a catcher is registered for a status
    pub fn contains(&self, status: StatusCode) -> bool {
        self.catchers.read().contains_key(&status)
    }

    /// Number of registered catchers
    pub fn len(&self) -> usize {
        self.catchers.read().len()
    }

    /// Whether no catchers are registered
    pub fn is_empty(&self) -> bool {
        self.catchers.read().is_empty()
    }
}

impl fmt::Debug for Catchers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut statuses: Vec<u16> = self.catchers.read().keys().map(|s| s.as_u16()).collect();
        statuses.sort_unstable();
        f.debug_struct("Catchers").field("statuses", &statuses).finish()
    }
}
