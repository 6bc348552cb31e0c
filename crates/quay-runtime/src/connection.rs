//! Single-connection handling

use crate::error_mapper::map_error;
use http::StatusCode;
use quay_core::{ConnectionScope, Dispatch, Error, Stream};
use quay_router::Catchers;

/// Buffer sizes used for each connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionSizes {
    /// Size of the initial read
    pub read_buffer: usize,

    /// Capacity of the scope region
    pub scope_capacity: usize,
}

/// What happened to a connection
#[derive(Debug)]
pub enum ConnectionOutcome {
    /// The router wrote a response
    Served,
    /// Nothing was read; the connection was closed without a response
    Discarded,
    /// A 404 or 405 response was written
    Mapped(StatusCode),
    /// A 500 response was written; carries the router's error
    Failed(Error),
}

/// Run one pass over an accepted connection.
///
/// Every buffer comes from a fresh [`ConnectionScope`] which is dropped before
/// this returns, whatever the outcome.
pub fn handle_connection(
    dispatcher: &dyn Dispatch,
    catchers: &Catchers,
    stream: &mut dyn Stream,
    sizes: ConnectionSizes,
) -> ConnectionOutcome {
    let mut scope = ConnectionScope::new(sizes.scope_capacity);
    let mut buffer = scope.alloc(sizes.read_buffer);

    let read = match stream.read(&mut buffer) {
        Ok(0) => {
            tracing::trace!(connection = %scope.id(), "Peer sent no data");
            return ConnectionOutcome::Discarded;
        }
        Ok(n) => n,
        Err(e) => {
            tracing::debug!(connection = %scope.id(), error = %e, "Initial read failed");
            return ConnectionOutcome::Discarded;
        }
    };

    let outcome = match dispatcher.handle_conn(&mut scope, stream, &buffer[..read]) {
        Ok(()) => ConnectionOutcome::Served,
        Err(err) => {
            let status = err.status();
            match map_error(stream, err, catchers) {
                Ok(()) => ConnectionOutcome::Mapped(status),
                Err(e) => ConnectionOutcome::Failed(e),
            }
        }
    };

    tracing::trace!(
        connection = %scope.id(),
        allocated = scope.allocated(),
        spilled = scope.spilled(),
        "Connection scope released"
    );

    outcome
}
