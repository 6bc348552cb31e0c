//! Router failure to HTTP response mapping

use quay_core::response::{write_response, write_status};
use quay_core::{DispatchError, Result};
use quay_router::Catchers;
use std::io::Write;

/// Write the response for a router failure onto `out`.
///
/// `NotFound` and `MethodNotAllowed` are fully handled here. Any other failure
/// is answered with 500 and handed back to the caller for logging. Writing is
/// best-effort: if the peer is gone the error response is dropped.
pub fn map_error<W: Write + ?Sized>(
    out: &mut W,
    err: DispatchError,
    catchers: &Catchers,
) -> Result<()> {
    let status = err.status();

    let written = match catchers.render(status) {
        Some(response) => write_response(out, &response),
        None => write_status(out, status),
    };

    if let Err(e) = written {
        tracing::trace!(
            status = status.as_u16(),
            error = %e,
            "Could not write error response, abandoning connection"
        );
    }

    match err {
        DispatchError::NotFound | DispatchError::MethodNotAllowed => Ok(()),
        DispatchError::Other(e) => Err(e),
    }
}
