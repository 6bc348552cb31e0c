//! Contract between the accept loop and the router

use crate::error::DispatchError;
use crate::scope::ConnectionScope;
use std::io::{Read, Write};

/// Byte stream a router reads requests from and writes responses to.
///
/// Implemented for everything that is `Read + Write + Send`, so the engine
/// passes accepted `TcpStream`s while tests can pass in-memory buffers.
pub trait Stream: Read + Write + Send {}

impl<T: Read + Write + Send> Stream for T {}

/// Per-connection entry point of a router.
///
/// `buffer` holds the bytes from the engine's initial read. On `Ok(())` the
/// response has already been written to `stream`; on error nothing is assumed
/// about the stream and the caller writes the mapped error response.
pub trait Dispatch: Send + Sync {
    /// Handle one accepted connection
    fn handle_conn(
        &self,
        scope: &mut ConnectionScope,
        stream: &mut dyn Stream,
        buffer: &[u8],
    ) -> Result<(), DispatchError>;
}
