//! Per-connection scoped allocation
//!
//! Every accepted connection gets a fresh [`ConnectionScope`]: one up-front
//! allocation that buffers are carved out of with a bump pointer. Dropping the
//! scope (and the buffers handed out from it) releases the whole region, so
//! nothing allocated for a connection outlives it.

use bytes::BytesMut;
use uuid::Uuid;

/// Bump region owned by a single connection
#[derive(Debug)]
pub struct ConnectionScope {
    id: Uuid,
    region: BytesMut,
    capacity: usize,
    allocated: usize,
    spilled: usize,
}

impl ConnectionScope {
    /// Create a scope backed by a region of `capacity` bytes
    pub fn new(capacity: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            region: BytesMut::with_capacity(capacity),
            capacity,
            allocated: 0,
            spilled: 0,
        }
    }

    /// Identifier used to correlate log lines for this connection
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Carve a zeroed buffer of `len` bytes out of the region.
    ///
    /// Once the region is exhausted further buffers are allocated on their own;
    /// they are still released together with the connection.
    pub fn alloc(&mut self, len: usize) -> BytesMut {
        self.allocated += len;

        if self.region.capacity() - self.region.len() >= len {
            self.region.resize(len, 0);
            return self.region.split_to(len);
        }

        self.spilled += len;
        tracing::trace!(
            connection = %self.id,
            len,
            capacity = self.capacity,
            "Scope region exhausted, spilling allocation"
        );
        BytesMut::zeroed(len)
    }

    /// Total bytes handed out by this scope
    pub fn allocated(&self) -> usize {
        self.allocated
    }

    /// Bytes that did not fit in the region
    pub fn spilled(&self) -> usize {
        self.spilled
    }

    /// Bytes still available in the region
    pub fn remaining(&self) -> usize {
        self.region.capacity() - self.region.len()
    }

    /// Size of the region this scope was created with
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
