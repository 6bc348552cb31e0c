//! # Quay Runtime
//!
//! Connection-accepting core of the Quay HTTP engine:
//! - Listener ownership and ephemeral port resolution
//! - Fixed pool of OS worker threads running blocking accept loops
//! - Per-connection scoped buffers and a single bounded initial read
//! - Mapping of router failures onto 404/405/500 responses
//! - Shutdown that wakes parked workers with a self-connect nudge

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod connection;
pub mod engine;
pub mod error_mapper;
pub mod shutdown;
pub mod stats;
pub mod worker;

pub use connection::{ConnectionOutcome, ConnectionSizes};
pub use engine::Engine;
pub use error_mapper::map_error;
pub use shutdown::ShutdownCoordinator;
pub use stats::{EngineStats, StatsSnapshot};
pub use worker::{AcceptContext, WorkerConfig, WorkerPool};

/// Runtime state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeState {
    /// Engine is binding and spawning workers
    Initializing,
    /// Workers are accepting connections
    Running,
    /// Shutdown was requested and teardown is in progress
    ShuttingDown,
    /// All workers joined and the listener is closed
    Stopped,
}

/// Re-export commonly used types
pub mod prelude {
    pub use crate::engine::Engine;
    pub use crate::stats::StatsSnapshot;
    pub use crate::RuntimeState;
}
