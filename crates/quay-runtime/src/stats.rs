//! Engine counters

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters updated by the accept loops
#[derive(Debug, Default)]
pub struct EngineStats {
    workers_spawned: AtomicU64,
    workers_exited: AtomicU64,
    connections_accepted: AtomicU64,
    connections_served: AtomicU64,
    connections_discarded: AtomicU64,
    not_found: AtomicU64,
    method_not_allowed: AtomicU64,
    internal_errors: AtomicU64,
}

/// Point-in-time copy of [`EngineStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Worker threads started
    pub workers_spawned: u64,
    /// Worker threads that left their accept loop
    pub workers_exited: u64,
    /// Connections returned by accept
    pub connections_accepted: u64,
    /// Connections the router answered successfully
    pub connections_served: u64,
    /// Connections closed after a zero-byte or failed read
    pub connections_discarded: u64,
    /// Requests answered with 404
    pub not_found: u64,
    /// Requests answered with 405
    pub method_not_allowed: u64,
    /// Requests answered with 500
    pub internal_errors: u64,
}

impl EngineStats {
    /// Create zeroed counters
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn worker_spawned(&self) {
        self.workers_spawned.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn worker_exited(&self) {
        self.workers_exited.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn connection_accepted(&self) {
        self.connections_accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn connection_served(&self) {
        self.connections_served.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn connection_discarded(&self) {
        self.connections_discarded.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn error_mapped(&self, status: http::StatusCode) {
        let counter = match status {
            http::StatusCode::NOT_FOUND => &self.not_found,
            http::StatusCode::METHOD_NOT_ALLOWED => &self.method_not_allowed,
            _ => &self.internal_errors,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Read all counters
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            workers_spawned: self.workers_spawned.load(Ordering::Relaxed),
            workers_exited: self.workers_exited.load(Ordering::Relaxed),
            connections_accepted: self.connections_accepted.load(Ordering::Relaxed),
            connections_served: self.connections_served.load(Ordering::Relaxed),
            connections_discarded: self.connections_discarded.load(Ordering::Relaxed),
            not_found: self.not_found.load(Ordering::Relaxed),
            method_not_allowed: self.method_not_allowed.load(Ordering::Relaxed),
            internal_errors: self.internal_errors.load(Ordering::Relaxed),
        }
    }
}
