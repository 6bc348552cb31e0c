//! Worker thread management

use crate::connection::{handle_connection, ConnectionOutcome, ConnectionSizes};
use crate::shutdown::ShutdownCoordinator;
use crate::stats::EngineStats;
use quay_config::EngineConfig;
use quay_core::{Error, Result};
use quay_router::Router;
use std::io::{self, ErrorKind};
use std::net::TcpListener;
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};
use std::time::Duration;

/// Worker pool configuration
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Number of worker threads
    pub threads: usize,

    /// Thread stack size
    pub stack_size: usize,

    /// Thread name prefix
    pub thread_name: String,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        let engine = EngineConfig::default();
        Self {
            threads: engine.num_threads,
            stack_size: engine.stack_size,
            thread_name: "quay-worker".to_string(),
        }
    }
}

impl From<&EngineConfig> for WorkerConfig {
    fn from(config: &EngineConfig) -> Self {
        Self {
            threads: config.num_threads,
            stack_size: config.stack_size,
            thread_name: "quay-worker".to_string(),
        }
    }
}

/// State shared by every accept loop
#[derive(Debug)]
pub struct AcceptContext {
    /// Router answering accepted connections
    pub router: Arc<Router>,

    /// Shutdown flags
    pub shutdown: Arc<ShutdownCoordinator>,

    /// Engine counters
    pub stats: Arc<EngineStats>,

    /// Per-connection buffer sizes
    pub sizes: ConnectionSizes,

    /// Read timeout applied to accepted streams
    pub read_timeout: Option<Duration>,
}

/// Fixed set of OS threads running [`accept_loop`]
#[derive(Debug)]
pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `config.threads` workers, each with its own handle to `listener`.
    ///
    /// If any spawn fails, workers already started are stopped and joined
    /// before the error is returned.
    pub fn spawn(
        config: &WorkerConfig,
        listener: &TcpListener,
        ctx: Arc<AcceptContext>,
    ) -> Result<Self> {
        let mut pool = Self {
            handles: Vec::with_capacity(config.threads),
        };

        for index in 0..config.threads {
            if let Err(e) = pool.spawn_one(index, config, listener, &ctx) {
                tracing::error!(index, error = %e, "Failed to start worker, stopping pool");
                ctx.shutdown.begin();
                ctx.shutdown.nudge(pool.live());
                pool.join();
                return Err(e);
            }
        }

        tracing::info!(
            threads = config.threads,
            stack_size = config.stack_size,
            "Worker pool started"
        );

        Ok(pool)
    }

    fn spawn_one(
        &mut self,
        index: usize,
        config: &WorkerConfig,
        listener: &TcpListener,
        ctx: &Arc<AcceptContext>,
    ) -> Result<()> {
        let listener = listener
            .try_clone()
            .map_err(|source| Error::Spawn { index, source })?;
        let ctx = Arc::clone(ctx);

        let handle = thread::Builder::new()
            .name(format!("{}-{}", config.thread_name, index))
            .stack_size(config.stack_size)
            .spawn(move || accept_loop(index, listener, ctx))
            .map_err(|source| Error::Spawn { index, source })?;

        self.handles.push(handle);
        Ok(())
    }

    /// Number of spawned workers
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Whether the pool has no workers
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Workers whose thread has not finished yet
    pub fn live(&self) -> usize {
        self.handles.iter().filter(|h| !h.is_finished()).count()
    }

    /// Thread ids of all workers
    pub fn thread_ids(&self) -> Vec<ThreadId> {
        self.handles.iter().map(|h| h.thread().id()).collect()
    }

    /// Join every worker except the calling thread. Returns the number joined.
    pub fn join(self) -> usize {
        let current = thread::current().id();
        let mut joined = 0;

        for handle in self.handles {
            if handle.thread().id() == current {
                tracing::debug!("Skipping join of the calling worker thread");
                continue;
            }

            let name = handle.thread().name().unwrap_or("worker").to_string();
            match handle.join() {
                Ok(()) => joined += 1,
                Err(_) => tracing::error!(worker = %name, "Worker thread panicked"),
            }
        }

        tracing::debug!(joined, "Worker threads joined");
        joined
    }
}

/// Accept failures that leave the listener usable
fn is_transient(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        ErrorKind::ConnectionAborted
            | ErrorKind::ConnectionReset
            | ErrorKind::Interrupted
            | ErrorKind::WouldBlock
    )
}

/// Body of every worker thread.
///
/// Loops until `stopping` is observed or accept fails for good. Each worker
/// consumes at most one connection after `stopping` is raised and drops it
/// unprocessed.
pub fn accept_loop(index: usize, listener: TcpListener, ctx: Arc<AcceptContext>) {
    ctx.stats.worker_spawned();
    tracing::debug!(worker = index, "Worker started");

    while !ctx.shutdown.is_stopping() {
        let accepted = listener.accept();

        if ctx.shutdown.is_stopping() {
            break;
        }

        let (mut stream, peer) = match accepted {
            Ok(pair) => pair,
            Err(e) if is_transient(&e) => {
                tracing::debug!(worker = index, error = %e, "Transient accept failure, retrying");
                continue;
            }
            Err(e) => {
                tracing::warn!(worker = index, error = %e, "Accept failed, worker exiting");
                break;
            }
        };

        ctx.stats.connection_accepted();
        tracing::trace!(worker = index, peer = %peer, "Connection accepted");

        if let Some(timeout) = ctx.read_timeout {
            if let Err(e) = stream.set_read_timeout(Some(timeout)) {
                tracing::debug!(worker = index, error = %e, "Failed to set read timeout");
            }
        }

        let router: &Router = &ctx.router;
        match handle_connection(router, router.catchers(), &mut stream, ctx.sizes) {
            ConnectionOutcome::Served => ctx.stats.connection_served(),
            ConnectionOutcome::Discarded => {
                ctx.stats.connection_discarded();
                tracing::trace!(worker = index, peer = %peer, "Connection discarded");
            }
            ConnectionOutcome::Mapped(status) => {
                ctx.stats.error_mapped(status);
                tracing::debug!(
                    worker = index,
                    peer = %peer,
                    status = status.as_u16(),
                    "Router failure mapped to response"
                );
            }
            ConnectionOutcome::Failed(e) => {
                ctx.stats.error_mapped(http::StatusCode::INTERNAL_SERVER_ERROR);
                tracing::error!(worker = index, peer = %peer, error = %e, "Request failed");
            }
        }
    }

    ctx.stats.worker_exited();
    tracing::debug!(worker = index, "Worker exited");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worker_config_from_engine() {
        let engine = EngineConfig {
            num_threads: 3,
            stack_size: 256 * 1024,
            ..Default::default()
        };
        let config = WorkerConfig::from(&engine);

        assert_eq!(config.threads, 3);
        assert_eq!(config.stack_size, 256 * 1024);
        assert_eq!(config.thread_name, "quay-worker");
    }

    #[test]
    fn test_transient_errors() {
        assert!(is_transient(&io::Error::from(ErrorKind::ConnectionAborted)));
        assert!(is_transient(&io::Error::from(ErrorKind::Interrupted)));
        assert!(!is_transient(&io::Error::from(ErrorKind::InvalidInput)));
    }

    #[test]
    fn test_pool_spawn_and_stop() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let shutdown = Arc::new(ShutdownCoordinator::new(
            listener.local_addr().unwrap(),
            Duration::from_secs(1),
        ));
        let stats = Arc::new(EngineStats::new());
        let ctx = Arc::new(AcceptContext {
            router: Arc::new(Router::new()),
            shutdown: Arc::clone(&shutdown),
            stats: Arc::clone(&stats),
            sizes: ConnectionSizes {
                read_buffer: 1024,
                scope_capacity: 4096,
            },
            read_timeout: None,
        });

        let config = WorkerConfig {
            threads: 3,
            stack_size: 256 * 1024,
            thread_name: "test-worker".to_string(),
        };
        let pool = WorkerPool::spawn(&config, &listener, ctx).unwrap();
        assert_eq!(pool.len(), 3);
        assert_eq!(pool.thread_ids().len(), 3);

        shutdown.begin();
        shutdown.nudge(pool.live());
        assert_eq!(pool.join(), 3);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.workers_spawned, 3);
        assert_eq!(snapshot.workers_exited, 3);
        // Nudge connections are never processed
        assert_eq!(snapshot.connections_accepted, 0);
    }
}
