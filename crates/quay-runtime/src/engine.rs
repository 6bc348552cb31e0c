//! Engine facade

use crate::connection::ConnectionSizes;
use crate::shutdown::ShutdownCoordinator;
use crate::stats::{EngineStats, StatsSnapshot};
use crate::worker::{AcceptContext, WorkerConfig, WorkerPool};
use crate::RuntimeState;
use parking_lot::Mutex;
use quay_config::{validate_engine, EngineConfig};
use quay_core::{Error, Middleware, Result};
use quay_router::{Catchers, ParseLimits, Router};
use std::net::{SocketAddr, TcpListener, ToSocketAddrs};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, ThreadId};
use std::time::Duration;

/// Embeddable HTTP engine
///
/// Owns the listening socket, a fixed pool of worker threads and the router
/// they dispatch to. An engine is single-use: it starts accepting in
/// [`Engine::create`] and stops for good after [`Engine::shutdown`].
pub struct Engine {
    config: EngineConfig,
    local_addr: SocketAddr,
    listener: Mutex<Option<TcpListener>>,
    pool: Mutex<Option<WorkerPool>>,
    worker_ids: Vec<ThreadId>,
    router: Arc<Router>,
    shutdown: Arc<ShutdownCoordinator>,
    stats: Arc<EngineStats>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("local_addr", &self.local_addr)
            .field("num_threads", &self.config.num_threads)
            .field("state", &self.shutdown.state())
            .field("middleware_count", &self.router.middleware().len())
            .finish()
    }
}

impl Engine {
    /// Bind the listener and start `num_threads` workers.
    ///
    /// Fails if the configuration is invalid, the address does not resolve or
    /// the socket cannot be bound.
    pub fn create(config: EngineConfig) -> Result<Self> {
        validate_engine(&config)?;

        let addr = resolve(&config.address, config.port)?;
        let listener = TcpListener::bind(addr).map_err(|source| Error::Bind { addr, source })?;
        let local_addr = listener.local_addr()?;

        let router = Arc::new(Router::with_limits(ParseLimits {
            max_head: config.header_buffer_size,
            max_body: config.body_buffer_size,
        }));
        let shutdown = Arc::new(ShutdownCoordinator::new(local_addr, config.nudge_timeout));
        let stats = Arc::new(EngineStats::new());

        let ctx = Arc::new(AcceptContext {
            router: Arc::clone(&router),
            shutdown: Arc::clone(&shutdown),
            stats: Arc::clone(&stats),
            sizes: ConnectionSizes {
                read_buffer: config.read_buffer_size,
                scope_capacity: config.scope_capacity(),
            },
            read_timeout: config.read_timeout,
        });

        let pool = WorkerPool::spawn(&WorkerConfig::from(&config), &listener, ctx)?;
        let worker_ids = pool.thread_ids();
        shutdown.mark_running();

        tracing::info!(
            address = %local_addr,
            threads = config.num_threads,
            "Engine listening"
        );

        Ok(Self {
            config,
            local_addr,
            listener: Mutex::new(Some(listener)),
            pool: Mutex::new(Some(pool)),
            worker_ids,
            router,
            shutdown,
            stats,
        })
    }

    /// Block until shutdown has completed. Does not accept connections itself.
    pub fn run(&self) {
        tracing::debug!(address = %self.local_addr, "Waiting for engine to stop");
        self.shutdown.wait();
    }

    /// Block until shutdown has completed, without requesting it
    pub fn wait(&self) {
        self.shutdown.wait();
    }

    /// Block until shutdown has completed or `timeout` elapses.
    /// Returns whether the engine stopped.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        self.shutdown.wait_timeout(timeout)
    }

    /// Sleep for `delay`, then stop accepting, join the workers and close the
    /// listener. Calls after the first are no-ops.
    pub fn shutdown(&self, delay: Duration) {
        if !delay.is_zero() {
            thread::sleep(delay);
        }

        if self.shutdown.is_stopped() {
            tracing::debug!("Shutdown already complete");
            return;
        }

        self.teardown();
    }

    /// Stop the engine if still running and release it
    pub fn destroy(self) {
        self.teardown();
    }

    fn teardown(&self) {
        self.shutdown.begin();

        let on_worker = self.worker_ids.contains(&thread::current().id());
        let mut pool = if on_worker {
            // The thread holding the lock may be joining us
            match self.pool.try_lock() {
                Some(pool) => pool,
                None => return,
            }
        } else {
            self.pool.lock()
        };

        let Some(workers) = pool.take() else {
            return;
        };

        // Nudges must land before the listener closes
        self.shutdown.nudge(workers.live());

        if self.listener.lock().take().is_some() {
            tracing::debug!(address = %self.local_addr, "Listener closed");
        }

        workers.join();
        self.shutdown.finish();
    }

    /// Append middleware to the router's global chain, after anything
    /// already registered there.
    ///
    /// Intended for setup before traffic arrives; requests already in flight
    /// keep the chain they started with.
    pub fn use_middleware<I>(&self, handlers: I)
    where
        I: IntoIterator<Item = Arc<dyn Middleware>>,
    {
        for handler in handlers {
            self.router.use_middleware(handler);
        }
    }

    /// Serve a single file at `path`
    pub fn static_file(&self, path: &str, file: impl Into<PathBuf>) -> Result<()> {
        self.router.static_file(path, file)
    }

    /// Serve the tree below `dir` under `path`
    pub fn static_dir(&self, path: &str, dir: impl Into<PathBuf>) -> Result<()> {
        self.router.static_dir(path, dir)
    }

    /// Bound port; resolved when an ephemeral port was requested
    pub fn port(&self) -> u16 {
        self.local_addr.port()
    }

    /// Bound socket address
    pub fn address(&self) -> SocketAddr {
        self.local_addr
    }

    /// Router for registering routes
    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Custom error responses
    pub fn catchers(&self) -> &Catchers {
        self.router.catchers()
    }

    /// Configuration the engine was created with
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Current lifecycle state
    pub fn state(&self) -> RuntimeState {
        self.shutdown.state()
    }

    /// Whether shutdown has been requested
    pub fn is_stopping(&self) -> bool {
        self.shutdown.is_stopping()
    }

    /// Whether shutdown has completed
    pub fn is_stopped(&self) -> bool {
        self.shutdown.is_stopped()
    }

    /// Counters since creation
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        if !self.shutdown.is_stopped() {
            self.teardown();
        }
    }
}

fn resolve(address: &str, port: u16) -> Result<SocketAddr> {
    (address, port)
        .to_socket_addrs()
        .map_err(|e| Error::InvalidAddress(format!("{address}:{port} ({e})")))?
        .next()
        .ok_or_else(|| Error::InvalidAddress(format!("{address}:{port}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve() {
        assert_eq!(
            resolve("127.0.0.1", 80).unwrap(),
            "127.0.0.1:80".parse::<SocketAddr>().unwrap()
        );
        assert!(resolve("::1", 0).unwrap().is_ipv6());
        assert!(matches!(
            resolve("not an address", 80),
            Err(Error::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_create_rejects_invalid_config() {
        let config = EngineConfig {
            num_threads: 0,
            port: 0,
            ..Default::default()
        };
        assert!(matches!(Engine::create(config), Err(Error::Config(_))));
    }
}
