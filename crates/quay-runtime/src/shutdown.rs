//! Shutdown coordination
//!
//! Workers park in a blocking `accept` with no timeout. Stopping them takes two
//! steps: raise the `stopping` flag, then open a throwaway connection to our
//! own listener for every worker still parked so each `accept` returns and the
//! worker sees the flag. The condition variable only wakes callers blocked in
//! [`ShutdownCoordinator::wait`]; it never takes part in cancelling `accept`.

use crate::RuntimeState;
use parking_lot::{Condvar, Mutex};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// One-shot `stopping`/`stopped` flags plus the self-connect nudge
#[derive(Debug)]
pub struct ShutdownCoordinator {
    stopping: AtomicBool,
    stopped: AtomicBool,
    state: Mutex<RuntimeState>,
    cond: Condvar,
    target: SocketAddr,
    nudge_timeout: Duration,
}

impl ShutdownCoordinator {
    /// Create a coordinator for a listener bound to `local_addr`
    pub fn new(local_addr: SocketAddr, nudge_timeout: Duration) -> Self {
        Self {
            stopping: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
            state: Mutex::new(RuntimeState::Initializing),
            cond: Condvar::new(),
            target: nudge_target(local_addr),
            nudge_timeout,
        }
    }

    /// Whether shutdown has been requested
    pub fn is_stopping(&self) -> bool {
        self.stopping.load(Ordering::SeqCst)
    }

    /// Whether teardown has completed
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Current lifecycle state
    pub fn state(&self) -> RuntimeState {
        *self.state.lock()
    }

    /// Address the nudge connects to
    pub fn target(&self) -> SocketAddr {
        self.target
    }

    pub(crate) fn mark_running(&self) {
        let mut state = self.state.lock();
        if *state == RuntimeState::Initializing {
            *state = RuntimeState::Running;
        }
    }

    /// Raise `stopping`. Returns `true` for the call that raised it.
    pub fn begin(&self) -> bool {
        let first = !self.stopping.swap(true, Ordering::SeqCst);
        if first {
            *self.state.lock() = RuntimeState::ShuttingDown;
            tracing::info!("Shutdown requested");
        }
        first
    }

    /// Open and immediately drop `count` connections to the listener.
    ///
    /// Each one releases at most one worker parked in `accept`. Returns how
    /// many connections were established.
    pub fn nudge(&self, count: usize) -> usize {
        let mut delivered = 0;

        for _ in 0..count {
            match TcpStream::connect_timeout(&self.target, self.nudge_timeout) {
                Ok(stream) => {
                    drop(stream);
                    delivered += 1;
                }
                Err(e) => {
                    tracing::warn!(
                        target_addr = %self.target,
                        error = %e,
                        "Shutdown nudge failed to connect"
                    );
                }
            }
        }

        tracing::debug!(requested = count, delivered, "Shutdown nudges sent");
        delivered
    }

    /// Raise `stopped` and wake every waiter. Requires `stopping`.
    pub fn finish(&self) {
        debug_assert!(self.is_stopping(), "stopped raised before stopping");

        let mut state = self.state.lock();
        self.stopped.store(true, Ordering::SeqCst);
        *state = RuntimeState::Stopped;
        self.cond.notify_all();

        tracing::info!("Shutdown complete");
    }

    /// Block until `stopped` is raised
    pub fn wait(&self) {
        let mut state = self.state.lock();
        while !self.is_stopped() {
            self.cond.wait(&mut state);
        }
    }

    /// Block until `stopped` is raised or `timeout` elapses.
    /// Returns whether the engine stopped.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let mut state = self.state.lock();
        if !self.is_stopped() {
            let _ = self
                .cond
                .wait_while_for(&mut state, |_| !self.is_stopped(), timeout);
        }
        self.is_stopped()
    }
}

/// Unspecified bind addresses cannot be connected to; use loopback instead.
fn nudge_target(local_addr: SocketAddr) -> SocketAddr {
    let ip = match local_addr.ip() {
        IpAddr::V4(ip) if ip.is_unspecified() => IpAddr::V4(Ipv4Addr::LOCALHOST),
        IpAddr::V6(ip) if ip.is_unspecified() => IpAddr::V6(Ipv6Addr::LOCALHOST),
        ip => ip,
    };
    SocketAddr::new(ip, local_addr.port())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use std::sync::Arc;
    use std::thread;

    fn coordinator() -> ShutdownCoordinator {
        ShutdownCoordinator::new("127.0.0.1:9".parse().unwrap(), Duration::from_millis(200))
    }

    #[test]
    fn test_flags_are_one_shot() {
        let shutdown = coordinator();
        assert_eq!(shutdown.state(), RuntimeState::Initializing);
        shutdown.mark_running();
        assert_eq!(shutdown.state(), RuntimeState::Running);

        assert!(shutdown.begin());
        assert!(!shutdown.begin());
        assert!(shutdown.is_stopping());
        assert!(!shutdown.is_stopped());
        assert_eq!(shutdown.state(), RuntimeState::ShuttingDown);

        shutdown.finish();
        assert!(shutdown.is_stopped());
        assert_eq!(shutdown.state(), RuntimeState::Stopped);

        // Late transitions never move the state backwards
        shutdown.mark_running();
        assert_eq!(shutdown.state(), RuntimeState::Stopped);
    }

    #[test]
    fn test_nudge_target_maps_unspecified() {
        assert_eq!(
            nudge_target("0.0.0.0:8080".parse().unwrap()),
            "127.0.0.1:8080".parse().unwrap()
        );
        assert_eq!(
            nudge_target("[::]:8080".parse().unwrap()),
            "[::1]:8080".parse().unwrap()
        );
        assert_eq!(
            nudge_target("10.1.2.3:80".parse().unwrap()),
            "10.1.2.3:80".parse().unwrap()
        );
    }

    #[test]
    fn test_nudge_releases_blocked_accept() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let shutdown = ShutdownCoordinator::new(
            listener.local_addr().unwrap(),
            Duration::from_secs(1),
        );

        let acceptor = thread::spawn(move || listener.accept().is_ok());

        assert_eq!(shutdown.nudge(1), 1);
        assert!(acceptor.join().unwrap());
    }

    #[test]
    fn test_wait_wakes_on_finish() {
        let shutdown = Arc::new(coordinator());

        let waiter = {
            let shutdown = Arc::clone(&shutdown);
            thread::spawn(move || shutdown.wait())
        };

        assert!(!shutdown.wait_timeout(Duration::from_millis(20)));

        shutdown.begin();
        shutdown.finish();
        waiter.join().unwrap();

        assert!(shutdown.wait_timeout(Duration::ZERO));
    }
}
