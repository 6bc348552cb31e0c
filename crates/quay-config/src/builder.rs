//! Configuration builder

use crate::types::{Config, EngineConfig, ObservabilityConfig, StaticMount};
use std::path::PathBuf;
use std::time::Duration;

/// Builder for constructing configuration programmatically
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    engine: EngineConfig,
    statics: Vec<StaticMount>,
    observability: ObservabilityConfig,
}

impl ConfigBuilder {
    /// Create a new configuration builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole engine section
    pub fn engine(mut self, engine: EngineConfig) -> Self {
        self.engine = engine;
        self
    }

    /// Set listen host
    pub fn address(mut self, address: impl Into<String>) -> Self {
        self.engine.address = address.into();
        self
    }

    /// Set listen port
    pub fn port(mut self, port: u16) -> Self {
        self.engine.port = port;
        self
    }

    /// Set worker thread count
    pub fn threads(mut self, num_threads: usize) -> Self {
        self.engine.num_threads = num_threads;
        self
    }

    /// Set worker stack size
    pub fn stack_size(mut self, stack_size: usize) -> Self {
        self.engine.stack_size = stack_size;
        self
    }

    /// Set read, header and body buffer sizes
    pub fn buffers(mut self, read: usize, header: usize, body: usize) -> Self {
        self.engine.read_buffer_size = read;
        self.engine.header_buffer_size = header;
        self.engine.body_buffer_size = body;
        self
    }

    /// Set the per-connection read timeout
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.engine.read_timeout = Some(timeout);
        self
    }

    /// Mount a single static file
    pub fn static_file(mut self, path: impl Into<String>, file: impl Into<PathBuf>) -> Self {
        self.statics.push(StaticMount::File {
            path: path.into(),
            file: file.into(),
        });
        self
    }

    /// Mount a static directory
    pub fn static_dir(mut self, path: impl Into<String>, dir: impl Into<PathBuf>) -> Self {
        self.statics.push(StaticMount::Dir {
            path: path.into(),
            dir: dir.into(),
        });
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> quay_core::Result<Config> {
        let config = Config {
            engine: self.engine,
            statics: self.statics,
            observability: self.observability,
        };

        crate::validator::validate_config(&config)?;

        Ok(config)
    }
}
