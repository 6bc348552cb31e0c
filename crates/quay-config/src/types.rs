//! Configuration types

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Engine configuration
    #[serde(default)]
    pub engine: EngineConfig,

    /// Static file and directory mounts
    #[serde(default)]
    pub statics: Vec<StaticMount>,

    /// Observability
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Engine configuration bundle
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Host or IP to listen on
    pub address: String,

    /// Port to listen on (0 = ephemeral)
    pub port: u16,

    /// Worker threads, each running its own accept loop
    pub num_threads: usize,

    /// Stack size of each worker thread (bytes)
    pub stack_size: usize,

    /// Size of the initial read performed on every connection (bytes)
    pub read_buffer_size: usize,

    /// Maximum size of a request head (bytes)
    pub header_buffer_size: usize,

    /// Maximum size of a request body (bytes)
    pub body_buffer_size: usize,

    /// Read timeout applied to accepted connections
    #[serde(with = "humantime_serde")]
    pub read_timeout: Option<Duration>,

    /// Connect timeout of the shutdown wake connection
    #[serde(with = "humantime_serde")]
    pub nudge_timeout: Duration,
}

/// Default listen host
pub const DEFAULT_ADDRESS: &str = "127.0.0.1";

/// Default listen port
pub const DEFAULT_PORT: u16 = 8080;

/// Default worker stack size (1 MiB)
pub const DEFAULT_STACK_SIZE: usize = 1024 * 1024;

/// Default initial read size
pub const DEFAULT_READ_BUFFER_SIZE: usize = 4096;

/// Default request head limit
pub const DEFAULT_HEADER_BUFFER_SIZE: usize = 8192;

/// Default request body limit (1 MiB)
pub const DEFAULT_BODY_BUFFER_SIZE: usize = 1024 * 1024;

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS.to_string(),
            port: DEFAULT_PORT,
            num_threads: num_cpus::get(),
            stack_size: DEFAULT_STACK_SIZE,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            header_buffer_size: DEFAULT_HEADER_BUFFER_SIZE,
            body_buffer_size: DEFAULT_BODY_BUFFER_SIZE,
            read_timeout: None,
            nudge_timeout: Duration::from_secs(1),
        }
    }
}

impl EngineConfig {
    /// Size of the per-connection scope region: initial read plus head growth
    pub fn scope_capacity(&self) -> usize {
        self.read_buffer_size + self.header_buffer_size
    }
}

/// Static content mount
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StaticMount {
    /// Serve one file at a fixed path
    File {
        /// Route path
        path: String,
        /// File on disk
        file: PathBuf,
    },
    /// Serve a directory tree below a path prefix
    Dir {
        /// Route prefix
        path: String,
        /// Directory on disk
        dir: PathBuf,
    },
}

impl StaticMount {
    /// Route path of the mount
    pub fn path(&self) -> &str {
        match self {
            StaticMount::File { path, .. } | StaticMount::Dir { path, .. } => path,
        }
    }
}

/// Observability configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,

    /// Log format (json, text)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}
