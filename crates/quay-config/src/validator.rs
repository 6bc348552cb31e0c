//! Configuration validation

use crate::types::{Config, EngineConfig};
use quay_core::{Error, Result};

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    validate_engine(&config.engine)?;

    for mount in &config.statics {
        if !mount.path().starts_with('/') {
            return Err(Error::Config(format!(
                "static mount path must start with '/': {}",
                mount.path()
            )));
        }
    }

    Ok(())
}

/// Validate the engine section on its own
pub fn validate_engine(engine: &EngineConfig) -> Result<()> {
    if engine.address.trim().is_empty() {
        return Err(Error::Config("address cannot be empty".to_string()));
    }

    if engine.num_threads == 0 {
        return Err(Error::Config("num_threads must be >= 1".to_string()));
    }

    if engine.stack_size == 0 {
        return Err(Error::Config("stack_size must be > 0".to_string()));
    }

    if engine.read_buffer_size == 0 {
        return Err(Error::Config("read_buffer_size must be > 0".to_string()));
    }

    if engine.header_buffer_size == 0 {
        return Err(Error::Config("header_buffer_size must be > 0".to_string()));
    }

    if engine.body_buffer_size == 0 {
        return Err(Error::Config("body_buffer_size must be > 0".to_string()));
    }

    if engine.nudge_timeout.is_zero() {
        return Err(Error::Config("nudge_timeout must be > 0".to_string()));
    }

    if engine.header_buffer_size < engine.read_buffer_size {
        return Err(Error::Config(
            "header_buffer_size must be >= read_buffer_size".to_string(),
        ));
    }

    if engine.num_threads > 4 * num_cpus::get() {
        tracing::warn!(
            num_threads = engine.num_threads,
            cpus = num_cpus::get(),
            "num_threads is far above the CPU count"
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::*;

    fn minimal_config() -> Config {
        Config {
            engine: EngineConfig {
                num_threads: 2,
                ..Default::default()
            },
            statics: vec![],
            observability: ObservabilityConfig::default(),
        }
    }

    #[test]
    fn test_valid_minimal_config() {
        assert!(validate_config(&minimal_config()).is_ok());
    }

    #[test]
    fn test_zero_buffers() {
        let mut config = minimal_config();
        config.engine.read_buffer_size = 0;
        assert!(validate_config(&config).is_err());

        let mut config = minimal_config();
        config.engine.body_buffer_size = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_zero_nudge_timeout() {
        let mut config = minimal_config();
        config.engine.nudge_timeout = std::time::Duration::ZERO;

        assert!(matches!(
            validate_engine(&config.engine),
            Err(Error::Config(msg)) if msg.contains("nudge_timeout")
        ));
    }

    #[test]
    fn test_header_smaller_than_read() {
        let mut config = minimal_config();
        config.engine.read_buffer_size = 8192;
        config.engine.header_buffer_size = 1024;

        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_empty_address() {
        let mut config = minimal_config();
        config.engine.address = "  ".to_string();

        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_relative_static_path() {
        let mut config = minimal_config();
        config.statics.push(StaticMount::Dir {
            path: "assets".to_string(),
            dir: "./public".into(),
        });

        assert!(validate_config(&config).is_err());
    }
}
