//! Quay CLI

mod signal;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use quay_config::{load_config, Config, LoggingConfig, StaticMount};
use quay_runtime::Engine;
use std::future::Future;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "quay")]
#[command(about = "Quay HTTP engine", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the engine and serve until interrupted
    Serve {
        /// Path to configuration file
        #[arg(short, long, default_value = "quay.yaml")]
        config: PathBuf,

        /// Log level (trace, debug, info, warn, error); overrides the config file
        #[arg(short, long, env = "QUAY_LOG_LEVEL")]
        log_level: Option<String>,
    },

    /// Validate configuration file
    Validate {
        /// Path to configuration file
        #[arg(short, long, default_value = "quay.yaml")]
        config: PathBuf,
    },

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config, log_level } => {
            let path = config;
            let config = load_config(&path)
                .with_context(|| format!("failed to load {}", path.display()))?;

            let mut logging = config.observability.logging.clone();
            if let Some(level) = log_level {
                logging.level = level;
            }
            init_tracing(&logging)?;

            tracing::info!(config = %path.display(), "Configuration loaded");

            serve(config).await
        }

        Commands::Validate { config } => {
            tracing_subscriber::fmt().with_target(false).init();

            tracing::info!("Validating configuration: {}", config.display());

            match load_config(&config) {
                Ok(cfg) => {
                    tracing::info!("Configuration is valid");
                    tracing::info!("  Listen: {}:{}", cfg.engine.address, cfg.engine.port);
                    tracing::info!("  Threads: {}", cfg.engine.num_threads);
                    tracing::info!("  Static mounts: {}", cfg.statics.len());
                    Ok(())
                }
                Err(e) => {
                    tracing::error!("Configuration validation failed: {}", e);
                    std::process::exit(1);
                }
            }
        }

        Commands::Version => {
            println!("Quay HTTP engine");
            println!("Version: {}", env!("CARGO_PKG_VERSION"));
            println!("Rust version: {}", env!("CARGO_PKG_RUST_VERSION"));
            Ok(())
        }
    }
}

async fn serve(config: Config) -> Result<()> {
    let engine = Arc::new(Engine::create(config.engine)?);

    for mount in &config.statics {
        match mount {
            StaticMount::File { path, file } => engine.static_file(path, file.clone())?,
            StaticMount::Dir { path, dir } => engine.static_dir(path, dir.clone())?,
        }
    }

    tracing::info!(
        address = %engine.address(),
        statics = config.statics.len(),
        "Quay is serving"
    );

    tokio::spawn(stop_on_signal(signal::shutdown_signal(), Arc::clone(&engine)));

    let runner = Arc::clone(&engine);
    tokio::task::spawn_blocking(move || runner.run()).await?;

    let stats = engine.stats();
    tracing::info!(
        accepted = stats.connections_accepted,
        served = stats.connections_served,
        "Engine stopped"
    );

    Ok(())
}

/// Shut `engine` down once `signal` resolves.
///
/// If the signal handlers could not be installed the engine keeps serving.
async fn stop_on_signal<F>(signal: F, engine: Arc<Engine>)
where
    F: Future<Output = io::Result<()>>,
{
    if let Err(e) = signal.await {
        tracing::error!(error = %e, "Failed to install signal handlers, serving until killed");
        return;
    }

    // Joining workers blocks, keep it off the async workers
    if let Err(e) = tokio::task::spawn_blocking(move || engine.shutdown(Duration::ZERO)).await {
        tracing::error!(error = %e, "Shutdown task failed");
    }
}

fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .context("invalid log level")?;

    let registry = tracing_subscriber::registry().with(filter);

    match logging.format.as_str() {
        "json" => registry
            .with(tracing_subscriber::fmt::layer().json().with_target(false))
            .init(),
        _ => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_level(true),
            )
            .init(),
    }

    Ok(())
}
