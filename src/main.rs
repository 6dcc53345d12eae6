//! authcore (v1)
//!
//! The request-handling core of a multi-tenant authentication backend,
//! built with Tokio and Axum.
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌───────────────────────────────────────────────────┐
//!                         │                     AUTHCORE                       │
//!                         │                                                    │
//!     Client Request      │  ┌─────────┐   ┌─────────┐   ┌──────────────┐     │
//!     ────────────────────┼─▶│   net   │──▶│  http   │──▶│   routing    │     │
//!                         │  │listener │   │ server  │   │ path+version │     │
//!                         │  └─────────┘   └────┬────┘   └──────┬───────┘     │
//!                         │                     │ worker slot   │             │
//!                         │                     ▼               ▼             │
//!                         │               ┌──────────┐   ┌──────────────┐     │
//!                         │               │   api    │──▶│   tenancy    │     │
//!                         │               │ handlers │   │  + storage   │     │
//!                         │               └──────────┘   └──────────────┘     │
//!                         │                                                    │
//!                         │  ┌──────────────────────────────────────────────┐ │
//!                         │  │  config · lifecycle monitor · observability  │ │
//!                         │  └──────────────────────────────────────────────┘ │
//!                         └───────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;

use authcore::config::{load_config, ConfigError, CoreConfig};
use authcore::lifecycle::{signals, ShutdownReason, WaitOutcome};
use authcore::observability::{logging, metrics};
use authcore::{CoreContext, LifecycleState, Webserver};

#[derive(Debug, Parser)]
#[command(name = "authcore", version, about = "Multi-tenant authentication core")]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the bind host
    #[arg(long)]
    host: Option<String>,

    /// Override the bind port
    #[arg(long)]
    port: Option<u16>,

    /// Override the worker budget
    #[arg(long)]
    max_server_pool_size: Option<usize>,
}

impl Cli {
    fn load(&self) -> Result<CoreConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => CoreConfig::default(),
        };
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(size) = self.max_server_pool_size {
            config.max_server_pool_size = size;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match cli.load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("authcore: {e}");
            return ExitCode::FAILURE;
        }
    };

    logging::init_logging(&config.observability);
    tracing::info!("authcore v{} starting", env!("CARGO_PKG_VERSION"));

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let context = match CoreContext::from_config(config) {
        Ok(context) => context,
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    let server = match Webserver::new(context.clone()) {
        Ok(server) => server,
        Err(e) => {
            tracing::error!(error = %e, "Failed to register endpoints");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = server.start().await {
        eprintln!("{e}");
        return ExitCode::FAILURE;
    }

    // A fatal handler error stops the server on its own; signals go through stop().
    tokio::select! {
        _ = signals::forward_signals(context.shutdown().clone()) => {}
        _ = context.monitor().wait_for_event(LifecycleState::Stopped, Duration::MAX) => {}
    }
    server.stop().await;

    match context.monitor().wait_for_event(LifecycleState::Stopped, Duration::from_secs(1)).await {
        WaitOutcome::Reached(_) => {}
        outcome => tracing::warn!(outcome = ?outcome, "Shutdown did not report STOPPED"),
    }

    match context.shutdown().reason() {
        Some(ShutdownReason::Fatal(cause)) => {
            tracing::error!(cause = %cause, "Shutdown complete after fatal error");
            ExitCode::FAILURE
        }
        _ => {
            tracing::info!("Shutdown complete");
            ExitCode::SUCCESS
        }
    }
}
