//! SQL Bridge - Main entry point.
//!
//! Connects the pool for the configured store and serves requests over
//! the stdio transport.

use clap::Parser;
use sql_bridge::config::Config;
use sql_bridge::dispatch::RequestDispatcher;
use sql_bridge::transport::StdioTransport;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber for logging.
fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        // Diagnostics share stdout's terminal by default; JSON logs go to
        // stderr so they never interleave with response lines.
        subscriber.with(fmt::layer().json().with_writer(std::io::stderr)).init();
    } else {
        subscriber
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse configuration from command line and environment
    let config = Config::parse();

    // Initialize logging
    init_tracing(&config);

    let store_config = match config.store_config() {
        Ok(store_config) => store_config,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            return Err(e.into());
        }
    };

    info!("Starting SQL Bridge v{}", env!("CARGO_PKG_VERSION"));

    let dispatcher = match RequestDispatcher::connect(
        &store_config,
        config.connect_timeout_duration(),
        config.request_timeout_duration(),
    )
    .await
    {
        Ok(dispatcher) => Arc::new(dispatcher),
        Err(e) => {
            error!(error = %e, "Store initialization failed");
            return Err(e.into());
        }
    };

    let transport = StdioTransport::new(dispatcher);
    if let Err(e) = transport.run().await {
        error!(error = %e, "Transport error");
        return Err(e.into());
    }

    info!("Shutdown complete");
    Ok(())
}
