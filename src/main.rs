//! blockweb
//!
//! A single-threaded web server that accepts build commands for a block
//! world over a deliberately small HTTP/1.0 subset.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client                ┌──────────────────────────────────────────────┐
//!     ─────────────────────▶│  net         http            app             │
//!      one line at a time   │  listener ─▶ machine ─────▶ handlers        │
//!                           │  connection  (phases)        ├─ routing      │
//!     ◀─────────────────────│  outbox   ◀─ response        └─ commands     │
//!      status, headers,     │                                  └─ world    │
//!      body, then close     │                                              │
//!                           │  config · observability · lifecycle          │
//!                           └──────────────────────────────────────────────┘
//! ```
//!
//! GET `/mcpi/<name>?<query>` runs a query handler and returns its text.
//! POST with a JSON `{"commands": [...]}` body applies the commands and
//! answers `OK`.

use std::path::PathBuf;

use clap::Parser;

use blockweb::config::validation::validate_config;
use blockweb::config::{load_config, ConfigError, ServerConfig};
use blockweb::lifecycle::{signals, startup, Shutdown};
use blockweb::observability::logging;

#[derive(Parser)]
#[command(name = "blockweb")]
#[command(about = "Line-oriented HTTP/1.0 server for block-world build commands", long_about = None)]
struct Cli {
    /// TOML configuration file. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `listener.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,

    /// Validate the configuration and exit.
    #[arg(long)]
    check: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }

    validate_config(&config).map_err(ConfigError::Validation)?;

    if cli.check {
        println!("configuration ok");
        return Ok(());
    }

    logging::init_logging(&config.observability)?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "blockweb starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        idle_timeout_secs = config.timeouts.idle_secs,
        path_prefix = %config.app.path_prefix,
        "Configuration loaded"
    );

    let shutdown = Shutdown::new();
    signals::spawn_signal_handler(shutdown.clone());

    startup::start(config, &shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
