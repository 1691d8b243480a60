//! Gantry Web Server
//!
//! Serves the controller tree over HTTP and WebSocket.

use anyhow::Context;
use clap::Parser;
use gantry_core::{init_logging, GantryConfig, LogFormat};
use gantry_web::server::GantryServerBuilder;
use gantry_web::WebError;
use std::path::PathBuf;
use tracing::info;

/// Gantry Web Server - controller framework with sessions and rights
#[derive(Parser)]
#[command(name = "gantry-web")]
#[command(about = "Serve a Gantry module tree over HTTP and WebSocket")]
#[command(version)]
struct Args {
    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Server host to bind to
    #[arg(long)]
    host: Option<String>,

    /// Server port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Root of the controller module tree
    #[arg(long)]
    modules: Option<PathBuf>,

    /// Enforce rights on every call
    #[arg(long)]
    rights: bool,

    /// Enable development mode
    #[arg(long)]
    dev: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables before the config reads GANTRY__* overrides
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let mut config = GantryConfig::load(args.config.as_deref())
        .context("Failed to load configuration")?;

    if args.dev {
        config.server.dev_mode = true;
        config.logging.format = LogFormat::Pretty;
    }
    if args.rights {
        config.rights.enabled = true;
    }
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }

    init_logging(&config.logging).map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    let mut builder = GantryServerBuilder::new(config);
    if let Some(host) = args.host {
        builder = builder.host(host);
    }
    if let Some(port) = args.port {
        builder = builder.port(port);
    }
    if let Some(modules) = args.modules {
        builder = builder.modules(modules);
    }

    let server = builder
        .build()
        .await
        .inspect_err(WebError::log)
        .context("Failed to build server")?;
    info!(
        modules = %server.config().paths.modules.display(),
        "Server initialized"
    );

    server.start().await.context("Server stopped with an error")?;
    Ok(())
}
