//! Gantry Web Server
//!
//! Main web server implementation using Axum.

use crate::{create_app, AppState, WebError, WebResult};
use axum::serve;
use gantry_core::GantryConfig;
use gantry_services::controllers::HandlerCatalog;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{error, info};

/// How often expired session records are purged
pub const SESSION_PURGE_INTERVAL: Duration = Duration::from_secs(3600);

/// Main Gantry web server
pub struct GantryServer {
    config: GantryConfig,
    state: AppState,
}

impl GantryServer {
    /// Create a server with the built-in controllers only
    pub async fn new(config: GantryConfig) -> WebResult<Self> {
        Self::with_catalog(config, HandlerCatalog::new()).await
    }

    /// Create a server whose manifests may also bind the handlers in `catalog`
    pub async fn with_catalog(config: GantryConfig, catalog: HandlerCatalog) -> WebResult<Self> {
        let state = AppState::new(config.clone(), catalog).await?;
        Ok(Self { config, state })
    }

    /// Bind the configured address and serve until the process stops
    pub async fn start(self) -> WebResult<()> {
        let address = self.config.address();

        info!("Starting Gantry Web Server");
        info!("Server address: http://{}", address);
        info!("Development mode: {}", self.config.server.dev_mode);
        info!("Rights system: {}", self.config.rights.enabled);

        let listener = TcpListener::bind(&address)
            .await
            .map_err(WebError::Server)?;

        self.run(listener).await
    }

    /// Serve on an already bound listener
    pub async fn run(self, listener: TcpListener) -> WebResult<()> {
        let app = create_app(self.state.clone());

        if let Ok(local) = listener.local_addr() {
            info!("Server listening on http://{}", local);
        }

        // Start cleanup task for expired sessions
        let cleanup_state = self.state.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(SESSION_PURGE_INTERVAL);
            loop {
                interval.tick().await;
                cleanup_state.purge_sessions().await;
            }
        });

        if let Err(e) = serve(listener, app).await {
            error!("Server error: {}", e);
            return Err(WebError::Server(e));
        }

        Ok(())
    }

    /// Get server configuration
    pub fn config(&self) -> &GantryConfig {
        &self.config
    }

    /// Get application state
    pub fn state(&self) -> &AppState {
        &self.state
    }
}

/// Builder for GantryServer
pub struct GantryServerBuilder {
    config: GantryConfig,
    catalog: HandlerCatalog,
}

impl GantryServerBuilder {
    /// Create a new server builder
    pub fn new(config: GantryConfig) -> Self {
        Self {
            config,
            catalog: HandlerCatalog::new(),
        }
    }

    /// Set the server host
    pub fn host<S: Into<String>>(mut self, host: S) -> Self {
        self.config.server.host = host.into();
        self
    }

    /// Set the server port
    pub fn port(mut self, port: u16) -> Self {
        self.config.server.port = port;
        self
    }

    /// Enable development mode
    pub fn dev_mode(mut self, dev_mode: bool) -> Self {
        self.config.server.dev_mode = dev_mode;
        self
    }

    /// Set the module tree scanned for controller manifests
    pub fn modules<P: Into<std::path::PathBuf>>(mut self, modules: P) -> Self {
        self.config.paths.modules = modules.into();
        self
    }

    /// Add application handlers
    pub fn catalog(mut self, catalog: HandlerCatalog) -> Self {
        self.catalog.extend(catalog);
        self
    }

    /// Build the server
    pub async fn build(self) -> WebResult<GantryServer> {
        GantryServer::with_catalog(self.config, self.catalog).await
    }
}
