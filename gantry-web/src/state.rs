//! Shared application state

use crate::WebResult;
use gantry_core::GantryConfig;
use gantry_services::controllers::HandlerCatalog;
use gantry_services::{Dispatcher, GantryServices, RightsResolver, SessionManager};
use std::sync::Arc;
use tracing::info;

/// State handed to every axum handler
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GantryConfig>,
    pub services: GantryServices,
}

impl AppState {
    /// Wire the services with the built-in controllers plus `catalog`
    pub async fn new(config: GantryConfig, catalog: HandlerCatalog) -> WebResult<Self> {
        let mode = gantry_services::ActionMode::for_rights(config.rights.enabled);

        let services = GantryServices::builder(config.clone())
            .with_catalog(crate::controllers::builtin_catalog(mode))
            .with_catalog(catalog)
            .build()
            .await?;

        info!("Application state initialized");
        Ok(Self {
            config: Arc::new(config),
            services,
        })
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.services.dispatcher
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.services.sessions
    }

    pub fn rights(&self) -> &Arc<RightsResolver> {
        &self.services.rights
    }

    /// Drop session records past their lifetime; returns how many went away
    pub async fn purge_sessions(&self) -> usize {
        match self.sessions().purge_expired().await {
            Ok(purged) => purged,
            Err(e) => {
                tracing::warn!("Session purge failed: {}", e);
                0
            }
        }
    }
}
