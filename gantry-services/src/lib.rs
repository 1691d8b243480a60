//! Gantry Services - controllers, dispatch, sessions and rights
//!
//! The service layer behind both transports:
//!
//! - **Controllers**: manifests on disk bound to compiled handlers, collected
//!   into an immutable route table
//! - **Transport**: the dispatcher that authorizes and invokes calls from any
//!   transport, plus the socket channel
//! - **Session**: cookie parsing, liveness checks and pluggable stores
//! - **Rights**: role and group based ACL resolution
//!
//! The web crate only adapts HTTP and WebSocket to these types.

pub mod controllers;
pub mod error;
pub mod rights;
pub mod session;
pub mod transport;

pub use controllers::{
    ActionContext, ActionError, ActionMode, ControllerModule, ControllerRegistry,
    ControllerSource, Export, HandlerCatalog, RegistrySnapshot, Respond, Route,
};
pub use error::{
    RegistryError, RightsError, ServiceError, ServiceResult, SessionError, StoreError,
};
pub use rights::{InMemoryRightsRepository, NavNode, RightsRepository, RightsResolver};
pub use session::{Session, SessionManager, SessionStore, SessionUser};
pub use transport::{
    CallEnvelope, DispatchOutcome, Dispatcher, InboundCall, Reply, ReplyStatus, SocketChannel,
    TransportKind,
};

use gantry_core::GantryConfig;
use std::sync::Arc;
use tracing::info;

/// Every service a running server needs, wired together
#[derive(Clone)]
pub struct GantryServices {
    pub sessions: Arc<SessionManager>,
    pub rights: Arc<RightsResolver>,
    pub registry: Arc<ControllerRegistry>,
    pub dispatcher: Arc<Dispatcher>,
    /// Navigation tree before pruning
    pub navigation: Arc<Vec<NavNode>>,
}

/// Builder for [`GantryServices`]
pub struct GantryServicesBuilder {
    config: GantryConfig,
    catalog: HandlerCatalog,
    repository: Option<Arc<dyn RightsRepository>>,
}

impl GantryServicesBuilder {
    pub fn new(config: GantryConfig) -> Self {
        Self {
            config,
            catalog: HandlerCatalog::new(),
            repository: None,
        }
    }

    /// Handlers that controller manifests may reference
    pub fn with_catalog(mut self, catalog: HandlerCatalog) -> Self {
        self.catalog.extend(catalog);
        self
    }

    /// Use an external rights repository instead of the seed file
    pub fn with_rights_repository(mut self, repository: Arc<dyn RightsRepository>) -> Self {
        self.repository = Some(repository);
        self
    }

    pub async fn build(self) -> ServiceResult<GantryServices> {
        let config = self.config;
        let rights_enabled = config.rights.enabled;

        let sessions = Arc::new(SessionManager::new(&config.session).await?);

        let repository: Arc<dyn RightsRepository> = match (self.repository, &config.rights.seed_file)
        {
            (Some(repository), _) => repository,
            (None, Some(path)) => Arc::new(InMemoryRightsRepository::from_seed_file(path).await?),
            (None, None) => Arc::new(InMemoryRightsRepository::new()),
        };
        let rights = Arc::new(RightsResolver::new(repository, rights_enabled));

        let registry = Arc::new(ControllerRegistry::new(
            self.catalog,
            ActionMode::for_rights(rights_enabled),
        ));
        let snapshot = registry.build(&config.paths.modules)?;

        if rights_enabled {
            rights
                .ensure_that_default_system_users_exists(config.rights.admin_password.as_deref())
                .await?;
            rights.refresh_rights_from_controllers(&snapshot).await?;
        }

        let navigation = match &config.rights.navigation_file {
            Some(path) => rights::load_navigation(path).await?,
            None => Vec::new(),
        };

        let dispatcher = Arc::new(Dispatcher::new(
            Arc::clone(&registry),
            Arc::clone(&sessions),
            Arc::clone(&rights),
        ));

        info!(
            routes = snapshot.len(),
            rights_enabled,
            store = sessions.get_session_store().kind(),
            "Gantry services ready"
        );

        Ok(GantryServices {
            sessions,
            rights,
            registry,
            dispatcher,
            navigation: Arc::new(navigation),
        })
    }
}

impl GantryServices {
    pub fn builder(config: GantryConfig) -> GantryServicesBuilder {
        GantryServicesBuilder::new(config)
    }
}
