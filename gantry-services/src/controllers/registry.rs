//! Controller Registry - route discovery and the live route table
//!
//! A [`RegistrySnapshot`] is immutable. Building or extending the registry
//! produces a new snapshot and swaps it into the shared slot, so dispatch
//! only ever sees complete tables. Calls already holding the previous
//! snapshot finish against it.

use super::action::{ActionContext, ActionFuture, ActionMode, Export, Respond};
use super::catalog::{ControllerModule, HandlerCatalog};
use super::manifest::{is_manifest, module_path_for, ControllerManifest};
use crate::error::RegistryError;
use serde::Serialize;
use serde_json::Value;
use std::borrow::Borrow;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Route key `<module path>/<action>`, `/`-separated and case-sensitive
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Route(String);

impl Route {
    /// Normalize separators and drop empty segments
    pub fn new(raw: &str) -> Self {
        let normalized = raw.replace('\\', "/");
        let segments: Vec<&str> = normalized.split('/').filter(|s| !s.is_empty()).collect();
        Route(segments.join("/"))
    }

    pub fn join(module_path: &str, action: &str) -> Self {
        Route::new(&format!("{}/{}", module_path, action))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Route {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A validated action registered under one route
#[derive(Debug, Clone)]
pub struct ControllerAction {
    pub route: Route,
    pub module_path: String,
    pub name: String,
    pub export: Export,
    /// Roles declared as allowed to call the action
    pub roles: Vec<String>,
    pub description: Option<String>,
}

impl ControllerAction {
    /// Start the action; it answers through `respond`
    pub fn invoke(
        &self,
        payload: Value,
        context: Option<ActionContext>,
        respond: Respond,
    ) -> ActionFuture {
        match (&self.export, context) {
            (Export::Direct(handler), _) => handler(payload, respond),
            (Export::Contextual(handler), Some(context)) => handler(payload, context, respond),
            (Export::Contextual(_), None) => {
                respond.error(format!("{} requires a caller context", self.route));
                Box::pin(async {})
            }
            (Export::Function { .. }, _) => {
                respond.error(format!("{} is not an action", self.route));
                Box::pin(async {})
            }
        }
    }
}

/// Immutable route table
#[derive(Debug, Default)]
pub struct RegistrySnapshot {
    routes: HashMap<Route, Arc<ControllerAction>>,
}

impl RegistrySnapshot {
    /// Exact, case-sensitive lookup
    pub fn lookup(&self, route: &str) -> Option<Arc<ControllerAction>> {
        self.routes.get(route).cloned()
    }

    pub fn contains(&self, route: &str) -> bool {
        self.routes.contains_key(route)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Routes in sorted order
    pub fn routes(&self) -> Vec<&Route> {
        let mut routes: Vec<_> = self.routes.keys().collect();
        routes.sort();
        routes
    }

    /// Actions sorted by route
    pub fn actions(&self) -> impl Iterator<Item = &ControllerAction> + '_ {
        let mut actions: Vec<&ControllerAction> =
            self.routes.values().map(|action| action.as_ref()).collect();
        actions.sort_by(|a, b| a.route.cmp(&b.route));
        actions.into_iter()
    }

    /// Action names grouped by module path
    pub fn controllers(&self) -> BTreeMap<String, Vec<String>> {
        let mut controllers: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for action in self.actions() {
            controllers
                .entry(action.module_path.clone())
                .or_default()
                .push(action.name.clone());
        }
        controllers
    }
}

/// Source for incremental registration
pub enum ControllerSource {
    Module(ControllerModule),
    Path(PathBuf),
}

pub struct ControllerRegistry {
    mode: ActionMode,
    catalog: HandlerCatalog,
    current: RwLock<Arc<RegistrySnapshot>>,
}

impl ControllerRegistry {
    pub fn new(catalog: HandlerCatalog, mode: ActionMode) -> Self {
        Self {
            mode,
            catalog,
            current: RwLock::new(Arc::new(RegistrySnapshot::default())),
        }
    }

    pub fn mode(&self) -> ActionMode {
        self.mode
    }

    /// Scan `root` and install the result as the live snapshot
    pub fn build<P: AsRef<Path>>(&self, root: P) -> Result<Arc<RegistrySnapshot>, RegistryError> {
        let snapshot = Arc::new(self.scan(root.as_ref())?);
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Arc::clone(&snapshot);
        Ok(snapshot)
    }

    /// Build a snapshot from the module tree without installing it
    ///
    /// Only an unreadable root fails; bad entries and manifests are logged
    /// and skipped.
    pub fn scan(&self, root: &Path) -> Result<RegistrySnapshot, RegistryError> {
        std::fs::read_dir(root).map_err(|source| RegistryError::UnreadableRoot {
            path: root.to_path_buf(),
            source,
        })?;

        let mut routes = HashMap::new();

        for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Failed to read directory entry: {}", e);
                    continue;
                }
            };

            if !entry.file_type().is_file() || !is_manifest(entry.path()) {
                continue;
            }
            let Some(module_path) = module_path_for(root, entry.path()) else {
                continue;
            };

            for action in self.actions_from_manifest(entry.path(), &module_path) {
                routes.insert(action.route.clone(), Arc::new(action));
            }
        }

        info!(
            root = %root.display(),
            routes = routes.len(),
            mode = ?self.mode,
            "Controller registry built"
        );
        Ok(RegistrySnapshot { routes })
    }

    /// Register one module or manifest file under `module_path`
    ///
    /// Routes already present are replaced. The new snapshot is swapped in
    /// under the write lock, but calls that looked up the previous snapshot
    /// keep using it. Returns the number of actions registered.
    pub fn add(&self, source: ControllerSource, module_path: &str) -> usize {
        let actions = match source {
            ControllerSource::Module(module) => self.actions_from_module(&module, module_path),
            ControllerSource::Path(path) => {
                if !path.exists() {
                    warn!("Controller path does not exist: {}", path.display());
                    return 0;
                }
                self.actions_from_manifest(&path, module_path)
            }
        };
        let count = actions.len();

        let mut slot = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let mut routes = slot.routes.clone();
        for action in actions {
            let route = action.route.clone();
            if routes.insert(route.clone(), Arc::new(action)).is_some() {
                debug!(%route, "Replaced existing route");
            }
        }
        *slot = Arc::new(RegistrySnapshot { routes });

        count
    }

    pub fn lookup(&self, route: &str) -> Option<Arc<ControllerAction>> {
        self.snapshot().lookup(route)
    }

    /// The live snapshot
    pub fn snapshot(&self) -> Arc<RegistrySnapshot> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    fn actions_from_manifest(&self, path: &Path, module_path: &str) -> Vec<ControllerAction> {
        let manifest = match ControllerManifest::load(path) {
            Ok(manifest) => manifest,
            Err(e) => {
                warn!("Skipping controller {}: {}", path.display(), e);
                return Vec::new();
            }
        };

        manifest
            .actions
            .into_iter()
            .filter_map(|(name, entry)| {
                let route = Route::join(module_path, &name);
                let handler = entry.handler.unwrap_or_else(|| route.to_string());

                let Some(export) = self.catalog.get(&handler) else {
                    warn!(%route, %handler, "No handler registered for action, skipping");
                    return None;
                };

                self.validate(ControllerAction {
                    route,
                    module_path: module_path.to_string(),
                    name,
                    export: export.clone(),
                    roles: entry.roles,
                    description: entry.description,
                })
            })
            .collect()
    }

    fn actions_from_module(
        &self,
        module: &ControllerModule,
        module_path: &str,
    ) -> Vec<ControllerAction> {
        module
            .exports()
            .iter()
            .filter_map(|export| {
                self.validate(ControllerAction {
                    route: Route::join(module_path, &export.name),
                    module_path: module_path.to_string(),
                    name: export.name.clone(),
                    export: export.export.clone(),
                    roles: export.roles.clone(),
                    description: export.description.clone(),
                })
            })
            .collect()
    }

    fn validate(&self, action: ControllerAction) -> Option<ControllerAction> {
        if self.mode.accepts(&action.export) {
            return Some(action);
        }

        warn!(
            route = %action.route,
            export = ?action.export,
            arity = action.export.arity(),
            expected = self.mode.expected_arity(),
            "Export does not match the action signature, skipping"
        );
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_normalization() {
        assert_eq!(Route::new("app\\blog\\blog/getAll").as_str(), "app/blog/blog/getAll");
        assert_eq!(Route::new("/app//blog/").as_str(), "app/blog");
        assert_eq!(Route::join("app/blog/blog", "getAll").as_str(), "app/blog/blog/getAll");
    }

    #[test]
    fn test_empty_registry_lookup() {
        let registry = ControllerRegistry::new(HandlerCatalog::new(), ActionMode::Direct);
        assert!(registry.lookup("anything").is_none());
        assert!(registry.snapshot().is_empty());
    }
}
