//! Compiled handlers and in-memory controller modules

use super::action::Export;
use std::collections::HashMap;

/// Compiled handlers addressable from controller manifests
#[derive(Clone, Default)]
pub struct HandlerCatalog {
    handlers: HashMap<String, Export>,
}

impl HandlerCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler; a second registration under the same name replaces the first
    pub fn register<S: Into<String>>(&mut self, name: S, export: Export) -> &mut Self {
        self.handlers.insert(name.into(), export);
        self
    }

    pub fn with<S: Into<String>>(mut self, name: S, export: Export) -> Self {
        self.register(name, export);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Export> {
        self.handlers.get(name)
    }

    pub fn extend(&mut self, other: HandlerCatalog) {
        self.handlers.extend(other.handlers);
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

/// One export of an in-memory module
#[derive(Clone, Debug)]
pub struct ModuleExport {
    pub name: String,
    pub export: Export,
    pub roles: Vec<String>,
    pub description: Option<String>,
}

/// A controller module built in code rather than read from the module tree
#[derive(Clone, Debug, Default)]
pub struct ControllerModule {
    exports: Vec<ModuleExport>,
}

impl ControllerModule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn export<S: Into<String>>(mut self, name: S, export: Export) -> Self {
        self.exports.push(ModuleExport {
            name: name.into(),
            export,
            roles: Vec::new(),
            description: None,
        });
        self
    }

    /// Export an action together with the roles allowed to call it
    pub fn export_with_roles<S: Into<String>>(
        mut self,
        name: S,
        export: Export,
        roles: &[&str],
    ) -> Self {
        self.exports.push(ModuleExport {
            name: name.into(),
            export,
            roles: roles.iter().map(|r| r.to_string()).collect(),
            description: None,
        });
        self
    }

    pub fn exports(&self) -> &[ModuleExport] {
        &self.exports
    }
}
