//! Controllers
//!
//! Compiled handlers live in a [`HandlerCatalog`]; the module tree on disk
//! holds manifests that bind those handlers to routes. The registry joins
//! the two into an immutable route table.

pub mod action;
pub mod catalog;
pub mod manifest;
pub mod registry;

pub use action::{
    ActionContext, ActionError, ActionFuture, ActionMode, ActionResult, Export, Respond,
};
pub use catalog::{ControllerModule, HandlerCatalog, ModuleExport};
pub use manifest::{ActionManifest, ControllerManifest};
pub use registry::{ControllerAction, ControllerRegistry, ControllerSource, RegistrySnapshot, Route};
