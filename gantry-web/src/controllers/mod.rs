//! Built-in controllers
//!
//! Handlers shipped with the server. They only become routes when a
//! manifest in the module tree references them (see `modules/` at the
//! repository root).

pub mod admin;
pub mod session;
pub mod system;

use gantry_services::controllers::{ActionMode, HandlerCatalog};

/// Reply of session and admin actions while the rights system is off
pub const RIGHTS_REQUIRED: &str = "This action requires the rights system";

/// Every built-in handler in the signature `mode` registers
pub fn builtin_catalog(mode: ActionMode) -> HandlerCatalog {
    let mut catalog = HandlerCatalog::new();
    system::register(&mut catalog, mode);
    session::register(&mut catalog, mode);
    admin::register(&mut catalog, mode);
    catalog
}

#[cfg(test)]
pub(crate) mod test_support {
    use gantry_services::controllers::{ActionResult, Export, Respond};
    use serde_json::Value;

    /// Run a direct export outside the dispatcher
    pub async fn call_direct(export: &Export, payload: Value) -> ActionResult {
        let Export::Direct(handler) = export else {
            panic!("not a direct export");
        };
        let (respond, answer) = Respond::channel();
        handler(payload, respond).await;
        answer.await.unwrap()
    }
}
