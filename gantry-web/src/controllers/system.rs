//! `system.info.*`: server identity and a payload echo

use gantry_services::controllers::{ActionMode, Export, HandlerCatalog, Respond};
use serde_json::{json, Value};

fn version() -> Value {
    json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    })
}

pub fn register(catalog: &mut HandlerCatalog, mode: ActionMode) {
    match mode {
        ActionMode::Direct => {
            catalog.register(
                "system.info.version",
                Export::direct(|_, respond: Respond| async move { respond.ok(version()) }),
            );
            catalog.register(
                "system.info.echo",
                Export::direct(|payload, respond: Respond| async move { respond.ok(payload) }),
            );
        }
        ActionMode::Contextual => {
            catalog.register(
                "system.info.version",
                Export::contextual(|_, _ctx, respond: Respond| async move {
                    respond.ok(version())
                }),
            );
            catalog.register(
                "system.info.echo",
                Export::contextual(|payload, _ctx, respond: Respond| async move {
                    respond.ok(payload)
                }),
            );
        }
    }
}
