//! `admin.rights.*`: read access to the rights repository

use super::RIGHTS_REQUIRED;
use gantry_services::controllers::{
    ActionContext, ActionMode, ActionResult, Export, HandlerCatalog, Respond,
};
use serde_json::{json, Value};

async fn users(_payload: Value, ctx: ActionContext) -> ActionResult {
    let mut users = ctx.rights.repository().users().await?;
    for user in &mut users {
        user.password_hash = None;
    }
    users.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(serde_json::to_value(users)?)
}

async fn roles(_payload: Value, ctx: ActionContext) -> ActionResult {
    let mut roles = ctx.rights.repository().roles().await?;
    roles.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(serde_json::to_value(roles)?)
}

/// Rebuild the right index and drop cached ACLs
async fn refresh(_payload: Value, ctx: ActionContext) -> ActionResult {
    let indexed = ctx.rights.refresh_rights_index().await?;
    Ok(json!({ "rights": indexed }))
}

pub fn register(catalog: &mut HandlerCatalog, mode: ActionMode) {
    let names = ["admin.rights.users", "admin.rights.roles", "admin.rights.refresh"];

    match mode {
        ActionMode::Direct => {
            for name in names {
                catalog.register(
                    name,
                    Export::direct(|_, respond: Respond| async move {
                        respond.error(RIGHTS_REQUIRED)
                    }),
                );
            }
        }
        ActionMode::Contextual => {
            catalog
                .register(
                    names[0],
                    Export::contextual(|payload, ctx, respond: Respond| async move {
                        respond.send(users(payload, ctx).await)
                    }),
                )
                .register(
                    names[1],
                    Export::contextual(|payload, ctx, respond: Respond| async move {
                        respond.send(roles(payload, ctx).await)
                    }),
                )
                .register(
                    names[2],
                    Export::contextual(|payload, ctx, respond: Respond| async move {
                        respond.send(refresh(payload, ctx).await)
                    }),
                );
        }
    }
}
