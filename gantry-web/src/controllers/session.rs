//! `system.session.*`: the caller's own session
//!
//! Data keys are free-form; values are any JSON.

use super::RIGHTS_REQUIRED;
use gantry_services::controllers::{
    ActionContext, ActionMode, ActionResult, Export, HandlerCatalog, Respond,
};
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
struct KeyPayload {
    key: String,
}

#[derive(Debug, Deserialize)]
struct SetPayload {
    key: String,
    #[serde(default)]
    value: Value,
}

async fn whoami(_payload: Value, ctx: ActionContext) -> ActionResult {
    Ok(json!({
        "user": ctx.session.user,
        "start": ctx.session.start,
        "activity": ctx.session.activity,
    }))
}

async fn get(payload: Value, ctx: ActionContext) -> ActionResult {
    let KeyPayload { key } = serde_json::from_value(payload)?;
    let value = ctx.sessions.get_data(&ctx.session.id, &key).await?;
    Ok(value.unwrap_or(Value::Null))
}

async fn set(payload: Value, ctx: ActionContext) -> ActionResult {
    let SetPayload { key, value } = serde_json::from_value(payload)?;
    ctx.sessions.set_data(&ctx.session.id, &key, value).await?;
    Ok(Value::Bool(true))
}

async fn delete(payload: Value, ctx: ActionContext) -> ActionResult {
    let KeyPayload { key } = serde_json::from_value(payload)?;
    let removed = ctx.sessions.delete_data(&ctx.session.id, &key).await?;
    Ok(removed.unwrap_or(Value::Null))
}

pub fn register(catalog: &mut HandlerCatalog, mode: ActionMode) {
    let names = [
        "system.session.whoami",
        "system.session.get",
        "system.session.set",
        "system.session.delete",
    ];

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
                        respond.send(whoami(payload, ctx).await)
                    }),
                )
                .register(
                    names[1],
                    Export::contextual(|payload, ctx, respond: Respond| async move {
                        respond.send(get(payload, ctx).await)
                    }),
                )
                .register(
                    names[2],
                    Export::contextual(|payload, ctx, respond: Respond| async move {
                        respond.send(set(payload, ctx).await)
                    }),
                )
                .register(
                    names[3],
                    Export::contextual(|payload, ctx, respond: Respond| async move {
                        respond.send(delete(payload, ctx).await)
                    }),
                );
        }
    }
}
