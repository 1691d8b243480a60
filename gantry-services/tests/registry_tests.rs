//! Controller registry discovery and incremental registration

use gantry_services::controllers::{
    ActionMode, ControllerModule, ControllerRegistry, ControllerSource, Export, HandlerCatalog,
    Respond,
};
use gantry_services::rights::{InMemoryRightsRepository, RightCandidate, RightsResolver};
use gantry_services::RegistryError;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;

fn direct(value: &'static str) -> Export {
    Export::direct(move |_payload, respond: Respond| async move { respond.ok(value) })
}

fn contextual(value: &'static str) -> Export {
    Export::contextual(move |_payload, _ctx, respond: Respond| async move { respond.ok(value) })
}

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

const MIXED_MANIFEST: &str = r#"
[actions.zero]
handler = "mixed.zero"
[actions.one]
handler = "mixed.one"
[actions.two]
handler = "mixed.two"
[actions.three]
handler = "mixed.three"
[actions.twoAgain]
handler = "mixed.two_again"
[actions.four]
handler = "mixed.four"
"#;

fn mixed_catalog() -> HandlerCatalog {
    HandlerCatalog::new()
        .with("mixed.zero", Export::function(0))
        .with("mixed.one", Export::function(1))
        .with("mixed.two", direct("two"))
        .with("mixed.three", contextual("three"))
        .with("mixed.two_again", direct("two again"))
        .with("mixed.four", Export::function(4))
}

async fn call(registry: &ControllerRegistry, route: &str) -> Value {
    let action = registry.lookup(route).expect("route registered");
    let (respond, answer) = Respond::channel();
    action.invoke(json!({}), None, respond).await;
    answer.await.unwrap().unwrap()
}

#[test]
fn test_build_registers_only_matching_signatures() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "app/tools/controllers/mixed.toml", MIXED_MANIFEST);

    let disabled = ControllerRegistry::new(mixed_catalog(), ActionMode::Direct);
    let snapshot = disabled.build(dir.path()).unwrap();
    let routes: Vec<_> = snapshot.routes().iter().map(|r| r.as_str()).collect();
    assert_eq!(routes, vec!["app/tools/mixed/two", "app/tools/mixed/twoAgain"]);

    let enabled = ControllerRegistry::new(mixed_catalog(), ActionMode::Contextual);
    let snapshot = enabled.build(dir.path()).unwrap();
    assert_eq!(snapshot.len(), 1);
    assert!(snapshot.contains("app/tools/mixed/three"));
}

#[test]
fn test_three_two_parameter_exports_out_of_six() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "lib/controllers/register.toml", MIXED_MANIFEST);

    let catalog = mixed_catalog().with("mixed.three", direct("three"));
    let registry = ControllerRegistry::new(catalog, ActionMode::Direct);

    let snapshot = registry.build(dir.path()).unwrap();
    assert_eq!(snapshot.len(), 3);
    assert_eq!(
        snapshot.controllers()["lib/register"],
        vec!["three", "two", "twoAgain"]
    );
}

#[test]
fn test_unreadable_root_fails() {
    let dir = tempfile::tempdir().unwrap();
    let registry = ControllerRegistry::new(HandlerCatalog::new(), ActionMode::Direct);

    let err = registry.build(dir.path().join("missing")).unwrap_err();
    assert!(matches!(err, RegistryError::UnreadableRoot { .. }));
}

#[test]
fn test_bad_manifests_do_not_abort_the_scan() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "app/broken/controllers/broken.toml", "[actions.x\n");
    write(
        dir.path(),
        "app/blog/controllers/blog.toml",
        r#"
[actions.getAll]
roles = ["Guest"]
description = "List posts"

[actions.unbound]
handler = "nothing.here"
"#,
    );
    write(dir.path(), "app/blog/views/blog.toml", "[actions.ignored]\n");

    let catalog = HandlerCatalog::new().with("app/blog/blog/getAll", direct("posts"));
    let registry = ControllerRegistry::new(catalog, ActionMode::Direct);

    let snapshot = registry.build(dir.path()).unwrap();
    assert_eq!(snapshot.len(), 1);

    let action = snapshot.lookup("app/blog/blog/getAll").unwrap();
    assert_eq!(action.roles, vec!["Guest"]);
    assert_eq!(action.description.as_deref(), Some("List posts"));
    assert!(snapshot.lookup("app/blog/blog/getall").is_none());
    assert!(snapshot.lookup("app/blog/blog").is_none());
}

#[tokio::test]
async fn test_add_twice_keeps_last_registration() {
    let registry = ControllerRegistry::new(HandlerCatalog::new(), ActionMode::Direct);

    let first = ControllerModule::new().export("version", direct("first"));
    let second = ControllerModule::new().export("version", direct("second"));

    assert_eq!(registry.add(ControllerSource::Module(first), "system/info"), 1);
    assert_eq!(registry.add(ControllerSource::Module(second), "system/info"), 1);

    assert_eq!(registry.snapshot().len(), 1);
    assert_eq!(call(&registry, "system/info/version").await, json!("second"));
}

#[tokio::test]
async fn test_add_validates_like_build() {
    let registry = ControllerRegistry::new(HandlerCatalog::new(), ActionMode::Contextual);
    let module = ControllerModule::new()
        .export("plain", direct("plain"))
        .export("helper", Export::function(1))
        .export("scoped", contextual("scoped"));

    assert_eq!(registry.add(ControllerSource::Module(module), "app/x"), 1);
    assert!(registry.lookup("app/x/scoped").is_some());
}

#[test]
fn test_add_from_path() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "extra/controllers/extra.toml",
        "[actions.ping]\nhandler = \"extra.ping\"\n",
    );

    let catalog = HandlerCatalog::new().with("extra.ping", direct("pong"));
    let registry = ControllerRegistry::new(catalog, ActionMode::Direct);

    let added = registry.add(
        ControllerSource::Path(dir.path().join("extra/controllers/extra.toml")),
        "plugins/extra",
    );
    assert_eq!(added, 1);
    assert!(registry.lookup("plugins/extra/ping").is_some());

    let missing = registry.add(
        ControllerSource::Path(dir.path().join("nope.toml")),
        "plugins/nope",
    );
    assert_eq!(missing, 0);
    assert_eq!(registry.snapshot().len(), 1);
}

#[test]
fn test_snapshot_held_by_caller_is_unaffected_by_add() {
    let registry = ControllerRegistry::new(HandlerCatalog::new(), ActionMode::Direct);
    let before = registry.snapshot();

    registry.add(
        ControllerSource::Module(ControllerModule::new().export("a", direct("a"))),
        "m",
    );

    assert!(before.is_empty());
    assert_eq!(registry.snapshot().len(), 1);
}

#[test]
fn test_public_functions_carry_route_description_and_roles() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "app/blog/controllers/blog.toml",
        r#"
[actions.list]
handler = "blog.list"
roles = ["Guest", "Editor"]
description = "All posts"

[actions.create]
handler = "blog.create"
roles = ["Editor"]
"#,
    );
    let catalog = HandlerCatalog::new()
        .with("blog.list", contextual("list"))
        .with("blog.create", contextual("create"));
    let registry = ControllerRegistry::new(catalog, ActionMode::Contextual);
    let snapshot = registry.build(dir.path()).unwrap();

    let rights = RightsResolver::new(Arc::new(InMemoryRightsRepository::new()), true);
    let candidates = rights.get_public_functions_from_controllers(&snapshot);

    assert_eq!(
        candidates,
        vec![
            RightCandidate {
                name: "app/blog/blog/create".to_string(),
                description: None,
                roles: vec!["Editor".to_string()],
            },
            RightCandidate {
                name: "app/blog/blog/list".to_string(),
                description: Some("All posts".to_string()),
                roles: vec!["Guest".to_string(), "Editor".to_string()],
            },
        ]
    );
}
