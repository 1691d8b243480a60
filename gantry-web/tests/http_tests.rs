//! HTTP transport, login and navigation against a running server

mod helpers;

use helpers::{session_cookie, spawn_app, ADMIN_PASSWORD};
use serde_json::{json, Value};

#[tokio::test]
async fn test_health_reports_registered_routes() {
    let app = spawn_app(true).await;

    let response = app.get("/health").await;
    assert_eq!(response.status().as_u16(), 200);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["routes"], 9);
    assert_eq!(body["rights_enabled"], true);
}

#[tokio::test]
async fn test_open_server_calls_without_sessions() {
    let app = spawn_app(false).await;

    let response = app.get("/api/system/info/echo?page=2").await;
    assert_eq!(response.status().as_u16(), 200);
    assert!(session_cookie(&response).is_none());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({"page": "2"}));

    let (status, body) = app.call("system/info/version", json!({})).await;
    assert_eq!(status, 200);
    assert_eq!(body["name"], "gantry-web");

    let (status, body) = app.call("system/session/get", json!({"key": "k"})).await;
    assert_eq!(status, 400);
    assert_eq!(body, "This action requires the rights system");

    let (status, body) = app.call("system/info/missing", json!({})).await;
    assert_eq!(status, 403);
    assert_eq!(body, "Wrong url");
}

#[tokio::test]
async fn test_invalid_json_body_is_bad_request() {
    let app = spawn_app(false).await;

    let response = app
        .api_client
        .post(format!("{}/api/system/info/echo", app.address))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn test_guest_gets_a_session_and_limited_access() {
    let app = spawn_app(true).await;

    let response = app.get("/api/system/info/version").await;
    assert_eq!(response.status().as_u16(), 200);
    let cookie = session_cookie(&response).expect("guest session cookie");
    assert!(cookie.starts_with("gantry.sid=s%3A"));

    // The cookie is reused, so no new one is issued
    let response = app.get("/api/system/session/whoami").await;
    assert_eq!(response.status().as_u16(), 200);
    assert!(session_cookie(&response).is_none());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["user"]["name"], "guest");

    let (status, body) = app.call("admin/rights/users", json!({})).await;
    assert_eq!(status, 403);
    assert_eq!(body, "Access denied");

    // Authorization runs before lookup
    let (status, body) = app.call("no/such/route", json!({})).await;
    assert_eq!(status, 403);
    assert_eq!(body, "Access denied");
}

#[tokio::test]
async fn test_session_data_round_trips_across_calls() {
    let app = spawn_app(true).await;

    let (status, _) = app
        .call("system/session/set", json!({"key": "color", "value": "blue"}))
        .await;
    assert_eq!(status, 200);

    let (status, body) = app.call("system/session/get", json!({"key": "color"})).await;
    assert_eq!(status, 200);
    assert_eq!(body, "blue");

    let (status, body) = app.call("system/session/get", json!({})).await;
    assert_eq!(status, 400);
    assert!(body.as_str().unwrap().contains("key"));
}

#[tokio::test]
async fn test_login_grants_admin_routes_and_logout_revokes_them() {
    let app = spawn_app(true).await;

    let response = app.post_login("sysadmin", "wrong").await;
    assert_eq!(response.status().as_u16(), 401);

    let response = app.post_login("sysadmin", ADMIN_PASSWORD).await;
    assert_eq!(response.status().as_u16(), 200);
    assert!(session_cookie(&response).is_some());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["user"]["name"], "sysadmin");
    assert_eq!(body["user"]["roles"], json!(["Admin"]));

    let (status, users) = app.call("admin/rights/users", json!({})).await;
    assert_eq!(status, 200);
    let users = users.as_array().unwrap();
    assert!(users.iter().any(|user| user["name"] == "sysadmin"));
    assert!(users.iter().all(|user| user.get("password_hash").is_none()));

    let response = app.post("/auth/logout", &json!({})).await;
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["user"]["name"], "guest");

    let (status, _) = app.call("admin/rights/users", json!({})).await;
    assert_eq!(status, 403);
}

#[tokio::test]
async fn test_navigation_is_pruned_per_user() {
    let app = spawn_app(true).await;

    let guest: Value = app.get("/navigation").await.json().await.unwrap();
    assert_eq!(guest["user"], "guest");
    let items = guest["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["title"], "System");
    assert_eq!(items[0]["children"].as_array().unwrap().len(), 2);

    app.post_login("sysadmin", ADMIN_PASSWORD).await;

    let admin: Value = app.get("/navigation").await.json().await.unwrap();
    assert_eq!(admin["user"], "sysadmin");
    let titles: Vec<_> = admin["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["title"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(titles, vec!["System", "Administration"]);
}
