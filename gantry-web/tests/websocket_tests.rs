//! WebSocket transport against a running server

mod helpers;

use futures_util::{SinkExt, StreamExt};
use helpers::{session_cookie, spawn_app, ADMIN_PASSWORD};
use serde_json::{json, Value};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn connect(url: &str, cookie: Option<&str>) -> Socket {
    let mut request = url.into_client_request().unwrap();
    if let Some(cookie) = cookie {
        request
            .headers_mut()
            .insert("cookie", cookie.parse().unwrap());
    }
    let (socket, _) = connect_async(request).await.expect("WebSocket handshake");
    socket
}

async fn send(socket: &mut Socket, frame: Value) {
    socket
        .send(Message::Text(frame.to_string().into()))
        .await
        .unwrap();
}

async fn next_json(socket: &mut Socket) -> Value {
    loop {
        let message = tokio::time::timeout(Duration::from_secs(5), socket.next())
            .await
            .expect("frame within timeout")
            .expect("socket open")
            .unwrap();
        if let Message::Text(text) = message {
            return serde_json::from_str(text.as_str()).unwrap();
        }
    }
}

#[tokio::test]
async fn test_ping_echo_and_unknown_event() {
    let app = spawn_app(false).await;
    let mut socket = connect(&app.ws_address, None).await;

    send(&mut socket, json!({"event": "ping"})).await;
    assert_eq!(next_json(&mut socket).await, json!({"event": "pong"}));

    send(
        &mut socket,
        json!({"event": "system/info/echo", "data": {"a": 1}, "ack": 1}),
    )
    .await;
    assert_eq!(
        next_json(&mut socket).await,
        json!({"ack": 1, "status": 200, "data": {"a": 1}})
    );

    send(&mut socket, json!({"event": "nope", "ack": "x"})).await;
    assert_eq!(
        next_json(&mut socket).await,
        json!({"ack": "x", "status": 403, "data": "Wrong url"})
    );
}

#[tokio::test]
async fn test_concurrent_calls_are_all_acknowledged() {
    let app = spawn_app(false).await;
    let mut socket = connect(&app.ws_address, None).await;

    for ack in 0..10 {
        send(
            &mut socket,
            json!({"event": "system/info/echo", "data": ack, "ack": ack}),
        )
        .await;
    }

    let mut acks = Vec::new();
    for _ in 0..10 {
        let reply = next_json(&mut socket).await;
        assert_eq!(reply["status"], 200);
        assert_eq!(reply["data"], reply["ack"]);
        acks.push(reply["ack"].as_u64().unwrap());
    }
    acks.sort_unstable();
    assert_eq!(acks, (0..10).collect::<Vec<u64>>());
}

#[tokio::test]
async fn test_socket_keeps_its_guest_session() {
    let app = spawn_app(true).await;
    let mut socket = connect(&app.ws_address, None).await;

    send(
        &mut socket,
        json!({"event": "system/session/set", "data": {"key": "k", "value": 42}, "ack": 1}),
    )
    .await;
    assert_eq!(next_json(&mut socket).await["status"], 200);

    send(
        &mut socket,
        json!({"event": "system/session/get", "data": {"key": "k"}, "ack": 2}),
    )
    .await;
    assert_eq!(
        next_json(&mut socket).await,
        json!({"ack": 2, "status": 200, "data": 42})
    );

    send(&mut socket, json!({"event": "admin/rights/roles", "ack": 3})).await;
    assert_eq!(
        next_json(&mut socket).await,
        json!({"ack": 3, "status": 403, "data": "Access denied"})
    );
}

#[tokio::test]
async fn test_handshake_cookie_carries_login() {
    let app = spawn_app(true).await;

    let response = app.post_login("sysadmin", ADMIN_PASSWORD).await;
    assert_eq!(response.status().as_u16(), 200);
    let cookie = session_cookie(&response).expect("login cookie");

    let mut socket = connect(&app.ws_address, Some(&cookie)).await;
    send(&mut socket, json!({"event": "system/session/whoami", "ack": 1})).await;
    let reply = next_json(&mut socket).await;
    assert_eq!(reply["status"], 200);
    assert_eq!(reply["data"]["user"]["name"], "sysadmin");

    send(&mut socket, json!({"event": "admin/rights/roles", "ack": 2})).await;
    let reply = next_json(&mut socket).await;
    assert_eq!(reply["status"], 200);
    let roles: Vec<_> = reply["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|role| role["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(roles, vec!["Admin", "Guest"]);
}

#[tokio::test]
async fn test_unknown_event_is_authorized_like_http() {
    let app = spawn_app(true).await;

    let (status, body) = app.call("no/such/route", json!({})).await;
    assert_eq!(status, 403);
    assert_eq!(body, "Access denied");

    let mut socket = connect(&app.ws_address, None).await;
    send(&mut socket, json!({"event": "no/such/route", "ack": 1})).await;
    assert_eq!(
        next_json(&mut socket).await,
        json!({"ack": 1, "status": 403, "data": "Access denied"})
    );
}
