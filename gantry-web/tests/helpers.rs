//! Integration test helpers
//!
//! Spawns the real server on an ephemeral port against the module tree
//! shipped in the repository.

#![allow(dead_code)]

use gantry_core::GantryConfig;
use gantry_web::GantryServerBuilder;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::LazyLock;
use tokio::net::TcpListener;

pub const ADMIN_PASSWORD: &str = "correct horse battery staple";

// Tracing is initialized once per test binary
static TRACING: LazyLock<()> = LazyLock::new(|| {
    let level = if std::env::var("TEST_LOG").is_ok() {
        tracing::Level::DEBUG
    } else {
        tracing::Level::ERROR
    };
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_test_writer()
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();
});

fn repo_path(relative: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("..").join(relative)
}

/// A running test server
pub struct TestApp {
    pub address: String,
    pub ws_address: String,
    /// Client that keeps cookies between requests
    pub api_client: reqwest::Client,
}

impl TestApp {
    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.api_client
            .get(format!("{}{}", &self.address, path))
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn post<Body>(&self, path: &str, body: &Body) -> reqwest::Response
    where
        Body: serde::Serialize,
    {
        self.api_client
            .post(format!("{}{}", &self.address, path))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn post_login(&self, username: &str, password: &str) -> reqwest::Response {
        self.post(
            "/auth/login",
            &serde_json::json!({ "username": username, "password": password }),
        )
        .await
    }

    /// POST to `/api/<route>`, returning status and JSON body
    pub async fn call(&self, route: &str, payload: Value) -> (u16, Value) {
        let response = self.post(&format!("/api/{}", route), &payload).await;
        let status = response.status().as_u16();
        (status, response.json().await.expect("JSON body"))
    }
}

/// `name=value` part of a `Set-Cookie` header
pub fn session_cookie(response: &reqwest::Response) -> Option<String> {
    response
        .headers()
        .get("set-cookie")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .map(str::to_string)
}

pub async fn spawn_app(rights_enabled: bool) -> TestApp {
    LazyLock::force(&TRACING);

    let mut config = GantryConfig::default();
    config.rights.enabled = rights_enabled;
    config.rights.admin_password = Some(ADMIN_PASSWORD.to_string());
    config.rights.navigation_file = Some(repo_path("config/navigation.json"));

    let server = GantryServerBuilder::new(config)
        .host("127.0.0.1")
        .modules(repo_path("modules"))
        .build()
        .await
        .expect("Failed to build server");

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        server.run(listener).await.expect("Server failed");
    });

    let api_client = reqwest::Client::builder()
        .cookie_store(true)
        .build()
        .unwrap();

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        ws_address: format!("ws://127.0.0.1:{}/ws", port),
        api_client,
    }
}
