//! Route definitions for the Gantry web server

use crate::transport::{http, websocket};
use crate::{auth, handlers, AppState};
use axum::{
    routing::{get, post},
    Router,
};

/// Controller calls over HTTP
pub fn api_routes() -> Router<AppState> {
    Router::new().route(
        "/api/{*route}",
        get(http::call_handler).post(http::call_handler),
    )
}

/// Endpoints that manage the caller's session directly
pub fn session_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/navigation", get(handlers::navigation))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
}

/// Event transport
pub fn websocket_routes() -> Router<AppState> {
    Router::new().route("/ws", get(websocket::socket_handler))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use gantry_core::GantryConfig;
    use gantry_services::controllers::HandlerCatalog;
    use serde_json::Value;
    use tower::ServiceExt;

    async fn state() -> (tempfile::TempDir, AppState) {
        let dir = tempfile::tempdir().unwrap();
        let mut config = GantryConfig::default();
        config.paths.modules = dir.path().to_path_buf();
        let state = AppState::new(config, HandlerCatalog::new()).await.unwrap();
        (dir, state)
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_health_check_route() {
        let (_dir, state) = state().await;
        let app = session_routes().with_state(state);

        let (status, body) = get_json(app, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["routes"], 0);
    }

    #[tokio::test]
    async fn test_unknown_api_route_is_forbidden() {
        let (_dir, state) = state().await;
        let app = api_routes().with_state(state);

        let (status, body) = get_json(app, "/api/no/such/route").await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body, "Wrong url");
    }
}
