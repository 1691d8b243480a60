//! Gantry Web Server
//!
//! Binds the transport-neutral dispatcher to HTTP and WebSocket with axum,
//! and adds the session endpoints (login, logout, navigation) that sit
//! outside the controller tree.

pub mod auth;
pub mod controllers;
pub mod handlers;
pub mod routes;
pub mod server;
pub mod state;
pub mod transport;

// Re-export main types
pub use server::{GantryServer, GantryServerBuilder};
pub use state::AppState;

use axum::{
    extract::DefaultBodyLimit,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    Router,
};
use gantry_core::GantryError;
use gantry_services::{ServiceError, SessionError};
use serde_json::json;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Create the main application router
pub fn create_app(state: AppState) -> Router {
    let dev_mode = state.config.server.dev_mode;

    let app = Router::new()
        .merge(routes::api_routes())
        .merge(routes::session_routes())
        .merge(routes::websocket_routes())
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(10 * 1024 * 1024)) // 10MB max body size
        .with_state(state);

    if dev_mode {
        app.layer(CorsLayer::very_permissive())
    } else {
        app
    }
}

/// Error types for the web server
#[derive(thiserror::Error, Debug)]
pub enum WebError {
    #[error("Server error: {0}")]
    Server(#[from] std::io::Error),

    #[error(transparent)]
    Core(#[from] GantryError),

    #[error(transparent)]
    Services(#[from] ServiceError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Invalid credentials")]
    Unauthorized,
}

/// Result type for web operations
pub type WebResult<T> = Result<T, WebError>;

impl WebError {
    /// Configuration problems that abort startup
    pub fn is_fatal(&self) -> bool {
        match self {
            WebError::Core(e) | WebError::Services(ServiceError::Core(e)) => e.is_fatal(),
            WebError::Services(e) => e.is_fatal(),
            _ => false,
        }
    }

    /// Log a startup failure, with the error context when there is one
    pub fn log(&self) {
        match self {
            WebError::Core(e) | WebError::Services(ServiceError::Core(e)) => e.log(),
            other => tracing::error!(fatal = other.is_fatal(), error = %other, "Startup failed"),
        }
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let status = match &self {
            WebError::Unauthorized => StatusCode::UNAUTHORIZED,
            WebError::BadRequest(_) | WebError::Session(_) => StatusCode::BAD_REQUEST,
            WebError::Server(_) | WebError::Core(_) | WebError::Services(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
