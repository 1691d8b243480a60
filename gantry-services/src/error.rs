//! Error types for the service layer
//!
//! Each subsystem owns its error enum; [`ServiceError`] wraps them for callers
//! that drive several subsystems at once (server bootstrap, background tasks).

use std::path::PathBuf;
use thiserror::Error;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Failures raised by a session store backend
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "sqlite")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid session key: {key}")]
    InvalidKey { key: String },

    #[error("Store unavailable: {message}")]
    Unavailable { message: String },
}

/// Session manager errors
#[derive(Error, Debug)]
pub enum SessionError {
    /// Missing or unusable session configuration, detected at construction
    #[error("Invalid session configuration `{field}`: {message}")]
    Config { field: &'static str, message: String },

    #[error("Session cookie header is missing")]
    MissingCookie,

    #[error("Session cookie `{key}` is not present in the cookie header")]
    CookieNotFound { key: String },

    #[error("Session cookie is malformed: {message}")]
    MalformedCookie { message: String },

    #[error("session {id}: not found")]
    NotFound { id: String },

    #[error("Session {id} holds a corrupt record: {source}")]
    Corrupt {
        id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Session serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The store failed; the original error stays reachable through `source()`
    #[error("Session store error: {source}")]
    Store {
        #[from]
        source: StoreError,
    },
}

impl SessionError {
    pub fn config<S: Into<String>>(field: &'static str, message: S) -> Self {
        Self::Config {
            field,
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, SessionError::NotFound { .. })
    }
}

/// Rights resolver and repository errors
#[derive(Error, Debug)]
pub enum RightsError {
    #[error("User not found: {id}")]
    UserNotFound { id: String },

    #[error("Role not found: {name}")]
    RoleNotFound { name: String },

    #[error("Rights repository error: {message}")]
    Repository { message: String },

    #[error("Invalid rights data in {path}: {source}")]
    Seed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Password hashing error: {message}")]
    PasswordHash { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Controller registry errors
#[derive(Error, Debug)]
pub enum RegistryError {
    /// The scan root itself could not be read; per-file problems never surface here
    #[error("Cannot read controller root {}: {source}", path.display())]
    UnreadableRoot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid controller manifest {}: {message}", path.display())]
    Manifest { path: PathBuf, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Umbrella error for code that spans subsystems
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Core error: {0}")]
    Core(#[from] gantry_core::GantryError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Rights(#[from] RightsError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl ServiceError {
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Configuration problems abort startup
    pub fn is_fatal(&self) -> bool {
        match self {
            ServiceError::Core(e) => e.is_fatal(),
            ServiceError::Session(SessionError::Config { .. }) => true,
            ServiceError::Registry(RegistryError::UnreadableRoot { .. }) => true,
            _ => false,
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(error: StoreError) -> Self {
        ServiceError::Session(SessionError::Store { source: error })
    }
}
