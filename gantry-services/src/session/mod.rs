//! Session layer
//!
//! Server-side session records, the pluggable stores that persist them and
//! the manager that parses cookies and enforces lifetime limits.

pub mod manager;
pub mod store;
pub mod types;

pub use manager::{SessionManager, SessionResult};
pub use store::{open_store, FileStore, MemoryStore, SessionStore};
pub use types::{Session, SessionUser, GUEST_USER_ID, GUEST_USER_NAME};

#[cfg(feature = "sqlite")]
pub use store::SqliteStore;
