//! Session record types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Identity of the guest account every anonymous session carries
pub const GUEST_USER_ID: &str = "guest";
pub const GUEST_USER_NAME: &str = "guest";

/// User reference embedded in a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: String,
    pub name: String,
    /// Role names resolved when the user was attached to the session
    #[serde(default)]
    pub roles: Vec<String>,
}

impl SessionUser {
    pub fn new<I: Into<String>, N: Into<String>>(id: I, name: N) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            roles: Vec::new(),
        }
    }

    pub fn guest() -> Self {
        Self {
            id: GUEST_USER_ID.to_string(),
            name: GUEST_USER_NAME.to_string(),
            roles: vec!["Guest".to_string()],
        }
    }

    pub fn is_guest(&self) -> bool {
        self.id == GUEST_USER_ID
    }

    pub fn with_roles(mut self, roles: Vec<String>) -> Self {
        self.roles = roles;
        self
    }
}

impl Default for SessionUser {
    fn default() -> Self {
        Self::guest()
    }
}

/// Server-side session record
///
/// Stored as JSON. Records written before the id was kept inside the record
/// deserialize with an empty `id`; the manager fills it in from the store key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    #[serde(default)]
    pub id: String,
    pub start: DateTime<Utc>,
    pub activity: DateTime<Utc>,
    #[serde(default)]
    pub data: Map<String, Value>,
    #[serde(default)]
    pub user: SessionUser,
}

impl Session {
    /// Fresh guest session starting now
    pub fn new<S: Into<String>>(id: S) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            start: now,
            activity: now,
            data: Map::new(),
            user: SessionUser::guest(),
        }
    }

    /// Generate a new opaque session id
    pub fn generate_id() -> String {
        uuid::Uuid::new_v4().simple().to_string()
    }

    pub fn is_guest(&self) -> bool {
        self.user.is_guest()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_record_without_id_or_user() {
        let raw = r#"{"start":"2024-01-01T10:00:00Z","activity":"2024-01-01T10:05:00Z"}"#;
        let session: Session = serde_json::from_str(raw).unwrap();

        assert!(session.id.is_empty());
        assert!(session.data.is_empty());
        assert_eq!(session.user, SessionUser::guest());
    }

    #[test]
    fn test_new_session_is_guest() {
        let session = Session::new(Session::generate_id());
        assert!(session.is_guest());
        assert_eq!(session.start, session.activity);
        assert_eq!(session.id.len(), 32);
    }
}
