//! Session Manager - cookie parsing, persistence and liveness checks

use super::store::{open_store, SessionStore};
use super::types::{Session, SessionUser};
use crate::error::SessionError;
use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use gantry_core::SessionConfig;
use hmac::{Hmac, Mac};
use serde_json::Value;
use sha2::Sha256;
use std::sync::Arc;
use tracing::{debug, info, warn};

type HmacSha256 = Hmac<Sha256>;

/// Marker in front of a signed cookie value, percent-encoded or raw
const SIGNED_PREFIXES: [&str; 2] = ["s%3A", "s:"];

pub type SessionResult<T> = Result<T, SessionError>;

/// Owns session records and the store they live in
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    key: String,
    signer: HmacSha256,
    max_life: Duration,
    inactive_time: Duration,
}

impl SessionManager {
    /// Validate `config` and open the store selected by `active_store`
    pub async fn new(config: &SessionConfig) -> SessionResult<Self> {
        if config.stores.is_empty() {
            return Err(SessionError::config(
                "config.stores",
                "at least one session store must be configured",
            ));
        }
        if config.active_store.is_empty() {
            return Err(SessionError::config(
                "config.active_store",
                "name of the store to use is required",
            ));
        }
        let store_config = config.stores.get(&config.active_store).ok_or_else(|| {
            SessionError::config(
                "config.active_store",
                format!("`{}` is not declared in config.stores", config.active_store),
            )
        })?;

        let store = open_store(store_config).await?;
        Self::with_store(config, store)
    }

    /// Build a manager over an already opened store
    pub fn with_store(config: &SessionConfig, store: Arc<dyn SessionStore>) -> SessionResult<Self> {
        if config.secret.is_empty() {
            return Err(SessionError::config(
                "config.secret",
                "a secret is required to sign session cookies",
            ));
        }
        if config.key.is_empty() {
            return Err(SessionError::config(
                "config.key",
                "the session cookie name is required",
            ));
        }
        if config.max_life == 0 {
            return Err(SessionError::config(
                "config.max_life",
                "must be a positive number of seconds",
            ));
        }
        if config.inactive_time == 0 {
            return Err(SessionError::config(
                "config.inactive_time",
                "must be a positive number of seconds",
            ));
        }

        let signer = HmacSha256::new_from_slice(config.secret.as_bytes())
            .map_err(|e| SessionError::config("config.secret", e.to_string()))?;

        let max_life = seconds(config.max_life, "config.max_life")?;
        let inactive_time = seconds(config.inactive_time, "config.inactive_time")?;

        info!(
            store = store.kind(),
            key = %config.key,
            max_life_secs = config.max_life,
            inactive_secs = config.inactive_time,
            "Session manager initialized"
        );

        Ok(Self {
            store,
            key: config.key.clone(),
            signer,
            max_life,
            inactive_time,
        })
    }

    /// Name of the session cookie
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The live store backend
    pub fn get_session_store(&self) -> Arc<dyn SessionStore> {
        Arc::clone(&self.store)
    }

    /// Extract the session id from a raw `Cookie` header
    ///
    /// The cookie value has the form `s%3A<id>.<signature>`. The signature is
    /// discarded, not verified.
    pub fn get_session_id(&self, cookie_header: Option<&str>) -> SessionResult<String> {
        let header = cookie_header.ok_or(SessionError::MissingCookie)?;

        let value = header
            .split(';')
            .filter_map(|pair| pair.split_once('='))
            .find(|(name, _)| name.trim() == self.key)
            .map(|(_, value)| value.trim())
            .ok_or_else(|| SessionError::CookieNotFound {
                key: self.key.clone(),
            })?;

        parse_signed_value(value)
    }

    /// Load the session named by the cookie
    pub async fn get_session(&self, cookie_header: Option<&str>) -> SessionResult<Session> {
        let id = self.get_session_id(cookie_header)?;
        self.get_session_by_id(&id).await
    }

    /// Load a session by id; a missing record is `SessionError::NotFound`
    pub async fn get_session_by_id(&self, id: &str) -> SessionResult<Session> {
        let record = self
            .store
            .get(id)
            .await?
            .ok_or_else(|| SessionError::NotFound { id: id.to_string() })?;

        let mut session: Session =
            serde_json::from_str(&record).map_err(|source| SessionError::Corrupt {
                id: id.to_string(),
                source,
            })?;

        if session.id.is_empty() {
            session.id = id.to_string();
        }

        Ok(session)
    }

    /// Persist the full record, overwriting whatever is stored under its id
    pub async fn set_session(&self, session: &Session) -> SessionResult<bool> {
        let record = serde_json::to_string(session)?;
        self.store.set(&session.id, record).await?;
        Ok(true)
    }

    /// Create and persist a new guest session
    pub async fn create_session(&self) -> SessionResult<Session> {
        let session = Session::new(Session::generate_id());
        self.set_session(&session).await?;

        debug!(session_id = %session.id, "Created guest session");
        Ok(session)
    }

    /// Apply the lifetime and inactivity limits
    ///
    /// Returns `false` after regenerating the session as a guest when either
    /// limit is exceeded; otherwise refreshes `activity` and returns `true`.
    pub async fn check_activity_session(&self, session: &mut Session) -> SessionResult<bool> {
        let now = Utc::now();

        if self.is_expired(session, now) {
            warn!(
                session_id = %session.id,
                "session too long inactive or session expired, regenerate session."
            );
            self.regenerate(session, SessionUser::guest()).await?;
            return Ok(false);
        }

        session.activity = now;
        self.set_session(session).await?;
        Ok(true)
    }

    /// Replace `session` with a fresh record for `user` and drop the old one
    pub async fn regenerate(&self, session: &mut Session, user: SessionUser) -> SessionResult<()> {
        let previous = std::mem::replace(session, Session::new(Session::generate_id()));
        session.user = user;

        self.store.destroy(&previous.id).await?;
        self.set_session(session).await?;

        debug!(
            old_session = %previous.id,
            new_session = %session.id,
            user = %session.user.name,
            "Session regenerated"
        );
        Ok(())
    }

    /// Touch the activity timestamp of a stored session
    pub async fn set_activity(&self, id: &str) -> SessionResult<DateTime<Utc>> {
        let mut session = self.get_session_by_id(id).await?;
        session.activity = Utc::now();
        self.set_session(&session).await?;
        Ok(session.activity)
    }

    pub async fn get_last_activity(&self, id: &str) -> SessionResult<DateTime<Utc>> {
        Ok(self.get_session_by_id(id).await?.activity)
    }

    pub async fn get_data(&self, id: &str, key: &str) -> SessionResult<Option<Value>> {
        Ok(self.get_session_by_id(id).await?.data.get(key).cloned())
    }

    pub async fn set_data(&self, id: &str, key: &str, value: Value) -> SessionResult<()> {
        let mut session = self.get_session_by_id(id).await?;
        session.data.insert(key.to_string(), value);
        self.set_session(&session).await?;
        Ok(())
    }

    /// Remove one data entry, returning the previous value
    pub async fn delete_data(&self, id: &str, key: &str) -> SessionResult<Option<Value>> {
        let mut session = self.get_session_by_id(id).await?;
        let removed = session.data.remove(key);
        if removed.is_some() {
            self.set_session(&session).await?;
        }
        Ok(removed)
    }

    /// Signed, percent-encoded cookie value for `session`
    pub fn signed_cookie(&self, session: &Session) -> String {
        let mut mac = self.signer.clone();
        mac.update(session.id.as_bytes());
        let signature = STANDARD_NO_PAD.encode(mac.finalize().into_bytes());

        urlencoding::encode(&format!("s:{}.{}", session.id, signature)).into_owned()
    }

    /// Destroy every stored session past either limit
    pub async fn purge_expired(&self) -> SessionResult<usize> {
        let now = Utc::now();
        let mut purged = 0;

        for id in self.store.ids().await? {
            let expired = match self.get_session_by_id(&id).await {
                Ok(session) => self.is_expired(&session, now),
                Err(SessionError::NotFound { .. }) => false,
                Err(SessionError::Corrupt { .. }) => true,
                Err(e) => return Err(e),
            };

            if expired {
                self.store.destroy(&id).await?;
                purged += 1;
            }
        }

        if purged > 0 {
            info!("Purged {} expired sessions", purged);
        }
        Ok(purged)
    }

    fn is_expired(&self, session: &Session, now: DateTime<Utc>) -> bool {
        now - session.start > self.max_life || now - session.activity > self.inactive_time
    }
}

fn seconds(value: u64, field: &'static str) -> SessionResult<Duration> {
    i64::try_from(value)
        .ok()
        .and_then(Duration::try_seconds)
        .ok_or_else(|| SessionError::config(field, "value is out of range"))
}

/// Strip the signing marker and signature from a cookie value and decode the id
fn parse_signed_value(value: &str) -> SessionResult<String> {
    let unprefixed = SIGNED_PREFIXES
        .iter()
        .find_map(|prefix| value.strip_prefix(prefix))
        .unwrap_or(value);

    let raw_id = match unprefixed.rfind('.') {
        Some(pos) => &unprefixed[..pos],
        None => unprefixed,
    };

    if raw_id.is_empty() {
        return Err(SessionError::MalformedCookie {
            message: "empty session id".to_string(),
        });
    }

    urlencoding::decode(raw_id)
        .map(|id| id.into_owned())
        .map_err(|e| SessionError::MalformedCookie {
            message: e.to_string(),
        })
}
