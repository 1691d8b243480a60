//! Session store adapters
//!
//! A store is a plain key/value persistence layer for serialized session
//! records. It knows nothing about expiry or record layout; the session
//! manager owns both.

use crate::error::StoreError;
use async_trait::async_trait;
use gantry_core::StoreConfig;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Uniform interface over the session persistence backends
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Backend discriminator, matching the `type` of its configuration
    fn kind(&self) -> &'static str;

    /// Load the serialized record for `id`
    async fn get(&self, id: &str) -> Result<Option<String>, StoreError>;

    /// Write the serialized record for `id`, replacing any previous one
    async fn set(&self, id: &str, record: String) -> Result<(), StoreError>;

    /// Remove the record for `id`; removing a missing record is not an error
    async fn destroy(&self, id: &str) -> Result<(), StoreError>;

    /// All stored session ids
    async fn ids(&self) -> Result<Vec<String>, StoreError>;
}

/// Open the backend described by `config`
pub async fn open_store(config: &StoreConfig) -> Result<Arc<dyn SessionStore>, StoreError> {
    let store: Arc<dyn SessionStore> = match config {
        StoreConfig::InMemory => Arc::new(MemoryStore::new()),
        StoreConfig::File { dir } => Arc::new(FileStore::new(dir).await?),
        #[cfg(feature = "sqlite")]
        StoreConfig::Sqlite { url } => Arc::new(SqliteStore::connect(url).await?),
        #[cfg(not(feature = "sqlite"))]
        StoreConfig::Sqlite { .. } => {
            return Err(StoreError::Unavailable {
                message: "sqlite session store requires the `sqlite` feature".to_string(),
            })
        }
    };

    info!(kind = store.kind(), "Session store opened");
    Ok(store)
}

/// Process-local store; records vanish on restart
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    fn kind(&self) -> &'static str {
        "in_memory"
    }

    async fn get(&self, id: &str) -> Result<Option<String>, StoreError> {
        Ok(self.records.read().await.get(id).cloned())
    }

    async fn set(&self, id: &str, record: String) -> Result<(), StoreError> {
        self.records.write().await.insert(id.to_string(), record);
        Ok(())
    }

    async fn destroy(&self, id: &str) -> Result<(), StoreError> {
        self.records.write().await.remove(id);
        Ok(())
    }

    async fn ids(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.records.read().await.keys().cloned().collect())
    }
}

/// One JSON file per session under a directory
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub async fn new<P: AsRef<Path>>(dir: P) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&dir).await?;

        info!("File session store initialized at: {}", dir.display());
        Ok(Self { dir })
    }

    /// Ids come from client cookies, so only plain tokens map to a file
    fn path_for(&self, id: &str) -> Option<PathBuf> {
        let valid = !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        valid.then(|| self.dir.join(format!("{}.json", id)))
    }
}

#[async_trait]
impl SessionStore for FileStore {
    fn kind(&self) -> &'static str {
        "file"
    }

    async fn get(&self, id: &str) -> Result<Option<String>, StoreError> {
        let Some(path) = self.path_for(id) else {
            return Ok(None);
        };

        match tokio::fs::read_to_string(&path).await {
            Ok(record) => Ok(Some(record)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set(&self, id: &str, record: String) -> Result<(), StoreError> {
        let path = self.path_for(id).ok_or_else(|| StoreError::InvalidKey {
            key: id.to_string(),
        })?;

        tokio::fs::write(&path, record).await?;
        debug!("Saved session {} to {}", id, path.display());
        Ok(())
    }

    async fn destroy(&self, id: &str) -> Result<(), StoreError> {
        let Some(path) = self.path_for(id) else {
            return Ok(());
        };

        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!("Deleted session file: {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn ids(&self) -> Result<Vec<String>, StoreError> {
        let mut ids = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                ids.push(stem.to_string());
            }
        }

        Ok(ids)
    }
}

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;

#[cfg(feature = "sqlite")]
mod sqlite {
    use super::SessionStore;
    use crate::error::StoreError;
    use async_trait::async_trait;
    use sqlx::{
        sqlite::{SqliteConnectOptions, SqlitePoolOptions},
        Row, SqlitePool,
    };
    use std::str::FromStr;
    use tracing::info;

    /// Sessions in a single SQLite table
    pub struct SqliteStore {
        pool: SqlitePool,
    }

    impl SqliteStore {
        pub async fn connect(url: &str) -> Result<Self, StoreError> {
            let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);

            // An in-memory database exists per connection
            let max_connections = if url.contains(":memory:") { 1 } else { 5 };
            let pool = SqlitePoolOptions::new()
                .max_connections(max_connections)
                .connect_with(options)
                .await?;

            sqlx::query(
                r#"
                CREATE TABLE IF NOT EXISTS sessions (
                    id TEXT PRIMARY KEY,
                    record TEXT NOT NULL,
                    updated_at TEXT DEFAULT CURRENT_TIMESTAMP
                )
                "#,
            )
            .execute(&pool)
            .await?;

            info!("SQLite session store connected: {}", url);
            Ok(Self { pool })
        }
    }

    #[async_trait]
    impl SessionStore for SqliteStore {
        fn kind(&self) -> &'static str {
            "sqlite"
        }

        async fn get(&self, id: &str) -> Result<Option<String>, StoreError> {
            let row = sqlx::query("SELECT record FROM sessions WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

            Ok(row.map(|row| row.get::<String, _>("record")))
        }

        async fn set(&self, id: &str, record: String) -> Result<(), StoreError> {
            sqlx::query(
                r#"
                INSERT INTO sessions (id, record, updated_at)
                VALUES (?, ?, CURRENT_TIMESTAMP)
                ON CONFLICT(id) DO UPDATE SET record = excluded.record, updated_at = CURRENT_TIMESTAMP
                "#,
            )
            .bind(id)
            .bind(record)
            .execute(&self.pool)
            .await?;
            Ok(())
        }

        async fn destroy(&self, id: &str) -> Result<(), StoreError> {
            sqlx::query("DELETE FROM sessions WHERE id = ?")
                .bind(id)
                .execute(&self.pool)
                .await?;
            Ok(())
        }

        async fn ids(&self) -> Result<Vec<String>, StoreError> {
            let rows = sqlx::query("SELECT id FROM sessions")
                .fetch_all(&self.pool)
                .await?;

            Ok(rows
                .into_iter()
                .map(|row| row.get::<String, _>("id"))
                .collect())
        }
    }
}
