//! Configuration type definitions

use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Top-level framework configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GantryConfig {
    pub server: ServerConfig,
    pub session: SessionConfig,
    pub rights: RightsConfig,
    pub paths: PathsConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub dev_mode: bool,
}

/// Session manager settings
///
/// Required fields default to empty values so the session manager can name
/// the missing field instead of failing inside the deserializer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Named store configurations
    #[serde(default)]
    pub stores: HashMap<String, StoreConfig>,
    /// Key into `stores` selecting the live backend
    #[serde(default)]
    pub active_store: String,
    /// Secret used to sign session cookies
    #[serde(default)]
    pub secret: String,
    /// Name of the session cookie
    #[serde(default)]
    pub key: String,
    /// Absolute session lifetime in seconds
    #[serde(default = "default_max_life")]
    pub max_life: u64,
    /// Allowed inactivity in seconds
    #[serde(default = "default_inactive_time")]
    pub inactive_time: u64,
}

fn default_max_life() -> u64 {
    36_000
}

fn default_inactive_time() -> u64 {
    3_600
}

/// Session store backend, discriminated by `type`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoreConfig {
    InMemory,
    File { dir: PathBuf },
    Sqlite { url: String },
}

impl StoreConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            StoreConfig::InMemory => "in_memory",
            StoreConfig::File { .. } => "file",
            StoreConfig::Sqlite { .. } => "sqlite",
        }
    }
}

/// Rights system settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RightsConfig {
    /// Check every call against the caller's ACL
    pub enabled: bool,
    /// JSON file with users, roles, groups and rights to seed the repository
    pub seed_file: Option<PathBuf>,
    /// JSON navigation tree served by the navigation endpoint
    pub navigation_file: Option<PathBuf>,
    /// Initial password for the `sysadmin` account
    pub admin_password: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Root of the controller module tree
    pub modules: PathBuf,
    /// Directory for file-backed data
    pub data_dir: PathBuf,
}
