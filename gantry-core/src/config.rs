//! Configuration loading and validation

use crate::error::{ErrorContext, GantryError, GantryResult};
use crate::logging::LoggingConfig;
use crate::types::{
    GantryConfig, PathsConfig, RightsConfig, ServerConfig, SessionConfig, StoreConfig,
};

use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Prefix for environment overrides, e.g. `GANTRY__SERVER__PORT=9000`
pub const ENV_PREFIX: &str = "GANTRY";

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            dev_mode: false,
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("gantry");

        Self {
            modules: PathBuf::from("modules"),
            data_dir,
        }
    }
}

impl Default for GantryConfig {
    fn default() -> Self {
        let mut stores = HashMap::new();
        stores.insert("memory".to_string(), StoreConfig::InMemory);

        Self {
            server: ServerConfig::default(),
            session: SessionConfig {
                stores,
                active_store: "memory".to_string(),
                secret: uuid::Uuid::new_v4().to_string(),
                key: "gantry.sid".to_string(),
                max_life: 36_000,
                inactive_time: 3_600,
            },
            rights: RightsConfig::default(),
            paths: PathsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl GantryConfig {
    /// Load configuration from an optional TOML file plus `GANTRY__*` environment overrides
    pub fn load(path: Option<&Path>) -> GantryResult<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            if !path.exists() {
                return Err(GantryError::NotFound {
                    resource: format!("config file {}", path.display()),
                    context: ErrorContext::new("config")
                        .with_operation("load")
                        .with_suggestion("Check the --config path"),
                });
            }
            builder = builder.add_source(config::File::from(path));
        }

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__"),
        );

        let settings = builder.build().map_err(|e| GantryError::Config {
            message: format!("Failed to read configuration: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config").with_operation("build"),
        })?;

        let config: GantryConfig = settings.try_deserialize().map_err(|e| GantryError::Config {
            message: format!("Failed to parse configuration: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config")
                .with_operation("deserialize")
                .with_suggestion("Check field names and value types in the config file"),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a TOML string without consulting the environment
    pub fn from_toml_str(content: &str) -> GantryResult<Self> {
        let config: GantryConfig = toml::from_str(content).map_err(|e| GantryError::Config {
            message: format!("Failed to parse config: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config")
                .with_operation("parse_toml")
                .with_suggestion("Check TOML syntax in config file"),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the parts of the configuration that are not owned by a service
    pub fn validate(&self) -> GantryResult<()> {
        if self.server.port == 0 {
            return Err(GantryError::Validation {
                message: "server.port must be greater than 0".to_string(),
                field: Some("server.port".to_string()),
                context: ErrorContext::new("config").with_operation("validate"),
            });
        }

        if self.session.max_life == 0 {
            return Err(GantryError::Validation {
                message: "session.max_life must be greater than 0".to_string(),
                field: Some("session.max_life".to_string()),
                context: ErrorContext::new("config")
                    .with_operation("validate")
                    .with_suggestion("max_life is the absolute session lifetime in seconds"),
            });
        }

        if self.session.inactive_time == 0 {
            return Err(GantryError::Validation {
                message: "session.inactive_time must be greater than 0".to_string(),
                field: Some("session.inactive_time".to_string()),
                context: ErrorContext::new("config")
                    .with_operation("validate")
                    .with_suggestion("inactive_time is the allowed idle period in seconds"),
            });
        }

        if self.paths.modules.as_os_str().is_empty() {
            return Err(GantryError::Validation {
                message: "paths.modules must point to the controller module tree".to_string(),
                field: Some("paths.modules".to_string()),
                context: ErrorContext::new("config").with_operation("validate"),
            });
        }

        Ok(())
    }

    /// Server bind address
    pub fn address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
