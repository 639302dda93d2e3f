//! Configuration types and loading
//!
//! Settings are layered: built-in defaults, then an optional file, then
//! `QUERYFORGE_*` environment variables (`QUERYFORGE_RENDER__BACKEND=document`).

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::QfError;

/// Main configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ForgeConfig {
    /// Logging configuration
    pub logging: LoggingConfig,

    /// Rendering configuration
    pub render: RenderConfig,

    /// Document metadata configuration
    pub schema: SchemaConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is not set
    pub filter: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info,qf_conditions=debug,qf_schema=debug".to_string(),
            json: false,
        }
    }
}

/// Storage backend whose native predicate syntax is rendered
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    #[default]
    Sql,
    Document,
}

impl std::str::FromStr for BackendKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sql" => Ok(BackendKind::Sql),
            "document" | "mongo" => Ok(BackendKind::Document),
            other => Err(ConfigError::InvalidValue {
                key: "render.backend".to_string(),
                message: format!("unknown backend '{}'", other),
            }),
        }
    }
}

/// Bind placeholder style for relational backends
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PlaceholderStyle {
    /// `$1`, `$2`, ... (PostgreSQL)
    #[default]
    Dollar,
    /// `?` (MySQL, SQLite)
    Question,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Backend used when none is given explicitly
    pub backend: BackendKind,
    /// Alias used to qualify columns of the main container in SQL output
    pub main_alias: String,
    /// Placeholder style for SQL binds
    pub placeholder: PlaceholderStyle,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Sql,
            main_alias: "t0".to_string(),
            placeholder: PlaceholderStyle::Dollar,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SchemaConfig {
    /// Document types whose metadata is discovered eagerly at startup
    pub preload: Vec<String>,
}

/// Configuration error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
    #[error("Config source error: {0}")]
    Source(#[from] config::ConfigError),
}

impl From<ConfigError> for QfError {
    fn from(err: ConfigError) -> Self {
        QfError::Config(err.to_string())
    }
}

impl ForgeConfig {
    /// Load configuration from environment variables only
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(None)
    }

    /// Load configuration from an optional file, overridden by environment variables
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder =
            config::Config::builder().add_source(config::Config::try_from(&Self::default())?);

        if let Some(path) = path {
            tracing::debug!(path = %path.display(), "Loading configuration file");
            builder = builder.add_source(config::File::from(path).required(true));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("QUERYFORGE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.render.main_alias.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "render.main_alias".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        if self.render.main_alias.contains('.') {
            return Err(ConfigError::InvalidValue {
                key: "render.main_alias".to_string(),
                message: "must not contain '.'".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ForgeConfig::default();
        assert_eq!(config.render.backend, BackendKind::Sql);
        assert_eq!(config.render.main_alias, "t0");
        assert!(!config.logging.json);
        assert!(config.schema.preload.is_empty());
    }

    #[test]
    fn test_backend_from_str() {
        assert_eq!("sql".parse::<BackendKind>().unwrap(), BackendKind::Sql);
        assert_eq!("mongo".parse::<BackendKind>().unwrap(), BackendKind::Document);
        assert!("oracle".parse::<BackendKind>().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = std::env::temp_dir().join(format!("qf-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("queryforge.yaml");
        std::fs::write(
            &path,
            "render:\n  backend: document\n  main_alias: m\nschema:\n  preload: [Order]\n",
        )
        .unwrap();

        let config = ForgeConfig::load(Some(&path)).unwrap();
        assert_eq!(config.render.backend, BackendKind::Document);
        assert_eq!(config.render.main_alias, "m");
        assert_eq!(config.schema.preload, vec!["Order".to_string()]);
        // untouched sections keep their defaults
        assert_eq!(config.render.placeholder, PlaceholderStyle::Dollar);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_invalid_main_alias() {
        let dir = std::env::temp_dir().join(format!("qf-config-bad-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("queryforge.yaml");
        std::fs::write(&path, "render:\n  main_alias: \"a.b\"\n").unwrap();

        let err = ForgeConfig::load(Some(&path)).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));

        std::fs::remove_dir_all(&dir).ok();
    }
}
