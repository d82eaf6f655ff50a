//! SQLite engine configuration
//!
//! Loaded from TOML, for example:
//!
//! ```toml
//! path = "/var/lib/app/data.db"
//! foreign_keys = true
//! journal_mode = "WAL"
//!
//! [limits]
//! max_sql_length = 100000
//! max_variable_number = 999
//! max_compound_select = 500
//! ```

use serde::{Deserialize, Serialize};
use sqlbatch_core::{BatchError, Result};

/// Overrides for the SQLite run-time limits that bound compound statements.
///
/// `None` keeps the compiled-in default. SQLite never raises a limit above
/// its compile-time maximum.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitOverrides {
    #[serde(default)]
    pub max_sql_length: Option<u32>,
    #[serde(default)]
    pub max_variable_number: Option<u32>,
    #[serde(default)]
    pub max_compound_select: Option<u32>,
}

/// Configuration for opening a [`crate::SqliteEngine`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqliteConfig {
    /// Database file path, or `:memory:`
    #[serde(default = "default_path")]
    pub path: String,
    #[serde(default)]
    pub limits: LimitOverrides,
    #[serde(default = "default_foreign_keys")]
    pub foreign_keys: bool,
    /// Journal mode pragma, e.g. `WAL`; left untouched when absent
    #[serde(default)]
    pub journal_mode: Option<String>,
}

fn default_path() -> String {
    ":memory:".to_string()
}

fn default_foreign_keys() -> bool {
    true
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            path: default_path(),
            limits: LimitOverrides::default(),
            foreign_keys: default_foreign_keys(),
            journal_mode: None,
        }
    }
}

impl SqliteConfig {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn from_toml_str(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str)
            .map_err(|e| BatchError::Configuration(format!("invalid SQLite config: {}", e)))
    }

    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            BatchError::Configuration(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_toml() {
        let config = SqliteConfig::from_toml_str("").unwrap();
        assert_eq!(config, SqliteConfig::default());
        assert_eq!(config.path, ":memory:");
        assert!(config.foreign_keys);
    }

    #[test]
    fn test_limits_from_toml() {
        let config = SqliteConfig::from_toml_str(
            r#"
            path = "data.db"
            journal_mode = "WAL"

            [limits]
            max_variable_number = 999
            max_compound_select = 50
            "#,
        )
        .unwrap();
        assert_eq!(config.path, "data.db");
        assert_eq!(config.journal_mode.as_deref(), Some("WAL"));
        assert_eq!(config.limits.max_variable_number, Some(999));
        assert_eq!(config.limits.max_compound_select, Some(50));
        assert_eq!(config.limits.max_sql_length, None);
    }

    #[test]
    fn test_invalid_toml_is_configuration_error() {
        let err = SqliteConfig::from_toml_str("limits = 3").unwrap_err();
        assert!(matches!(err, BatchError::Configuration(_)));
    }
}
