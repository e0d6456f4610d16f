//! Core configuration.
//!
//! Settings are read from a JSON file. Every field has a default, so an
//! empty object `{}` is a valid configuration.

use crate::logging::default_log_level;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

const DEFAULT_LIMIT: u32 = 10;
const TASKS_DEFAULT_LIMIT: u32 = 5;
const MAX_LIMIT: u32 = 100;
const TOP_PROJECTS_LIMIT: usize = 3;
const MAX_LOG_FILE_BYTES: u64 = 10 * 1024 * 1024;
const MAX_LOG_FILES: usize = 5;

/// Settings consumed by services.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Page size used when a listing receives `limit < 1`.
    pub default_limit: u32,
    /// Page size for task listings receiving `limit < 1`.
    pub tasks_default_limit: u32,
    /// Requests above this page size are rejected.
    pub max_limit: u32,
    /// Also match task references stored under the legacy field name.
    ///
    /// Compatibility switch for stores written by earlier schema versions.
    /// Leave it off once the legacy field is migrated: documents carrying
    /// both names would otherwise be matched under either.
    pub include_legacy_project_field: bool,
    /// Number of projects kept by the top-projects report.
    pub top_projects_limit: usize,
    pub logging: LoggingConfig,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            default_limit: DEFAULT_LIMIT,
            tasks_default_limit: TASKS_DEFAULT_LIMIT,
            max_limit: MAX_LIMIT,
            include_legacy_project_field: false,
            top_projects_limit: TOP_PROJECTS_LIMIT,
            logging: LoggingConfig::default(),
        }
    }
}

/// Log sink settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// One of `trace|debug|info|warn|error`.
    pub level: String,
    /// Absolute directory for rotating log files; stderr when unset.
    pub directory: Option<PathBuf>,
    pub max_file_bytes: u64,
    pub keep_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level().to_string(),
            directory: None,
            max_file_bytes: MAX_LOG_FILE_BYTES,
            keep_files: MAX_LOG_FILES,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse(serde_json::Error),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "failed to parse config: {err}"),
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

impl CoreConfig {
    /// Parses and validates a JSON configuration document.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_limit == 0 {
            return Err(ConfigError::Invalid("max_limit must be at least 1".to_string()));
        }
        for (name, value) in [
            ("default_limit", self.default_limit),
            ("tasks_default_limit", self.tasks_default_limit),
        ] {
            if value == 0 || value > self.max_limit {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be between 1 and max_limit ({}), got {value}",
                    self.max_limit
                )));
            }
        }
        if self.top_projects_limit == 0 {
            return Err(ConfigError::Invalid(
                "top_projects_limit must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, CoreConfig};

    #[test]
    fn empty_object_yields_defaults() {
        let config = CoreConfig::from_json_str("{}").unwrap();
        assert_eq!(config, CoreConfig::default());
        assert_eq!(config.tasks_default_limit, 5);
        assert_eq!(config.default_limit, 10);
        assert!(!config.include_legacy_project_field);
    }

    #[test]
    fn partial_document_overrides_selected_fields() {
        let config = CoreConfig::from_json_str(
            r#"{"include_legacy_project_field": true, "logging": {"level": "warn"}}"#,
        )
        .unwrap();
        assert!(config.include_legacy_project_field);
        assert_eq!(config.logging.level, "warn");
        assert_eq!(config.max_limit, 100);
    }

    #[test]
    fn default_limit_above_ceiling_is_rejected() {
        let err = CoreConfig::from_json_str(r#"{"max_limit": 4}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(message) if message.contains("default_limit")));
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = CoreConfig::load(dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
