//! ServiceConfig - サービスの設定
//!
//! TOML から読み込みます。未指定の項目はデフォルト値。
//!
//! ```toml
//! default_dependency_type = "finish-to-start"
//! include_templates = false
//! max_path_tasks = 500
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::DependencyType;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceConfig {
    /// Edge type used when "add dependency" is called without one.
    pub default_dependency_type: DependencyType,

    /// Whether template tasks take part in graph and critical-path queries.
    pub include_templates: bool,

    /// Upper bound on the task set handed to the path ranker.
    pub max_path_tasks: Option<usize>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            default_dependency_type: DependencyType::FinishToStart,
            include_templates: false,
            max_path_tasks: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

impl ServiceConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_path_tasks == Some(0) {
            return Err(ConfigError::Invalid(
                "max_path_tasks must be at least 1 when set".to_string(),
            ));
        }
        Ok(())
    }

    pub fn with_default_dependency_type(mut self, dependency_type: DependencyType) -> Self {
        self.default_dependency_type = dependency_type;
        self
    }

    pub fn with_include_templates(mut self, include: bool) -> Self {
        self.include_templates = include;
        self
    }

    pub fn with_max_path_tasks(mut self, limit: usize) -> Self {
        self.max_path_tasks = Some(limit);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_gives_defaults() {
        let config = ServiceConfig::from_toml_str("").unwrap();
        assert_eq!(config, ServiceConfig::default());
    }

    #[test]
    fn parses_all_fields() {
        let config = ServiceConfig::from_toml_str(
            r#"
            default_dependency_type = "start-to-start"
            include_templates = true
            max_path_tasks = 250
            "#,
        )
        .unwrap();
        assert_eq!(config.default_dependency_type, DependencyType::StartToStart);
        assert!(config.include_templates);
        assert_eq!(config.max_path_tasks, Some(250));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = ServiceConfig::from_toml_str("max_tasks = 3").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn zero_limit_is_invalid() {
        let err = ServiceConfig::from_toml_str("max_path_tasks = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = ServiceConfig::load("/definitely/not/here.toml").unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.toml"));
    }
}
