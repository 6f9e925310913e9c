//! Loading the engine configuration from disk.

use crate::engine::EngineConfig;
use crate::preset::{get_preset, PresetName};
use crate::resolve::{resolve_config, ConfigSource};
use crate::validate::{validate_config, ValidationError};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur during config loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("Invalid JSON in config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Semantic validation failed: {0}")]
    ValidationError(#[from] ValidationError),

    #[error("I/O error reading {path}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ConfigError {
    /// Error code for structured error reporting.
    pub fn code(&self) -> u32 {
        match self {
            ConfigError::ValidationError(inner) => inner.code(),
            ConfigError::ParseError { .. } => 11,
            ConfigError::NotFound { .. } | ConfigError::IoError { .. } => 10,
        }
    }
}

/// Configuration together with where it came from.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub config: EngineConfig,
    pub path: Option<PathBuf>,
    pub source: ConfigSource,
}

/// Configuration resolution options.
#[derive(Debug, Default)]
pub struct ConfigOptions {
    /// Explicit config file (highest priority).
    pub path: Option<PathBuf>,
    /// Preset used as the base when no file is found.
    pub preset: Option<PresetName>,
}

/// Load configuration with the standard resolution order.
///
/// A file, when found, fully determines the configuration; serde defaults
/// fill whatever it omits. Without a file the preset (or the built-in
/// defaults) applies. The result is always semantically validated.
pub fn load_config(options: &ConfigOptions) -> Result<ResolvedConfig, ConfigError> {
    let resolved = resolve_config(options.path.as_deref());

    let config = match &resolved.path {
        Some(path) => load_config_file(path)?,
        None => get_preset(options.preset.unwrap_or(PresetName::Default)),
    };

    validate_config(&config)?;

    Ok(ResolvedConfig {
        config,
        path: resolved.path,
        source: resolved.source,
    })
}

/// Parse one configuration file without validating it.
pub fn load_config_file(path: &Path) -> Result<EngineConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound {
            path: path.to_path_buf(),
        });
    }

    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::IoError {
        path: path.to_path_buf(),
        source: e,
    })?;

    serde_json::from_str(&content).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_missing_file_is_not_found() {
        let options = ConfigOptions {
            path: Some(PathBuf::from("/nonexistent/epiphase/config.json")),
            preset: None,
        };
        let err = load_config(&options).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound { .. }));
        assert_eq!(err.code(), 10);
    }

    #[test]
    fn test_parse_error_carries_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = load_config_file(&path).unwrap_err();
        match err {
            ConfigError::ParseError { path: p, .. } => assert_eq!(p, path),
            other => panic!("unexpected error: {other}"),
        }
    }
}
