//! Configuration resolution and path discovery.
//!
//! Resolution order: CLI argument → `EP_CONFIG` → `EP_CONFIG_DIR` → XDG path → defaults.

use std::path::{Path, PathBuf};

/// Where the configuration file was found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ConfigSource {
    /// Explicitly provided via CLI argument.
    CliArgument,

    /// Set via environment variable.
    Environment,

    /// Found in XDG config directory.
    XdgConfig,

    /// Using built-in defaults.
    #[default]
    BuiltinDefault,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::CliArgument => write!(f, "CLI argument"),
            ConfigSource::Environment => write!(f, "environment variable"),
            ConfigSource::XdgConfig => write!(f, "XDG config"),
            ConfigSource::BuiltinDefault => write!(f, "builtin default"),
        }
    }
}

/// A resolved configuration location.
#[derive(Debug, Clone, Default)]
pub struct ConfigPath {
    /// Path to config.json (or None when defaults apply).
    pub path: Option<PathBuf>,

    /// Source of the config (for diagnostics).
    pub source: ConfigSource,
}

/// Environment variable names.
pub const ENV_CONFIG_PATH: &str = "EP_CONFIG";
pub const ENV_CONFIG_DIR: &str = "EP_CONFIG_DIR";

/// Standard config file name.
pub const CONFIG_FILENAME: &str = "config.json";

/// Application name for XDG directories.
const APP_NAME: &str = "epiphase";

/// Resolve the configuration path using the standard resolution order.
///
/// An explicit CLI path is returned even when it does not exist so the
/// loader can report it; the other steps are skipped when their file is
/// missing.
pub fn resolve_config(cli_path: Option<&Path>) -> ConfigPath {
    resolve_with_env(
        cli_path,
        std::env::var(ENV_CONFIG_PATH).ok().map(PathBuf::from),
        std::env::var(ENV_CONFIG_DIR).ok().map(PathBuf::from),
        xdg_config_dir(),
    )
}

fn resolve_with_env(
    cli_path: Option<&Path>,
    env_path: Option<PathBuf>,
    env_dir: Option<PathBuf>,
    xdg_dir: Option<PathBuf>,
) -> ConfigPath {
    // 1. CLI argument
    if let Some(path) = cli_path {
        return ConfigPath {
            path: Some(path.to_path_buf()),
            source: ConfigSource::CliArgument,
        };
    }

    // 2. Environment variable (direct path)
    if let Some(path) = env_path.filter(|p| p.exists()) {
        return ConfigPath {
            path: Some(path),
            source: ConfigSource::Environment,
        };
    }

    // 3. Environment variable (config dir)
    if let Some(path) = env_dir.map(|d| d.join(CONFIG_FILENAME)).filter(|p| p.exists()) {
        return ConfigPath {
            path: Some(path),
            source: ConfigSource::Environment,
        };
    }

    // 4. XDG config directory
    if let Some(path) = xdg_dir.map(|d| d.join(CONFIG_FILENAME)).filter(|p| p.exists()) {
        return ConfigPath {
            path: Some(path),
            source: ConfigSource::XdgConfig,
        };
    }

    ConfigPath::default()
}

/// Get the XDG config directory for epiphase.
pub fn xdg_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_NAME))
}
