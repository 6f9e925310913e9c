//! Configuration validation and resolution tests against real files.
//!
//! Covers:
//! - Partial JSON documents filled by serde defaults
//! - Semantic rejection of bad values with field paths
//! - Resolution order (CLI > EP_CONFIG > EP_CONFIG_DIR)
//! - Preset determinism

use ep_config::preset::{get_preset, PresetName};
use ep_config::resolve::{resolve_config, ConfigSource, ENV_CONFIG_DIR, ENV_CONFIG_PATH};
use ep_config::{load_config, ConfigError, ConfigOptions, EngineConfig, ValidationError};
use std::env;
use std::fs;
use std::path::Path;
use std::sync::{Mutex, OnceLock};
use tempfile::TempDir;

static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

struct EnvGuard {
    keys: Vec<String>,
    saved: Vec<Option<String>>,
}

impl EnvGuard {
    fn new(keys: &[&str]) -> Self {
        let mut saved = Vec::with_capacity(keys.len());
        for key in keys {
            saved.push(env::var(key).ok());
        }
        Self {
            keys: keys.iter().map(|k| k.to_string()).collect(),
            saved,
        }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (idx, key) in self.keys.iter().enumerate() {
            match self.saved.get(idx).and_then(|v| v.as_ref()) {
                Some(val) => env::set_var(key, val),
                None => env::remove_var(key),
            }
        }
    }
}

fn with_env_lock<T>(f: impl FnOnce() -> T) -> T {
    let _guard = ENV_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .expect("env lock poisoned");
    f()
}

fn write_config(path: &Path, body: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create config parent");
    }
    fs::write(path, body).expect("write config");
}

#[test]
fn partial_file_loads_with_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("custom.json");
    write_config(
        &path,
        r#"{"schema_version": "1.0.0", "estimation": {"seed": 7, "workers": 2}}"#,
    );

    let resolved = load_config(&ConfigOptions {
        path: Some(path.clone()),
        preset: None,
    })
    .expect("load config");

    assert_eq!(resolved.source, ConfigSource::CliArgument);
    assert_eq!(resolved.path.as_deref(), Some(path.as_path()));
    assert_eq!(resolved.config.estimation.seed, 7);
    assert_eq!(resolved.config.estimation.workers, 2);
    assert_eq!(resolved.config.trend, EngineConfig::default().trend);
}

#[test]
fn invalid_tau_is_rejected_with_field() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");
    write_config(&path, r#"{"tau": {"fixed": 7}}"#);

    let err = load_config(&ConfigOptions {
        path: Some(path),
        preset: None,
    })
    .unwrap_err();

    match err {
        ConfigError::ValidationError(ValidationError::InvalidValue { field, .. }) => {
            assert_eq!(field, "tau.fixed");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn wrong_type_is_parse_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");
    write_config(&path, r#"{"trend": {"min_phase_days": "seven"}}"#);

    let err = load_config(&ConfigOptions {
        path: Some(path),
        preset: None,
    })
    .unwrap_err();
    assert!(matches!(err, ConfigError::ParseError { .. }));
}

#[test]
fn env_path_beats_config_dir() {
    with_env_lock(|| {
        let _guard = EnvGuard::new(&[ENV_CONFIG_PATH, ENV_CONFIG_DIR]);
        let dir = TempDir::new().unwrap();
        let direct = dir.path().join("direct.json");
        let config_dir = dir.path().join("conf");
        write_config(&direct, "{}");
        write_config(&config_dir.join("config.json"), "{}");

        env::set_var(ENV_CONFIG_PATH, &direct);
        env::set_var(ENV_CONFIG_DIR, &config_dir);
        let resolved = resolve_config(None);
        assert_eq!(resolved.source, ConfigSource::Environment);
        assert_eq!(resolved.path, Some(direct.clone()));

        env::remove_var(ENV_CONFIG_PATH);
        let resolved = resolve_config(None);
        assert_eq!(resolved.path, Some(config_dir.join("config.json")));

        let cli = dir.path().join("cli.json");
        let resolved = resolve_config(Some(&cli));
        assert_eq!(resolved.source, ConfigSource::CliArgument);
        assert_eq!(resolved.path, Some(cli));
    });
}

#[test]
fn preset_applies_without_file() {
    with_env_lock(|| {
        let _guard = EnvGuard::new(&[ENV_CONFIG_PATH, ENV_CONFIG_DIR]);
        let dir = TempDir::new().unwrap();
        env::remove_var(ENV_CONFIG_PATH);
        env::set_var(ENV_CONFIG_DIR, dir.path());

        let resolved = load_config(&ConfigOptions {
            path: None,
            preset: Some(PresetName::Quick),
        });
        // An XDG config on the host may take precedence; only check the
        // preset when nothing was found on disk.
        if let Ok(resolved) = resolved {
            if resolved.source == ConfigSource::BuiltinDefault {
                assert_eq!(resolved.config, get_preset(PresetName::Quick));
            }
        }
    });
}

#[test]
fn presets_are_deterministic() {
    for &name in PresetName::ALL {
        assert_eq!(get_preset(name), get_preset(name));
    }
}
