//! epiphase configuration loading and validation.
//!
//! This crate provides:
//! - Typed Rust structs for the engine configuration (`config.json`)
//! - Config resolution (CLI → env → XDG → defaults)
//! - Semantic validation
//! - Presets for common workloads

pub mod engine;
pub mod load;
pub mod preset;
pub mod resolve;
pub mod validate;

pub use engine::{EngineConfig, EstimationConfig, TauConfig, TrendConfig};
pub use load::{load_config, load_config_file, ConfigError, ConfigOptions, ResolvedConfig};
pub use preset::{get_preset, list_presets, PresetError, PresetInfo, PresetName};
pub use resolve::{resolve_config, ConfigPath, ConfigSource};
pub use validate::{validate_config, ValidationError, ValidationResult};

/// Schema version for configuration files.
pub const CONFIG_SCHEMA_VERSION: &str = "1.0.0";
