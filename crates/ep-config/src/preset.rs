//! Configuration presets for common workloads.
//!
//! - Default: balanced budgets suitable for interactive analysis
//! - Quick: small budgets for smoke runs and CI
//! - Thorough: large budgets and a wide tau search for final fits

use crate::engine::{EngineConfig, EstimationConfig, TauConfig, TrendConfig};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Available configuration presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresetName {
    /// Balanced budgets
    Default,
    /// Small budgets, fixed daily tau
    Quick,
    /// Large budgets, wide tau search
    Thorough,
}

impl PresetName {
    /// All available preset names.
    pub const ALL: &'static [PresetName] =
        &[PresetName::Default, PresetName::Quick, PresetName::Thorough];

    /// Get preset name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            PresetName::Default => "default",
            PresetName::Quick => "quick",
            PresetName::Thorough => "thorough",
        }
    }

    /// Parse preset name from string.
    pub fn parse(s: &str) -> Option<PresetName> {
        match s.to_lowercase().as_str() {
            "default" | "standard" => Some(PresetName::Default),
            "quick" | "fast" | "ci" => Some(PresetName::Quick),
            "thorough" | "full" => Some(PresetName::Thorough),
            _ => None,
        }
    }

    /// Get a description of the preset.
    pub fn description(&self) -> &'static str {
        match self {
            PresetName::Default => "Balanced trial budgets with a three-candidate tau search",
            PresetName::Quick => "Small trial budgets and a fixed daily tau for smoke runs",
            PresetName::Thorough => "Large trial budgets and a wide tau search for final fits",
        }
    }
}

impl fmt::Display for PresetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PresetName {
    type Err = PresetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PresetName::parse(s).ok_or_else(|| PresetError::UnknownPreset(s.to_string()))
    }
}

/// Errors related to preset operations.
#[derive(Debug, Clone)]
pub enum PresetError {
    /// Unknown preset name.
    UnknownPreset(String),
}

impl fmt::Display for PresetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PresetError::UnknownPreset(name) => {
                write!(
                    f,
                    "Unknown preset '{}'. Available: {}",
                    name,
                    PresetName::ALL
                        .iter()
                        .map(|p| p.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                )
            }
        }
    }
}

impl std::error::Error for PresetError {}

/// Get the engine configuration for a preset.
pub fn get_preset(name: PresetName) -> EngineConfig {
    match name {
        PresetName::Default => EngineConfig::default(),
        PresetName::Quick => quick_preset(),
        PresetName::Thorough => thorough_preset(),
    }
}

fn quick_preset() -> EngineConfig {
    EngineConfig {
        estimation: EstimationConfig {
            trial_budget: 3_000,
            timeout_secs: 10.0,
            patience: 25,
            ..EstimationConfig::default()
        },
        tau: TauConfig {
            fixed: Some(1440),
            ..TauConfig::default()
        },
        ..EngineConfig::default()
    }
}

fn thorough_preset() -> EngineConfig {
    EngineConfig {
        trend: TrendConfig {
            min_phase_days: 5,
            ..TrendConfig::default()
        },
        estimation: EstimationConfig {
            trial_budget: 100_000,
            timeout_secs: 300.0,
            patience: 200,
            tolerance: 1e-12,
            ..EstimationConfig::default()
        },
        tau: TauConfig {
            fixed: None,
            candidates: vec![60, 120, 240, 360, 480, 720, 1440],
            search_trial_budget: 5_000,
        },
        ..EngineConfig::default()
    }
}

/// Information about a preset for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresetInfo {
    pub name: String,
    pub description: String,
    pub trial_budget: usize,
    pub timeout_secs: f64,
    pub tau_fixed: Option<u32>,
    pub tau_candidates: Vec<u32>,
}

impl PresetInfo {
    /// Create info from a preset.
    pub fn from_preset(name: PresetName) -> Self {
        let config = get_preset(name);
        Self {
            name: name.as_str().to_string(),
            description: name.description().to_string(),
            trial_budget: config.estimation.trial_budget,
            timeout_secs: config.estimation.timeout_secs,
            tau_fixed: config.tau.fixed,
            tau_candidates: config.tau.candidates,
        }
    }
}

/// List all available presets with summary information.
pub fn list_presets() -> Vec<PresetInfo> {
    PresetName::ALL
        .iter()
        .map(|&name| PresetInfo::from_preset(name))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::validate_config;

    #[test]
    fn test_preset_name_parsing() {
        assert_eq!(PresetName::parse("default"), Some(PresetName::Default));
        assert_eq!(PresetName::parse("QUICK"), Some(PresetName::Quick));
        assert_eq!(PresetName::parse("ci"), Some(PresetName::Quick));
        assert_eq!(PresetName::parse("full"), Some(PresetName::Thorough));
        assert_eq!(PresetName::parse("unknown"), None);
    }

    #[test]
    fn test_every_preset_validates() {
        for &name in PresetName::ALL {
            assert!(validate_config(&get_preset(name)).is_ok(), "{}", name);
        }
    }

    #[test]
    fn test_quick_preset_fixes_tau() {
        let config = get_preset(PresetName::Quick);
        assert_eq!(config.tau.fixed, Some(1440));
        assert!(config.estimation.trial_budget < EngineConfig::default().estimation.trial_budget);
    }

    #[test]
    fn test_list_presets() {
        let presets = list_presets();
        assert_eq!(presets.len(), 3);
        assert!(presets.iter().any(|p| p.name == "thorough"));
    }

    #[test]
    fn test_preset_error_display() {
        let err: PresetError = "nope".parse::<PresetName>().unwrap_err();
        let msg = format!("{}", err);
        assert!(msg.contains("Unknown preset"));
        assert!(msg.contains("quick"));
    }
}
