//! Typed engine configuration.
//!
//! Every field has a serde default so a partial `config.json` only needs to
//! name what it overrides:
//!
//! ```json
//! {
//!   "schema_version": "1.0.0",
//!   "estimation": { "trial_budget": 50000, "workers": 4 }
//! }
//! ```

use serde::{Deserialize, Serialize};

/// Root configuration for the modeling engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_schema_version")]
    pub schema_version: String,

    /// Change-point detection on the S-R trend.
    #[serde(default)]
    pub trend: TrendConfig,

    /// Per-phase parameter estimation.
    #[serde(default)]
    pub estimation: EstimationConfig,

    /// Tau (minutes per simulation step) selection.
    #[serde(default)]
    pub tau: TauConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            schema_version: default_schema_version(),
            trend: TrendConfig::default(),
            estimation: EstimationConfig::default(),
            tau: TauConfig::default(),
        }
    }
}

fn default_schema_version() -> String {
    crate::CONFIG_SCHEMA_VERSION.to_string()
}

/// Trend segmentation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendConfig {
    /// Shortest phase the segmenter may propose, in days.
    #[serde(default = "default_min_phase_days")]
    pub min_phase_days: usize,

    /// Multiplier on the per-segment penalty. Larger values give fewer phases.
    #[serde(default = "default_penalty")]
    pub penalty: f64,
}

impl Default for TrendConfig {
    fn default() -> Self {
        TrendConfig {
            min_phase_days: default_min_phase_days(),
            penalty: default_penalty(),
        }
    }
}

fn default_min_phase_days() -> usize {
    7
}

fn default_penalty() -> f64 {
    1.0
}

/// Differential-evolution settings for per-phase fitting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimationConfig {
    /// Maximum number of candidate evaluations per phase.
    #[serde(default = "default_trial_budget")]
    pub trial_budget: usize,

    /// Wall-clock limit per phase, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: f64,

    /// Generations without improvement before stopping early.
    #[serde(default = "default_patience")]
    pub patience: usize,

    /// Smallest RMSLE decrease that counts as an improvement.
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,

    /// Population size; 0 picks `max(10 * dimensions, 20)`.
    #[serde(default)]
    pub population: usize,

    /// Differential weight F.
    #[serde(default = "default_mutation")]
    pub mutation: f64,

    /// Crossover probability CR.
    #[serde(default = "default_crossover")]
    pub crossover: f64,

    /// RNG seed; identical seeds give identical fits.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Worker threads for candidate evaluation; 0 uses the rayon default.
    #[serde(default)]
    pub workers: usize,

    /// Fewest records a phase needs before it can be fitted.
    #[serde(default = "default_min_records")]
    pub min_records: usize,
}

impl Default for EstimationConfig {
    fn default() -> Self {
        EstimationConfig {
            trial_budget: default_trial_budget(),
            timeout_secs: default_timeout_secs(),
            patience: default_patience(),
            tolerance: default_tolerance(),
            population: 0,
            mutation: default_mutation(),
            crossover: default_crossover(),
            seed: default_seed(),
            workers: 0,
            min_records: default_min_records(),
        }
    }
}

fn default_trial_budget() -> usize {
    20_000
}

fn default_timeout_secs() -> f64 {
    60.0
}

fn default_patience() -> usize {
    60
}

fn default_tolerance() -> f64 {
    1e-10
}

fn default_mutation() -> f64 {
    0.7
}

fn default_crossover() -> f64 {
    0.9
}

fn default_seed() -> u64 {
    0x5EED_2020
}

fn default_min_records() -> usize {
    3
}

/// Tau handling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TauConfig {
    /// Fixed tau in minutes; `None` enables the search over `candidates`.
    #[serde(default)]
    pub fixed: Option<u32>,

    /// Candidate taus tried when no tau is fixed.
    #[serde(default = "default_tau_candidates")]
    pub candidates: Vec<u32>,

    /// Trial budget per phase and candidate during the search.
    #[serde(default = "default_search_trial_budget")]
    pub search_trial_budget: usize,
}

impl Default for TauConfig {
    fn default() -> Self {
        TauConfig {
            fixed: None,
            candidates: default_tau_candidates(),
            search_trial_budget: default_search_trial_budget(),
        }
    }
}

fn default_tau_candidates() -> Vec<u32> {
    vec![360, 720, 1440]
}

fn default_search_trial_budget() -> usize {
    2_000
}
