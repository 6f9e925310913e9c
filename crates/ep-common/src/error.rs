//! Error types for epiphase.
//!
//! This module provides structured error handling with:
//! - Stable error codes for machine parsing
//! - Category classification for error grouping
//! - Recoverability hints for automation
//! - Remediation suggestions for humans
//!
//! # Human-Facing Output
//!
//! ```text
//! ✗ Invalid Phase Selector
//!   Reason: invalid phase selector: 9th (series has 4 phases)
//!   Fix: Address phases by ordinal ("0th", "1st", ...), index, or "last".
//! ```
//!
//! # Agent-Facing Output
//!
//! ```json
//! {
//!   "code": 52,
//!   "category": "phase",
//!   "message": "invalid phase selector: 9th (series has 4 phases)",
//!   "recoverable": true,
//!   "suggested_action": "fix_input"
//! }
//! ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Result type alias for epiphase operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Configuration file errors.
    Config,
    /// Observed record validation errors.
    Records,
    /// Model parameter and simulation errors.
    Model,
    /// Parameter estimation errors.
    Estimation,
    /// Phase editing and series addressing errors.
    Phase,
    /// File I/O and serialization errors.
    Io,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Config => write!(f, "config"),
            ErrorCategory::Records => write!(f, "records"),
            ErrorCategory::Model => write!(f, "model"),
            ErrorCategory::Estimation => write!(f, "estimation"),
            ErrorCategory::Phase => write!(f, "phase"),
            ErrorCategory::Io => write!(f, "io"),
        }
    }
}

/// Suggested actions for callers to take in response to errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestedAction {
    /// Retry the operation, possibly with a larger budget.
    Retry,
    /// Reset configuration to defaults.
    ResetConfig,
    /// Correct the arguments of the call.
    FixInput,
    /// Skip this item and continue with the rest of the batch.
    Skip,
    /// Abort the operation.
    Abort,
}

impl std::fmt::Display for SuggestedAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SuggestedAction::Retry => write!(f, "retry"),
            SuggestedAction::ResetConfig => write!(f, "reset_config"),
            SuggestedAction::FixInput => write!(f, "fix_input"),
            SuggestedAction::Skip => write!(f, "skip"),
            SuggestedAction::Abort => write!(f, "abort"),
        }
    }
}

/// Unified error type for epiphase.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors (10-19)
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid configuration value for {field}: {message}")]
    InvalidConfig { field: String, message: String },

    // Record errors (20-29)
    #[error("invalid records: {0}")]
    InvalidRecords(String),

    #[error("insufficient records for {context}: need at least {needed}, got {available}")]
    InsufficientRecords {
        context: String,
        needed: usize,
        available: usize,
    },

    // Model errors (30-39)
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("invalid tau: {0} (must be a positive divisor of 1440 minutes)")]
    InvalidTau(u32),

    #[error("simulation diverged at step {step}: {variable} = {value}")]
    SimulationDiverged {
        step: usize,
        variable: String,
        value: f64,
    },

    // Estimation errors (40-49)
    #[error("estimation failed: {0}")]
    EstimationFailed(String),

    #[error("{metric} is not available for the {phase} phase")]
    MetricUnavailable { metric: String, phase: String },

    // Phase errors (50-59)
    #[error("invalid date range: {0}")]
    InvalidDateRange(String),

    #[error("date {date} is not in any phase")]
    DateNotInAnyPhase { date: NaiveDate },

    #[error("invalid phase selector: {0}")]
    InvalidPhaseSelector(String),

    #[error("phase series not found: {name}")]
    SeriesNotFound { name: String },

    // I/O errors (60-69)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Returns the error code for this error type.
    ///
    /// Error codes are stable and grouped by category:
    /// - 10-19: Configuration errors
    /// - 20-29: Record errors
    /// - 30-39: Model errors
    /// - 40-49: Estimation errors
    /// - 50-59: Phase errors
    /// - 60-69: I/O errors
    pub fn code(&self) -> u32 {
        match self {
            Error::Config(_) => 10,
            Error::InvalidConfig { .. } => 11,
            Error::InvalidRecords(_) => 20,
            Error::InsufficientRecords { .. } => 21,
            Error::InvalidParameter(_) => 30,
            Error::InvalidTau(_) => 31,
            Error::SimulationDiverged { .. } => 32,
            Error::EstimationFailed(_) => 40,
            Error::MetricUnavailable { .. } => 41,
            Error::InvalidDateRange(_) => 50,
            Error::DateNotInAnyPhase { .. } => 51,
            Error::InvalidPhaseSelector(_) => 52,
            Error::SeriesNotFound { .. } => 53,
            Error::Io(_) => 60,
            Error::Json(_) => 61,
        }
    }

    /// Returns the error category for grouping and filtering.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Config(_) | Error::InvalidConfig { .. } => ErrorCategory::Config,

            Error::InvalidRecords(_) | Error::InsufficientRecords { .. } => ErrorCategory::Records,

            Error::InvalidParameter(_) | Error::InvalidTau(_) | Error::SimulationDiverged { .. } => {
                ErrorCategory::Model
            }

            Error::EstimationFailed(_) | Error::MetricUnavailable { .. } => {
                ErrorCategory::Estimation
            }

            Error::InvalidDateRange(_)
            | Error::DateNotInAnyPhase { .. }
            | Error::InvalidPhaseSelector(_)
            | Error::SeriesNotFound { .. } => ErrorCategory::Phase,

            Error::Io(_) | Error::Json(_) => ErrorCategory::Io,
        }
    }

    /// Returns whether this error is potentially recoverable.
    ///
    /// Recoverable errors may be resolved by correcting the call, resetting
    /// configuration, or retrying with a larger budget.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::Config(_) => true,
            Error::InvalidConfig { .. } => true,

            // Records are supplied once; the core cannot repair them
            Error::InvalidRecords(_) => false,
            Error::InsufficientRecords { .. } => false,

            Error::InvalidParameter(_) => true,
            Error::InvalidTau(_) => true,
            Error::SimulationDiverged { .. } => true,

            Error::EstimationFailed(_) => true,
            Error::MetricUnavailable { .. } => true,

            Error::InvalidDateRange(_) => true,
            Error::DateNotInAnyPhase { .. } => true,
            Error::InvalidPhaseSelector(_) => true,
            Error::SeriesNotFound { .. } => true,

            Error::Io(_) => true,
            Error::Json(_) => false,
        }
    }

    /// Returns the suggested action for callers.
    pub fn suggested_action(&self) -> SuggestedAction {
        match self {
            Error::Config(_) => SuggestedAction::ResetConfig,
            Error::InvalidConfig { .. } => SuggestedAction::ResetConfig,

            Error::InvalidRecords(_) => SuggestedAction::Abort,
            Error::InsufficientRecords { .. } => SuggestedAction::Skip,

            Error::InvalidParameter(_) => SuggestedAction::FixInput,
            Error::InvalidTau(_) => SuggestedAction::FixInput,
            Error::SimulationDiverged { .. } => SuggestedAction::FixInput,

            Error::EstimationFailed(_) => SuggestedAction::Retry,
            Error::MetricUnavailable { .. } => SuggestedAction::Retry,

            Error::InvalidDateRange(_)
            | Error::DateNotInAnyPhase { .. }
            | Error::InvalidPhaseSelector(_)
            | Error::SeriesNotFound { .. } => SuggestedAction::FixInput,

            Error::Io(_) => SuggestedAction::Retry,
            Error::Json(_) => SuggestedAction::Abort,
        }
    }

    /// Returns a human-readable remediation hint.
    pub fn remediation(&self) -> &'static str {
        match self {
            Error::Config(_) => "Check the configuration file syntax, or remove it to use defaults.",
            Error::InvalidConfig { .. } => {
                "Fix the reported field in the configuration file, or start from a preset."
            }

            Error::InvalidRecords(_) => {
                "Records must be consecutive days with non-decreasing confirmed, recovered and fatal counts."
            }
            Error::InsufficientRecords { .. } => {
                "Combine the phase with a neighbour or wait for more records before fitting."
            }

            Error::InvalidParameter(_) => {
                "Parameters must be finite and non-negative; theta must not exceed 1."
            }
            Error::InvalidTau(_) => "Use a tau that evenly divides 1440, such as 360, 720 or 1440.",
            Error::SimulationDiverged { .. } => {
                "The parameters are infeasible for this step size. Use smaller rates or a smaller tau."
            }

            Error::EstimationFailed(_) => {
                "Retry with a larger trial budget, or combine short phases before estimation."
            }
            Error::MetricUnavailable { .. } => {
                "Estimate the phase first, or set its parameters when adding it."
            }

            Error::InvalidDateRange(_) => {
                "Give either an end date or a number of days, ending on or after the phase start."
            }
            Error::DateNotInAnyPhase { .. } => "Pick a date inside one of the existing phases.",
            Error::InvalidPhaseSelector(_) => {
                "Address phases by ordinal (\"0th\", \"1st\", ...), index, or \"last\"."
            }
            Error::SeriesNotFound { .. } => "Create the series with clear() before editing it.",

            Error::Io(_) => "Check that the file exists and is readable.",
            Error::Json(_) => "Check the JSON syntax of the input document.",
        }
    }

    /// Returns a short headline for human-readable output.
    pub fn headline(&self) -> &'static str {
        match self {
            Error::Config(_) => "Configuration Error",
            Error::InvalidConfig { .. } => "Invalid Configuration",

            Error::InvalidRecords(_) => "Invalid Records",
            Error::InsufficientRecords { .. } => "Insufficient Records",

            Error::InvalidParameter(_) => "Invalid Parameter",
            Error::InvalidTau(_) => "Invalid Tau",
            Error::SimulationDiverged { .. } => "Simulation Diverged",

            Error::EstimationFailed(_) => "Estimation Failed",
            Error::MetricUnavailable { .. } => "Metric Unavailable",

            Error::InvalidDateRange(_) => "Invalid Date Range",
            Error::DateNotInAnyPhase { .. } => "Date Not In Any Phase",
            Error::InvalidPhaseSelector(_) => "Invalid Phase Selector",
            Error::SeriesNotFound { .. } => "Phase Series Not Found",

            Error::Io(_) => "I/O Error",
            Error::Json(_) => "JSON Parse Error",
        }
    }
}

/// Structured error response for JSON output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredError {
    /// Stable error code.
    pub code: u32,

    /// Error category for grouping.
    pub category: ErrorCategory,

    /// Human-readable error message.
    pub message: String,

    /// Whether the error is potentially recoverable.
    pub recoverable: bool,

    /// Suggested action for callers.
    pub suggested_action: SuggestedAction,

    /// Additional structured context (e.g., date, series name).
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub context: HashMap<String, serde_json::Value>,
}

impl From<&Error> for StructuredError {
    fn from(err: &Error) -> Self {
        let mut context = HashMap::new();

        match err {
            Error::InsufficientRecords {
                needed, available, ..
            } => {
                context.insert("needed".to_string(), serde_json::json!(needed));
                context.insert("available".to_string(), serde_json::json!(available));
            }
            Error::InvalidTau(tau) => {
                context.insert("tau".to_string(), serde_json::json!(tau));
            }
            Error::SimulationDiverged { step, variable, .. } => {
                context.insert("step".to_string(), serde_json::json!(step));
                context.insert("variable".to_string(), serde_json::json!(variable));
            }
            Error::DateNotInAnyPhase { date } => {
                context.insert("date".to_string(), serde_json::json!(date.to_string()));
            }
            Error::SeriesNotFound { name } => {
                context.insert("series".to_string(), serde_json::json!(name));
            }
            _ => {}
        }

        StructuredError {
            code: err.code(),
            category: err.category(),
            message: err.to_string(),
            recoverable: err.is_recoverable(),
            suggested_action: err.suggested_action(),
            context,
        }
    }
}

impl StructuredError {
    /// Add additional context to the error.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.context.insert(key.into(), v);
        }
        self
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(r#"{{"code":{},"error":"serialization_failed"}}"#, self.code)
        })
    }
}

/// Format an error for human-readable stderr output.
///
/// Output format:
/// ```text
/// ✗ [Headline]
///   Reason: [Error message]
///   Fix: [Remediation hint]
/// ```
pub fn format_error_human(err: &Error, use_color: bool) -> String {
    let (red, cyan, reset) = if use_color {
        ("\x1b[31m", "\x1b[36m", "\x1b[0m")
    } else {
        ("", "", "")
    };

    format!(
        "{red}✗{reset} {headline}\n  Reason: {message}\n  {cyan}Fix:{reset} {remediation}",
        red = red,
        cyan = cyan,
        reset = reset,
        headline = err.headline(),
        message = err,
        remediation = err.remediation()
    )
}
