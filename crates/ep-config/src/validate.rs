//! Configuration validation errors and semantic validation.

use crate::engine::{EngineConfig, EstimationConfig, TauConfig, TrendConfig};
use thiserror::Error;

/// Validation result type.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Configuration validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Semantic validation failed: {0}")]
    SemanticError(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Version mismatch: expected {expected}, got {actual}")]
    VersionMismatch { expected: String, actual: String },
}

impl ValidationError {
    /// Error code for structured error reporting.
    pub fn code(&self) -> u32 {
        match self {
            ValidationError::SemanticError(_) => 11,
            ValidationError::InvalidValue { .. } => 11,
            ValidationError::VersionMismatch { .. } => 10,
        }
    }

    /// Dotted path of the offending field, when there is one.
    pub fn field(&self) -> Option<&str> {
        match self {
            ValidationError::InvalidValue { field, .. } => Some(field),
            _ => None,
        }
    }
}

/// Validate an engine configuration semantically.
pub fn validate_config(config: &EngineConfig) -> ValidationResult<()> {
    if config.schema_version != crate::CONFIG_SCHEMA_VERSION {
        return Err(ValidationError::VersionMismatch {
            expected: crate::CONFIG_SCHEMA_VERSION.to_string(),
            actual: config.schema_version.clone(),
        });
    }

    validate_trend(&config.trend)?;
    validate_estimation(&config.estimation)?;
    validate_tau(&config.tau)?;

    Ok(())
}

fn validate_trend(trend: &TrendConfig) -> ValidationResult<()> {
    if trend.min_phase_days < 2 {
        return Err(ValidationError::InvalidValue {
            field: "trend.min_phase_days".to_string(),
            message: format!("Must be at least 2, got {}", trend.min_phase_days),
        });
    }

    validate_positive("trend.penalty", trend.penalty)
}

fn validate_estimation(est: &EstimationConfig) -> ValidationResult<()> {
    if est.trial_budget == 0 {
        return Err(ValidationError::InvalidValue {
            field: "estimation.trial_budget".to_string(),
            message: "Must be positive".to_string(),
        });
    }

    validate_positive("estimation.timeout_secs", est.timeout_secs)?;

    if !est.tolerance.is_finite() || est.tolerance < 0.0 {
        return Err(ValidationError::InvalidValue {
            field: "estimation.tolerance".to_string(),
            message: format!("Must be a non-negative number, got {}", est.tolerance),
        });
    }

    if est.population != 0 && est.population < 4 {
        return Err(ValidationError::InvalidValue {
            field: "estimation.population".to_string(),
            message: format!(
                "Differential evolution needs at least 4 members, got {}",
                est.population
            ),
        });
    }

    if !(est.mutation > 0.0 && est.mutation <= 2.0) {
        return Err(ValidationError::InvalidValue {
            field: "estimation.mutation".to_string(),
            message: format!("Must be in (0, 2], got {}", est.mutation),
        });
    }

    validate_probability("estimation.crossover", est.crossover)?;

    if est.min_records < 2 {
        return Err(ValidationError::InvalidValue {
            field: "estimation.min_records".to_string(),
            message: format!("Must be at least 2, got {}", est.min_records),
        });
    }

    Ok(())
}

fn validate_tau(tau: &TauConfig) -> ValidationResult<()> {
    if let Some(fixed) = tau.fixed {
        validate_tau_minutes("tau.fixed", fixed)?;
    } else if tau.candidates.is_empty() {
        return Err(ValidationError::SemanticError(
            "tau.candidates must not be empty when tau.fixed is unset".to_string(),
        ));
    }

    for (i, &candidate) in tau.candidates.iter().enumerate() {
        validate_tau_minutes(&format!("tau.candidates[{}]", i), candidate)?;
    }

    if tau.search_trial_budget == 0 {
        return Err(ValidationError::InvalidValue {
            field: "tau.search_trial_budget".to_string(),
            message: "Must be positive".to_string(),
        });
    }

    Ok(())
}

/// Tau must divide a day (1440 minutes) evenly.
fn validate_tau_minutes(field: &str, minutes: u32) -> ValidationResult<()> {
    if minutes == 0 || 1440 % minutes != 0 {
        return Err(ValidationError::InvalidValue {
            field: field.to_string(),
            message: format!("Must be a divisor of 1440, got {}", minutes),
        });
    }
    Ok(())
}

fn validate_positive(field: &str, value: f64) -> ValidationResult<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(ValidationError::InvalidValue {
            field: field.to_string(),
            message: format!("Must be a positive number, got {}", value),
        });
    }
    Ok(())
}

fn validate_probability(field: &str, value: f64) -> ValidationResult<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(ValidationError::InvalidValue {
            field: field.to_string(),
            message: format!("Must be in [0, 1], got {}", value),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&EngineConfig::default()).is_ok());
    }

    #[test]
    fn test_tau_must_divide_day() {
        assert!(validate_tau_minutes("tau", 720).is_ok());
        assert!(validate_tau_minutes("tau", 1).is_ok());
        assert!(validate_tau_minutes("tau", 700).is_err());
        assert!(validate_tau_minutes("tau", 0).is_err());
    }

    #[test]
    fn test_version_mismatch() {
        let config = EngineConfig {
            schema_version: "0.0.1".to_string(),
            ..EngineConfig::default()
        };
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, ValidationError::VersionMismatch { .. }));
        assert_eq!(err.code(), 10);
    }

    #[test]
    fn test_nan_penalty_rejected() {
        let mut config = EngineConfig::default();
        config.trend.penalty = f64::NAN;
        let err = validate_config(&config).unwrap_err();
        assert_eq!(err.field(), Some("trend.penalty"));
    }

    #[test]
    fn test_empty_candidates_allowed_with_fixed_tau() {
        let mut config = EngineConfig::default();
        config.tau.candidates.clear();
        assert!(validate_config(&config).is_err());
        config.tau.fixed = Some(1440);
        assert!(validate_config(&config).is_ok());
    }
}
