//! Exit codes for the epiphase driver.
//!
//! Exit codes communicate the outcome without requiring output parsing.
//!
//! Exit code ranges:
//! - 0-1: Operational outcomes (parse outcome from code, not output)
//! - 10-19: User/input errors (recoverable by fixing the call or the data)
//! - 20-29: Internal and I/O errors

use ep_common::{Error, ErrorCategory};

/// Exit codes for epiphase runs.
///
/// These codes are a stable contract for automation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    // ========================================================================
    // Operational Outcomes (0-1)
    // ========================================================================
    /// Success: every requested step completed
    Clean = 0,

    /// Partial failure: some phases failed to fit, the rest are reported
    PartialFail = 1,

    // ========================================================================
    // User / Input Errors (10-19)
    // ========================================================================
    /// Invalid arguments
    ArgsError = 10,

    /// Configuration missing, unparsable or invalid
    ConfigError = 11,

    /// Records rejected or too short
    RecordsError = 12,

    /// Invalid model parameters, tau, or a diverging simulation
    ModelError = 13,

    /// Estimation failed or a metric is unavailable
    EstimationError = 14,

    /// Invalid phase edit, selector or series name
    PhaseError = 15,

    // ========================================================================
    // Internal Errors (20-29)
    // ========================================================================
    /// Internal error (bug - please report)
    InternalError = 20,

    /// I/O or serialization error
    IoError = 21,
}

impl ExitCode {
    /// Convert to i32 for process exit.
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Codes 0-1 describe how far the run got; they are not failures of the call.
    pub fn is_operational(self) -> bool {
        (self as i32) < 10
    }

    pub fn is_user_error(self) -> bool {
        (10..20).contains(&(self as i32))
    }

    pub fn is_internal_error(self) -> bool {
        (self as i32) >= 20
    }

    pub fn is_error(self) -> bool {
        self != ExitCode::Clean
    }

    /// Map an engine error onto its exit code by category.
    pub fn from_error(err: &Error) -> Self {
        match err.category() {
            ErrorCategory::Config => ExitCode::ConfigError,
            ErrorCategory::Records => ExitCode::RecordsError,
            ErrorCategory::Model => ExitCode::ModelError,
            ErrorCategory::Estimation => ExitCode::EstimationError,
            ErrorCategory::Phase => ExitCode::PhaseError,
            ErrorCategory::Io => ExitCode::IoError,
        }
    }

    /// Get the error code name as a string constant (for JSON output).
    pub fn code_name(&self) -> &'static str {
        match self {
            ExitCode::Clean => "OK_CLEAN",
            ExitCode::PartialFail => "ERR_PARTIAL",
            ExitCode::ArgsError => "ERR_ARGS",
            ExitCode::ConfigError => "ERR_CONFIG",
            ExitCode::RecordsError => "ERR_RECORDS",
            ExitCode::ModelError => "ERR_MODEL",
            ExitCode::EstimationError => "ERR_ESTIMATION",
            ExitCode::PhaseError => "ERR_PHASE",
            ExitCode::InternalError => "ERR_INTERNAL",
            ExitCode::IoError => "ERR_IO",
        }
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

impl From<&Error> for ExitCode {
    fn from(err: &Error) -> Self {
        ExitCode::from_error(err)
    }
}

impl std::fmt::Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.code_name(), self.as_i32())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ranges() {
        assert!(ExitCode::Clean.is_operational());
        assert!(ExitCode::PartialFail.is_operational());
        assert!(ExitCode::PartialFail.is_error());
        assert!(!ExitCode::Clean.is_error());
        assert!(ExitCode::PhaseError.is_user_error());
        assert!(ExitCode::IoError.is_internal_error());
        assert!(!ExitCode::ArgsError.is_internal_error());
    }

    #[test]
    fn test_errors_map_by_category() {
        assert_eq!(
            ExitCode::from(&Error::InvalidConfig {
                field: "estimation.trial_budget".into(),
                message: "must be positive".into(),
            }),
            ExitCode::ConfigError
        );
        assert_eq!(
            ExitCode::from(&Error::InsufficientRecords {
                context: "the 0th phase".into(),
                needed: 3,
                available: 1
            }),
            ExitCode::RecordsError
        );
        assert_eq!(
            ExitCode::from(&Error::InvalidPhaseSelector("9th".into())),
            ExitCode::PhaseError
        );
        assert_eq!(
            ExitCode::from(&Error::EstimationFailed("no signal".into())),
            ExitCode::EstimationError
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(ExitCode::PartialFail.to_string(), "ERR_PARTIAL (1)");
        assert_eq!(i32::from(ExitCode::ModelError), 13);
    }
}
