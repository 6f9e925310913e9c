//! epiphase core library
//!
//! Phase-segmented compartmental epidemic modeling:
//! - Compartment models (SIR, SIR-D, SIR-F, SEWIR-F) and RK4 simulation
//! - S-R trend segmentation of observed records into phases
//! - Per-phase parameter estimation with tau selection
//! - Phase series editing, summaries, histories and tracking
//! - Logging and exit codes for the `epiphase` driver
//!
//! The binary entry point is in `main.rs`.

pub mod estimation;
pub mod example;
pub mod exit_codes;
pub mod logging;
pub mod model;
pub mod phase;
pub mod scenario;
pub mod simulation;
pub mod trend;

pub use estimation::{AccuracyReport, Estimate, Estimator, FitMetrics, TauSelection};
pub use example::ExampleData;
pub use model::{ModelKind, ParamMap, Tau};
pub use phase::{Metric, Phase, PhaseAddition, PhaseSeries};
pub use scenario::{
    EstimationBatch, History, HistoryPoint, HistoryTarget, PhaseStatus, Scenario,
    SeriesDescription, SummaryRow, TrackRow, MAIN,
};
pub use simulation::{simulate, Simulator, Trajectory};
pub use trend::{TrendResult, TrendSegmenter};

use ep_common::Error;
use ep_config::{ConfigError, ValidationError};

/// Convert a configuration loading failure into the engine error.
///
/// Field-level validation failures keep their field; everything else
/// becomes [`Error::Config`].
pub fn config_error(err: ConfigError) -> Error {
    match &err {
        ConfigError::ValidationError(ValidationError::InvalidValue { field, message }) => {
            Error::InvalidConfig {
                field: field.clone(),
                message: message.clone(),
            }
        }
        _ => Error::Config(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn config_errors_convert() {
        let missing = ConfigError::NotFound {
            path: PathBuf::from("/nonexistent/config.json"),
        };
        assert_eq!(config_error(missing).code(), 10);

        let invalid = ConfigError::ValidationError(ValidationError::InvalidValue {
            field: "trend.penalty".to_string(),
            message: "must be positive".to_string(),
        });
        match config_error(invalid) {
            Error::InvalidConfig { field, .. } => assert_eq!(field, "trend.penalty"),
            other => panic!("unexpected {other:?}"),
        }
    }
}
