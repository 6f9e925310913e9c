//! Event names and stages shared by every log line.
//!
//! Each event is emitted with `target:` set to one of the names in
//! [`event_names`] so JSONL consumers can filter on a stable key.

use serde::{Deserialize, Serialize};

/// Stage of an `epiphase` run an event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Startup and configuration.
    Init,
    /// Reading or generating records.
    Load,
    /// S-R trend segmentation.
    Trend,
    /// Parameter estimation.
    Estimate,
    /// Phase series edits.
    Edit,
    /// Simulation across phases.
    Track,
    /// Summary and history output.
    Report,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Init => "init",
            Stage::Load => "load",
            Stage::Trend => "trend",
            Stage::Estimate => "estimate",
            Stage::Edit => "edit",
            Stage::Track => "track",
            Stage::Report => "report",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Standard event names used in logging.
pub mod event_names {
    // Run lifecycle
    pub const RUN_STARTED: &str = "run.started";
    pub const RUN_FINISHED: &str = "run.finished";

    pub const CONFIG_LOADED: &str = "config.loaded";
    pub const CONFIG_DEFAULT_USED: &str = "config.default_used";

    pub const RECORDS_LOADED: &str = "records.loaded";

    pub const TREND_SEGMENTED: &str = "trend.segmented";
    pub const TREND_CACHE_HIT: &str = "trend.cache_hit";

    // Series edits
    pub const SERIES_CLEARED: &str = "series.cleared";
    pub const SERIES_EDITED: &str = "series.edited";
    pub const SERIES_DELETED: &str = "series.deleted";

    // Estimation
    pub const ESTIMATE_STARTED: &str = "estimate.started";
    pub const ESTIMATE_PHASE_DONE: &str = "estimate.phase_done";
    pub const ESTIMATE_PHASE_FAILED: &str = "estimate.phase_failed";
    pub const ESTIMATE_FINISHED: &str = "estimate.finished";
    pub const TAU_SELECTED: &str = "estimate.tau_selected";

    pub const TRACK_FINISHED: &str = "track.finished";

    pub const INTERNAL_ERROR: &str = "internal_error";
}

/// Correlation ids attached to the events of one invocation.
#[derive(Debug, Clone)]
pub struct LogContext {
    pub run_id: String,
    pub host_id: String,
}

impl LogContext {
    pub fn new(run_id: impl Into<String>, host_id: impl Into<String>) -> Self {
        LogContext {
            run_id: run_id.into(),
            host_id: host_id.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_display_matches_serde() {
        for stage in [
            Stage::Init,
            Stage::Load,
            Stage::Trend,
            Stage::Estimate,
            Stage::Edit,
            Stage::Track,
            Stage::Report,
        ] {
            let json = serde_json::to_string(&stage).unwrap();
            assert_eq!(json, format!("\"{stage}\""));
        }
    }

    #[test]
    fn test_event_names_are_namespaced() {
        assert_eq!(event_names::RUN_STARTED, "run.started");
        assert_eq!(event_names::TREND_SEGMENTED, "trend.segmented");
        assert!(event_names::ESTIMATE_PHASE_DONE.starts_with("estimate."));
    }

    #[test]
    fn test_log_context() {
        let ctx = LogContext::new("run-abc", "host-xyz");
        assert_eq!(ctx.run_id, "run-abc");
        assert_eq!(ctx.host_id, "host-xyz");
    }
}
