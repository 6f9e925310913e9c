//! Named phase series over one record set.
//!
//! A [`Scenario`] owns the records, the engine configuration and any number
//! of [`PhaseSeries`] keyed by name ("Main" by default). Series are created
//! by [`Scenario::clear`], edited through the proxies below and read through
//! [`Scenario::summary`], [`Scenario::history`], [`Scenario::track`] and
//! [`Scenario::describe`].
//!
//! All mutation goes through `&mut self`; wrap the scenario in a lock to
//! share it between threads.

pub mod history;
pub mod summary;
pub mod track;

pub use history::{History, HistoryPoint, HistoryTarget};
pub use summary::SummaryRow;
pub use track::{SeriesDescription, TrackRow};

use crate::estimation::{self, AccuracyReport, Estimator, FitMetrics};
use crate::logging::event_names;
use crate::model::{ModelKind, ParamMap, Tau};
use crate::phase::{Metric, PhaseAddition, PhaseSeries};
use crate::trend::{TrendResult, TrendSegmenter};
use chrono::NaiveDate;
use ep_common::{int_to_ordinal, Error, PhaseSelector, Record, RecordSet, Result, StructuredError};
use ep_config::{EngineConfig, TrendConfig};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Name of the series every scenario starts with.
pub const MAIN: &str = "Main";

/// Trend segmentations keyed by the configuration that produced them.
///
/// Records never change within a scenario, so the configuration is the
/// whole key.
#[derive(Debug, Clone, Default)]
pub struct TrendCache {
    entries: Vec<(TrendConfig, TrendResult)>,
}

impl TrendCache {
    pub fn get(&self, config: &TrendConfig) -> Option<&TrendResult> {
        self.entries
            .iter()
            .find(|(key, _)| key == config)
            .map(|(_, result)| result)
    }

    pub fn insert(&mut self, config: TrendConfig, result: TrendResult) {
        self.entries.retain(|(key, _)| *key != config);
        self.entries.push((config, result));
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// What happened to one phase during batch estimation.
#[derive(Debug)]
pub enum PhaseStatus {
    Estimated(FitMetrics),
    Failed(Error),
    /// Not attempted, with the reason.
    Skipped(String),
}

impl Serialize for PhaseStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        #[serde(tag = "status", rename_all = "snake_case")]
        enum Repr<'a> {
            Estimated { metrics: &'a FitMetrics },
            Failed { error: StructuredError },
            Skipped { reason: &'a str },
        }
        match self {
            PhaseStatus::Estimated(metrics) => Repr::Estimated { metrics },
            PhaseStatus::Failed(err) => Repr::Failed {
                error: StructuredError::from(err),
            },
            PhaseStatus::Skipped(reason) => Repr::Skipped { reason },
        }
        .serialize(serializer)
    }
}

#[derive(Debug, Serialize)]
pub struct PhaseOutcome {
    pub phase: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    #[serde(flatten)]
    pub status: PhaseStatus,
}

/// Per-phase results of [`Scenario::estimate`].
#[derive(Debug, Serialize)]
pub struct EstimationBatch {
    pub series: String,
    pub model: ModelKind,
    pub tau: Tau,
    pub outcomes: Vec<PhaseOutcome>,
}

impl EstimationBatch {
    pub fn estimated(&self) -> usize {
        self.count(|s| matches!(s, PhaseStatus::Estimated(_)))
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, PhaseStatus::Failed(_)))
    }

    pub fn skipped(&self) -> usize {
        self.count(|s| matches!(s, PhaseStatus::Skipped(_)))
    }

    fn count(&self, pred: impl Fn(&PhaseStatus) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(&o.status)).count()
    }
}

#[derive(Debug, Clone)]
pub struct Scenario {
    records: RecordSet,
    config: EngineConfig,
    series: BTreeMap<String, PhaseSeries>,
    tau: Option<Tau>,
    trend_cache: TrendCache,
    estimator: Estimator,
}

impl Scenario {
    /// Create a scenario whose "Main" series holds the baseline 0th phase.
    pub fn new(records: RecordSet, config: EngineConfig) -> Result<Self> {
        ep_config::validate_config(&config).map_err(|e| match e.field() {
            Some(field) => Error::InvalidConfig {
                field: field.to_string(),
                message: e.to_string(),
            },
            None => Error::Config(e.to_string()),
        })?;
        let tau = config.tau.fixed.map(Tau::new).transpose()?;
        let estimator = Estimator::new(config.estimation.clone())?;
        let mut series = BTreeMap::new();
        series.insert(MAIN.to_string(), PhaseSeries::baseline(MAIN, &records)?);
        Ok(Scenario {
            records,
            config,
            series,
            tau,
            trend_cache: TrendCache::default(),
            estimator,
        })
    }

    pub fn records(&self) -> &RecordSet {
        &self.records
    }

    pub fn population(&self) -> u64 {
        self.records.population()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Tau used by phases that carry none of their own.
    pub fn tau(&self) -> Option<Tau> {
        self.tau
    }

    pub fn set_tau(&mut self, tau: Tau) {
        self.tau = Some(tau);
    }

    pub fn trend_cache(&self) -> &TrendCache {
        &self.trend_cache
    }

    /// Replace the trend configuration and drop cached segmentations.
    pub fn set_trend_config(&mut self, trend: TrendConfig) {
        self.config.trend = trend;
        self.trend_cache.clear();
    }

    pub fn series_names(&self) -> Vec<&str> {
        self.series.keys().map(String::as_str).collect()
    }

    pub fn series(&self, name: Option<&str>) -> Result<&PhaseSeries> {
        let name = name.unwrap_or(MAIN);
        self.series.get(name).ok_or_else(|| Error::SeriesNotFound {
            name: name.to_string(),
        })
    }

    fn series_mut(&mut self, name: Option<&str>) -> Result<&mut PhaseSeries> {
        let name = name.unwrap_or(MAIN);
        self.series.get_mut(name).ok_or_else(|| Error::SeriesNotFound {
            name: name.to_string(),
        })
    }

    /// Segment the records with the current trend configuration, using the
    /// cache when possible.
    pub fn segment(&mut self) -> Result<TrendResult> {
        if let Some(hit) = self.trend_cache.get(&self.config.trend) {
            debug!(
                target: event_names::TREND_CACHE_HIT,
                phases = hit.phase_count(),
                "trend cache hit"
            );
            return Ok(hit.clone());
        }
        let result = TrendSegmenter::new(self.config.trend.clone()).segment(&self.records)?;
        self.trend_cache
            .insert(self.config.trend.clone(), result.clone());
        Ok(result)
    }

    /// (Re)create a series, from trend segmentation or as a deep copy of
    /// `template`.
    pub fn clear(&mut self, name: Option<&str>, template: Option<&str>) -> Result<()> {
        let name = name.unwrap_or(MAIN);
        let series = match template {
            Some(template) => {
                let mut copy = self.series(Some(template))?.clone();
                copy.rename(name);
                copy
            }
            None => PhaseSeries::from_trend(name, &self.segment()?)?,
        };
        info!(
            target: event_names::SERIES_CLEARED,
            series = name,
            template = template.unwrap_or("-"),
            phases = series.len(),
            "series cleared"
        );
        self.series.insert(name.to_string(), series);
        Ok(())
    }

    /// Replace a series with fresh trend phases and return the segmentation.
    pub fn trend(&mut self, name: Option<&str>) -> Result<TrendResult> {
        self.clear(name, None)?;
        self.segment()
    }

    pub fn delete_series(&mut self, name: &str) -> Result<()> {
        self.series
            .remove(name)
            .ok_or_else(|| Error::SeriesNotFound {
                name: name.to_string(),
            })?;
        info!(target: event_names::SERIES_DELETED, series = name, "series deleted");
        Ok(())
    }

    pub fn add(&mut self, addition: &PhaseAddition, name: Option<&str>) -> Result<()> {
        let records = &self.records;
        let name = name.unwrap_or(MAIN);
        let series = self.series.get_mut(name).ok_or_else(|| Error::SeriesNotFound {
            name: name.to_string(),
        })?;
        series.add(addition, records)
    }

    pub fn delete(&mut self, selectors: &[PhaseSelector], name: Option<&str>) -> Result<()> {
        self.series_mut(name)?.delete(selectors)
    }

    pub fn combine(&mut self, selectors: &[PhaseSelector], name: Option<&str>) -> Result<()> {
        self.series_mut(name)?.combine(selectors)
    }

    pub fn separate(&mut self, date: NaiveDate, name: Option<&str>) -> Result<()> {
        self.series_mut(name)?.separate(date)
    }

    pub fn enable(&mut self, selectors: &[PhaseSelector], name: Option<&str>) -> Result<()> {
        self.series_mut(name)?.enable(selectors)
    }

    pub fn disable(&mut self, selectors: &[PhaseSelector], name: Option<&str>) -> Result<()> {
        self.series_mut(name)?.disable(selectors)
    }

    /// Give one phase a model and a complete parameter set.
    pub fn assign(
        &mut self,
        selector: PhaseSelector,
        model: ModelKind,
        params: &ParamMap,
        name: Option<&str>,
    ) -> Result<()> {
        let tau = self.tau;
        self.series_mut(name)?.assign(selector, model, tau, params)
    }

    pub fn get(&self, metric: &Metric, selector: PhaseSelector, name: Option<&str>) -> Result<f64> {
        self.series(name)?.get(metric, selector, self.tau)
    }

    /// Fit `model` to every enabled phase of a series that lies within the
    /// records.
    ///
    /// Tau comes from the argument, then the scenario, then the
    /// configuration, and is otherwise selected by search. A phase that
    /// fails to fit is reported and leaves the rest of the batch intact.
    pub fn estimate(
        &mut self,
        model: ModelKind,
        name: Option<&str>,
        tau: Option<Tau>,
    ) -> Result<EstimationBatch> {
        let series = self.series(name)?;
        let series_name = series.name().to_string();
        let last_record = self.records.last_date();

        // Snapshot of the boundaries; the series is not touched until all
        // fits are done.
        let mut outcomes = Vec::with_capacity(series.len());
        let mut jobs: Vec<(usize, &[Record])> = Vec::new();
        for (idx, phase) in series.phases().iter().enumerate() {
            let skip = if !phase.is_enabled() {
                Some("disabled".to_string())
            } else if phase.end() > last_record {
                Some(format!("ends after the last record ({last_record})"))
            } else {
                None
            };
            if skip.is_none() {
                jobs.push((idx, self.records.range(phase.start(), phase.end())?));
            }
            outcomes.push(PhaseOutcome {
                phase: int_to_ordinal(idx),
                start: phase.start(),
                end: phase.end(),
                status: PhaseStatus::Skipped(skip.unwrap_or_default()),
            });
        }

        let slices: Vec<&[Record]> = jobs.iter().map(|(_, records)| *records).collect();
        let tau = match tau.or(self.tau) {
            Some(tau) => tau,
            None => self.select_tau(model, &slices)?,
        };

        info!(
            target: event_names::ESTIMATE_STARTED,
            series = %series_name,
            model = %model,
            tau = tau.minutes(),
            phases = jobs.len(),
            "estimation started"
        );
        let results = self
            .estimator
            .estimate_many(model, &slices, self.population(), tau);
        let indices: Vec<usize> = jobs.iter().map(|(idx, _)| *idx).collect();

        let series = self.series_mut(Some(&series_name))?;
        for (idx, result) in indices.into_iter().zip(results) {
            let label = int_to_ordinal(idx);
            outcomes[idx].status = match result {
                Ok(estimate) => {
                    info!(
                        target: event_names::ESTIMATE_PHASE_DONE,
                        series = %series_name,
                        phase = %label,
                        rmsle = estimate.metrics.rmsle,
                        trials = estimate.metrics.trials,
                        runtime_secs = estimate.metrics.runtime_secs,
                        "phase estimated"
                    );
                    if let Some(phase) = series.phase_mut(idx) {
                        phase.apply_estimate(&estimate);
                    }
                    PhaseStatus::Estimated(estimate.metrics)
                }
                Err(err) => {
                    warn!(
                        target: event_names::ESTIMATE_PHASE_FAILED,
                        series = %series_name,
                        phase = %label,
                        error = %err,
                        "phase estimation failed"
                    );
                    PhaseStatus::Failed(err)
                }
            };
        }
        self.tau = Some(tau);

        let batch = EstimationBatch {
            series: series_name,
            model,
            tau,
            outcomes,
        };
        info!(
            target: event_names::ESTIMATE_FINISHED,
            series = %batch.series,
            estimated = batch.estimated(),
            failed = batch.failed(),
            skipped = batch.skipped(),
            "estimation finished"
        );
        Ok(batch)
    }

    fn select_tau(&self, model: ModelKind, phases: &[&[Record]]) -> Result<Tau> {
        let candidates = self
            .config
            .tau
            .candidates
            .iter()
            .map(|&minutes| Tau::new(minutes))
            .collect::<Result<Vec<_>>>()?;
        let search = self
            .estimator
            .with_trial_budget(self.config.tau.search_trial_budget);
        Ok(search
            .select_tau(model, phases, self.population(), &candidates)?
            .tau)
    }

    /// Compare a phase's stored parameters with its records.
    pub fn estimate_accuracy(
        &self,
        selector: PhaseSelector,
        name: Option<&str>,
    ) -> Result<AccuracyReport> {
        let series = self.series(name)?;
        let idx = selector.resolve(series.len())?;
        let phase = &series.phases()[idx];
        let unavailable = |metric: &str| Error::MetricUnavailable {
            metric: metric.to_string(),
            phase: int_to_ordinal(idx),
        };
        let model = phase.model().ok_or_else(|| unavailable("model"))?;
        let tau = phase.tau().or(self.tau).ok_or_else(|| unavailable("tau"))?;
        let records = self.records.range(phase.start(), phase.end())?;
        estimation::estimate_accuracy(model, phase.params(), records, self.population(), tau)
    }
}
