//! Phases and the per-series phase list.
//!
//! A [`Phase`] is a closed date range with an optional model assignment,
//! parameter values and fit metrics. Phases are grouped into a
//! [`PhaseSeries`], which keeps them sorted and non-overlapping.

pub mod series;

pub use series::{PhaseAddition, PhaseSeries};

use crate::estimation::{Estimate, FitMetrics};
use crate::model::{ModelKind, ParamMap, Tau};
use chrono::{Duration, NaiveDate};
use ep_common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// A value that can be read from a phase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// Model parameter such as `rho`.
    Parameter(String),
    /// Day-scaled parameter such as `1/beta [day]`.
    DayParameter(String),
    /// Phase-dependent reproduction number.
    Rt,
    Rmsle,
    Trials,
    /// Estimation wall-clock time in seconds.
    Runtime,
}

impl FromStr for Metric {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let name = s.trim();
        if name.is_empty() {
            return Err(Error::InvalidParameter("empty metric name".to_string()));
        }
        Ok(match name.to_ascii_lowercase().as_str() {
            "rt" | "r0" => Metric::Rt,
            "rmsle" => Metric::Rmsle,
            "trials" => Metric::Trials,
            "runtime" => Metric::Runtime,
            _ if name.contains('[') => Metric::DayParameter(name.to_string()),
            _ => Metric::Parameter(name.to_string()),
        })
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Metric::Parameter(name) | Metric::DayParameter(name) => f.write_str(name),
            Metric::Rt => f.write_str("Rt"),
            Metric::Rmsle => f.write_str("RMSLE"),
            Metric::Trials => f.write_str("Trials"),
            Metric::Runtime => f.write_str("Runtime"),
        }
    }
}

/// One contiguous date range of a series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Phase {
    start: NaiveDate,
    end: NaiveDate,
    model: Option<ModelKind>,
    tau: Option<Tau>,
    params: ParamMap,
    fit: Option<FitMetrics>,
    enabled: bool,
}

impl Phase {
    /// An enabled phase without model or parameters.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(Error::InvalidDateRange(format!(
                "phase start {start} is after its end {end}"
            )));
        }
        Ok(Phase {
            start,
            end,
            model: None,
            tau: None,
            params: ParamMap::new(),
            fit: None,
            enabled: true,
        })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Number of days covered, both ends included.
    pub fn days(&self) -> usize {
        (self.end - self.start).num_days() as usize + 1
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn model(&self) -> Option<ModelKind> {
        self.model
    }

    pub fn tau(&self) -> Option<Tau> {
        self.tau
    }

    pub fn params(&self) -> &ParamMap {
        &self.params
    }

    pub fn fit(&self) -> Option<&FitMetrics> {
        self.fit.as_ref()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Model and ordered parameter vector, when the phase is fully specified.
    pub fn param_vector(&self) -> Option<(ModelKind, Vec<f64>)> {
        let model = self.model?;
        model.params_from_map(&self.params).ok().map(|v| (model, v))
    }

    /// Read a metric; `None` when the phase lacks what it needs.
    ///
    /// Day parameters use the phase's tau, or `default_tau` when the phase
    /// has none.
    pub fn metric(&self, metric: &Metric, default_tau: Option<Tau>) -> Option<f64> {
        match metric {
            Metric::Parameter(name) => self.params.get(name).copied(),
            Metric::DayParameter(name) => {
                let (model, values) = self.param_vector()?;
                let tau = self.tau.or(default_tau)?;
                model.to_day_parameters(&values, tau).ok()?.get(name).copied()
            }
            Metric::Rt => {
                let (model, values) = self.param_vector()?;
                model.calc_r0(&values).ok()
            }
            Metric::Rmsle => self.fit.map(|f| f.rmsle),
            Metric::Trials => self.fit.map(|f| f.trials as f64),
            Metric::Runtime => self.fit.map(|f| f.runtime_secs),
        }
    }

    /// Store the result of an estimation.
    pub fn apply_estimate(&mut self, estimate: &Estimate) {
        self.model = Some(estimate.model);
        self.tau = Some(estimate.tau);
        self.params = estimate.params.clone();
        self.fit = Some(estimate.metrics);
    }

    /// Assign a model with a complete parameter set; fit metrics are reset.
    pub fn assign(&mut self, model: ModelKind, tau: Option<Tau>, params: &ParamMap) -> Result<()> {
        model.params_from_map(params)?;
        self.model = Some(model);
        if tau.is_some() {
            self.tau = tau;
        }
        self.params = params.clone();
        self.fit = None;
        Ok(())
    }

    /// Overwrite individual parameters of the assigned model.
    pub(crate) fn override_params(&mut self, overrides: &ParamMap) -> Result<()> {
        if overrides.is_empty() {
            return Ok(());
        }
        let model = self.model.ok_or_else(|| {
            Error::InvalidParameter(
                "parameters cannot be set before a model is assigned".to_string(),
            )
        })?;
        for (name, &value) in overrides {
            model.check_param(name, value)?;
        }
        self.params
            .extend(overrides.iter().map(|(k, v)| (k.clone(), *v)));
        self.fit = None;
        Ok(())
    }

    pub(crate) fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub(crate) fn clear_fit(&mut self) {
        self.fit = None;
    }

    /// Split at `date`: `[start, date - 1]` and `[date, end]`.
    pub(crate) fn split_at(&self, date: NaiveDate) -> Result<(Phase, Phase)> {
        if date <= self.start || date > self.end {
            return Err(Error::InvalidDateRange(format!(
                "{date} does not split {}..={}",
                self.start, self.end
            )));
        }
        let mut before = self.clone();
        let mut after = self.clone();
        before.end = date - Duration::days(1);
        after.start = date;
        before.clear_fit();
        after.clear_fit();
        Ok((before, after))
    }
}
