//! Ordered, named phase list with restructuring operations.
//!
//! Every edit works on a copy of the list, validates the result and only
//! then replaces the live list, so a failed edit leaves the series as it
//! was. Phase labels ("0th", "1st", ...) follow live order.

use super::{Metric, Phase};
use crate::logging::event_names;
use crate::model::{ModelKind, ParamMap, Tau};
use crate::trend::TrendResult;
use chrono::{Duration, NaiveDate};
use ep_common::{int_to_ordinal, Error, PhaseSelector, RecordSet, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Arguments of [`PhaseSeries::add`].
///
/// At most one of `end_date` and `days` may be given; with neither the new
/// phase runs to the last record date.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhaseAddition {
    pub end_date: Option<NaiveDate>,
    pub days: Option<usize>,
    /// Parameter values replacing the inherited ones.
    #[serde(default)]
    pub params: ParamMap,
}

impl PhaseAddition {
    pub fn until(end_date: NaiveDate) -> Self {
        PhaseAddition {
            end_date: Some(end_date),
            ..Default::default()
        }
    }

    pub fn for_days(days: usize) -> Self {
        PhaseAddition {
            days: Some(days),
            ..Default::default()
        }
    }

    pub fn with_param(mut self, name: impl Into<String>, value: f64) -> Self {
        self.params.insert(name.into(), value);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseSeries {
    name: String,
    phases: Vec<Phase>,
}

impl PhaseSeries {
    /// Build a series from phases that are already sorted and disjoint.
    pub fn new(name: impl Into<String>, phases: Vec<Phase>) -> Result<Self> {
        check_order(&phases)?;
        Ok(PhaseSeries {
            name: name.into(),
            phases,
        })
    }

    /// The unsegmented baseline: one 0th phase spanning every record.
    pub fn baseline(name: impl Into<String>, records: &RecordSet) -> Result<Self> {
        let phase = Phase::new(records.first_date(), records.last_date())?;
        Self::new(name, vec![phase])
    }

    /// One phase per range of a trend segmentation.
    pub fn from_trend(name: impl Into<String>, trend: &TrendResult) -> Result<Self> {
        let phases = trend
            .ranges
            .iter()
            .map(|&(start, end)| Phase::new(start, end))
            .collect::<Result<Vec<_>>>()?;
        Self::new(name, phases)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn phases(&self) -> &[Phase] {
        &self.phases
    }

    pub fn len(&self) -> usize {
        self.phases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phases.is_empty()
    }

    /// Ordinal label of the phase at `idx`.
    pub fn label(idx: usize) -> String {
        int_to_ordinal(idx)
    }

    pub fn phase(&self, selector: PhaseSelector) -> Result<&Phase> {
        Ok(&self.phases[selector.resolve(self.phases.len())?])
    }

    pub(crate) fn phase_mut(&mut self, idx: usize) -> Option<&mut Phase> {
        self.phases.get_mut(idx)
    }

    /// Enabled phases with their positions.
    pub fn enabled(&self) -> impl Iterator<Item = (usize, &Phase)> {
        self.phases.iter().enumerate().filter(|(_, p)| p.is_enabled())
    }

    /// Position of the phase containing `date`.
    pub fn position_of(&self, date: NaiveDate) -> Option<usize> {
        self.phases.iter().position(|p| p.contains(date))
    }

    /// Append a phase after the current last one.
    ///
    /// The new phase starts the day after the last phase ends (or on the
    /// first record date of an empty series) and inherits the model, tau and
    /// parameters of the last phase before `addition.params` are applied.
    pub fn add(&mut self, addition: &PhaseAddition, records: &RecordSet) -> Result<()> {
        let last = self.phases.last();
        let start = match last {
            Some(p) => p.end().succ_opt().ok_or_else(|| {
                Error::InvalidDateRange(format!("no date follows {}", p.end()))
            })?,
            None => records.first_date(),
        };
        let end = match (addition.end_date, addition.days) {
            (Some(_), Some(_)) => {
                return Err(Error::InvalidDateRange(
                    "give either an end date or a number of days, not both".to_string(),
                ))
            }
            (Some(end), None) => end,
            (None, Some(0)) => {
                return Err(Error::InvalidDateRange("a phase needs at least one day".to_string()))
            }
            (None, Some(days)) => i64::try_from(days - 1)
                .ok()
                .and_then(Duration::try_days)
                .and_then(|offset| start.checked_add_signed(offset))
                .ok_or_else(|| {
                    Error::InvalidDateRange(format!(
                        "a phase of {days} days from {start} is out of the date range"
                    ))
                })?,
            (None, None) => records.last_date(),
        };
        if end < start {
            return Err(Error::InvalidDateRange(format!(
                "new phase would end on {end}, before its start {start}"
            )));
        }

        let mut phase = match last {
            Some(last) => {
                let mut inherited = last.clone();
                inherited.set_enabled(true);
                inherited.clear_fit();
                inherited
            }
            None => Phase::new(start, end)?,
        };
        phase.start = start;
        phase.end = end;
        phase.override_params(&addition.params)?;

        let mut phases = self.phases.clone();
        phases.push(phase);
        self.commit(phases, "add")
    }

    /// Remove the selected phases. Neighbours keep their dates.
    pub fn delete(&mut self, selectors: &[PhaseSelector]) -> Result<()> {
        let indices = PhaseSelector::resolve_all(selectors, self.phases.len())?;
        let phases = self
            .phases
            .iter()
            .enumerate()
            .filter(|(i, _)| indices.binary_search(i).is_err())
            .map(|(_, p)| p.clone())
            .collect();
        self.commit(phases, "delete")
    }

    /// Merge two or more consecutive, date-contiguous phases.
    ///
    /// The merged phase spans their range without model, parameters or fit
    /// metrics, and is enabled when any merged phase was.
    pub fn combine(&mut self, selectors: &[PhaseSelector]) -> Result<()> {
        let indices = PhaseSelector::resolve_all(selectors, self.phases.len())?;
        if indices.len() < 2 {
            return Err(Error::InvalidPhaseSelector(
                "combine needs at least two phases".to_string(),
            ));
        }
        for pair in indices.windows(2) {
            let (a, b) = (&self.phases[pair[0]], &self.phases[pair[1]]);
            if pair[1] != pair[0] + 1 || a.end().succ_opt() != Some(b.start()) {
                return Err(Error::InvalidPhaseSelector(format!(
                    "{} and {} are not adjacent",
                    int_to_ordinal(pair[0]),
                    int_to_ordinal(pair[1])
                )));
            }
        }

        let (first, last) = (indices[0], indices[indices.len() - 1]);
        let mut merged = Phase::new(self.phases[first].start(), self.phases[last].end())?;
        merged.set_enabled(self.phases[first..=last].iter().any(Phase::is_enabled));

        let mut phases = self.phases.clone();
        phases.drain(first..=last);
        phases.insert(first, merged);
        self.commit(phases, "combine")
    }

    /// Split the phase containing `date` so that a new phase starts there.
    pub fn separate(&mut self, date: NaiveDate) -> Result<()> {
        let idx = self
            .position_of(date)
            .ok_or(Error::DateNotInAnyPhase { date })?;
        if self.phases[idx].start() == date {
            return Err(Error::InvalidDateRange(format!(
                "{date} already starts the {} phase",
                int_to_ordinal(idx)
            )));
        }
        let (before, after) = self.phases[idx].split_at(date)?;
        let mut phases = self.phases.clone();
        phases[idx] = before;
        phases.insert(idx + 1, after);
        self.commit(phases, "separate")
    }

    pub fn enable(&mut self, selectors: &[PhaseSelector]) -> Result<()> {
        self.set_enabled(selectors, true)
    }

    pub fn disable(&mut self, selectors: &[PhaseSelector]) -> Result<()> {
        self.set_enabled(selectors, false)
    }

    fn set_enabled(&mut self, selectors: &[PhaseSelector], enabled: bool) -> Result<()> {
        let indices = PhaseSelector::resolve_all(selectors, self.phases.len())?;
        for idx in indices {
            self.phases[idx].set_enabled(enabled);
        }
        debug!(
            target: event_names::SERIES_EDITED,
            series = %self.name,
            op = if enabled { "enable" } else { "disable" },
            phases = self.phases.len(),
            "series edited"
        );
        Ok(())
    }

    /// Set model and full parameter set of one phase.
    pub fn assign(
        &mut self,
        selector: PhaseSelector,
        model: ModelKind,
        tau: Option<Tau>,
        params: &ParamMap,
    ) -> Result<()> {
        let idx = selector.resolve(self.phases.len())?;
        let mut phase = self.phases[idx].clone();
        phase.assign(model, tau, params)?;
        self.phases[idx] = phase;
        Ok(())
    }

    /// Read one metric of one phase.
    pub fn get(
        &self,
        metric: &Metric,
        selector: PhaseSelector,
        default_tau: Option<Tau>,
    ) -> Result<f64> {
        let idx = selector.resolve(self.phases.len())?;
        self.phases[idx]
            .metric(metric, default_tau)
            .ok_or_else(|| Error::MetricUnavailable {
                metric: metric.to_string(),
                phase: int_to_ordinal(idx),
            })
    }

    fn commit(&mut self, phases: Vec<Phase>, op: &'static str) -> Result<()> {
        check_order(&phases)?;
        self.phases = phases;
        debug!(
            target: event_names::SERIES_EDITED,
            series = %self.name,
            op,
            phases = self.phases.len(),
            "series edited"
        );
        Ok(())
    }
}

/// Phases must be ordered by date and must not overlap.
fn check_order(phases: &[Phase]) -> Result<()> {
    for phase in phases {
        if phase.start() > phase.end() {
            return Err(Error::InvalidDateRange(format!(
                "phase start {} is after its end {}",
                phase.start(),
                phase.end()
            )));
        }
    }
    for (i, pair) in phases.windows(2).enumerate() {
        if pair[1].start() <= pair[0].end() {
            return Err(Error::InvalidDateRange(format!(
                "the {} phase ({}..={}) overlaps or precedes the {} phase ({}..={})",
                int_to_ordinal(i + 1),
                pair[1].start(),
                pair[1].end(),
                int_to_ordinal(i),
                pair[0].start(),
                pair[0].end()
            )));
        }
    }
    Ok(())
}
