//! Simulation across the enabled phases of a series.

use super::Scenario;
use crate::logging::event_names;
use crate::model::ModelKind;
use crate::phase::{Metric, PhaseSeries};
use crate::simulation::Simulator;
use chrono::NaiveDate;
use ep_common::{int_to_ordinal, Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Simulated state on one day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackRow {
    pub date: NaiveDate,
    pub phase: String,
    /// Values keyed by model variable name.
    pub values: BTreeMap<String, f64>,
}

/// Headline figures of one series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesDescription {
    pub series: String,
    pub max_infected: Option<f64>,
    pub max_infected_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub last_infected: Option<f64>,
    pub last_fatal: Option<f64>,
    /// Rt per enabled phase label.
    pub rt: BTreeMap<String, f64>,
}

impl Scenario {
    /// Simulate the enabled phases of a series back to back.
    ///
    /// The run starts from the record on the first enabled phase's start
    /// date; each phase continues from the previous phase's last state.
    /// All enabled phases must use one model, carry parameters and be
    /// contiguous. A series without enabled phases tracks to nothing.
    pub fn track(&self, name: Option<&str>) -> Result<Vec<TrackRow>> {
        let series = self.series(name)?;
        let enabled: Vec<_> = series.enabled().collect();
        let Some(&(_, first)) = enabled.first() else {
            return Ok(Vec::new());
        };

        let mut model: Option<ModelKind> = None;
        let mut plan = Vec::with_capacity(enabled.len());
        for (pos, &(idx, phase)) in enabled.iter().enumerate() {
            let unavailable = |metric: &str| Error::MetricUnavailable {
                metric: metric.to_string(),
                phase: int_to_ordinal(idx),
            };
            let (phase_model, params) = phase
                .param_vector()
                .ok_or_else(|| unavailable("parameters"))?;
            match model {
                Some(m) if m != phase_model => {
                    return Err(Error::InvalidParameter(format!(
                        "the {} phase uses {phase_model}, earlier phases use {m}",
                        int_to_ordinal(idx)
                    )))
                }
                _ => model = Some(phase_model),
            }
            if pos > 0 {
                let prev = enabled[pos - 1].1;
                if prev.end().succ_opt() != Some(phase.start()) {
                    return Err(Error::InvalidDateRange(format!(
                        "enabled phases are not contiguous: {} ends {}, {} starts {}",
                        int_to_ordinal(enabled[pos - 1].0),
                        prev.end(),
                        int_to_ordinal(idx),
                        phase.start()
                    )));
                }
            }
            let tau = phase.tau().or(self.tau).ok_or_else(|| unavailable("tau"))?;
            plan.push((idx, phase, params, tau));
        }
        let model = model.ok_or_else(|| Error::InvalidParameter("no model".to_string()))?;

        let start_record = self.records.get(first.start()).ok_or_else(|| {
            Error::InvalidDateRange(format!(
                "no record on {}, where tracking would start",
                first.start()
            ))
        })?;
        let mut state = model.specialize(start_record);
        let mut date = first.start();
        let mut rows = vec![self.row(model, date, PhaseSeries::label(plan[0].0), &state)];

        for (idx, phase, params, tau) in plan {
            let days = (phase.end() - date).num_days() as usize;
            let mut simulator = Simulator::new(model, self.population(), tau)?;
            let trajectory = simulator.run(&state, &params, days)?;
            let label = int_to_ordinal(idx);
            for snapshot in &trajectory.snapshots[1..] {
                date = date.succ_opt().ok_or_else(|| {
                    Error::InvalidDateRange("date overflow while tracking".to_string())
                })?;
                rows.push(self.row(model, date, label.clone(), snapshot));
            }
            if let Some(last) = trajectory.last() {
                state = last.to_vec();
            }
        }

        debug!(
            target: event_names::TRACK_FINISHED,
            series = series.name(),
            days = rows.len(),
            "series tracked"
        );
        Ok(rows)
    }

    fn row(&self, model: ModelKind, date: NaiveDate, phase: String, state: &[f64]) -> TrackRow {
        TrackRow {
            date,
            phase,
            values: model
                .variables()
                .iter()
                .zip(state)
                .map(|(name, value)| (name.to_string(), *value))
                .collect(),
        }
    }

    /// Peak and final figures of every series, from tracking.
    pub fn describe(&self) -> Result<Vec<SeriesDescription>> {
        self.series
            .values()
            .map(|series| {
                let rows = self.track(Some(series.name()))?;
                let infected = |row: &TrackRow| row.values.get("Infected").copied();
                let peak = rows
                    .iter()
                    .filter_map(|row| infected(row).map(|v| (row.date, v)))
                    .fold(None, |best: Option<(NaiveDate, f64)>, (date, v)| match best {
                        Some((_, max)) if max >= v => best,
                        _ => Some((date, v)),
                    });
                let last = rows.last();
                let rt = series
                    .enabled()
                    .filter_map(|(idx, phase)| {
                        phase
                            .metric(&Metric::Rt, self.tau)
                            .map(|v| (int_to_ordinal(idx), v))
                    })
                    .collect();
                Ok(SeriesDescription {
                    series: series.name().to_string(),
                    max_infected: peak.map(|(_, v)| v),
                    max_infected_date: peak.map(|(d, _)| d),
                    last_date: last.map(|row| row.date),
                    last_infected: last.and_then(infected),
                    last_fatal: last.and_then(|row| row.values.get("Fatal").copied()),
                    rt,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::example::ExampleData;
    use crate::model::ParamMap;
    use crate::phase::PhaseAddition;
    use ep_common::PhaseSelector;
    use ep_config::EngineConfig;

    fn scenario(model: ModelKind) -> Scenario {
        let records = ExampleData::default()
            .generate(model, 40, &ParamMap::new())
            .unwrap();
        let mut config = EngineConfig::default();
        config.tau.fixed = Some(1440);
        let mut s = Scenario::new(records, config).unwrap();
        s.assign(PhaseSelector::Index(0), model, &model.example().params, None)
            .unwrap();
        s
    }

    #[test]
    fn tracking_true_parameters_reproduces_records() {
        let s = scenario(ModelKind::Sird);
        let rows = s.track(None).unwrap();
        assert_eq!(rows.len(), s.records().len());
        for (row, record) in rows.iter().zip(s.records().iter()) {
            assert_eq!(row.date, record.date);
            assert!((row.values["Infected"] - record.infected as f64).abs() <= 2.0);
            assert!((row.values["Fatal"] - record.fatal as f64).abs() <= 1.0);
        }
    }

    #[test]
    fn tracking_extends_into_future_phases() {
        let mut s = scenario(ModelKind::Sir);
        s.add(&PhaseAddition::for_days(20).with_param("rho", 0.05), None)
            .unwrap();
        let rows = s.track(None).unwrap();
        assert_eq!(rows.len(), s.records().len() + 20);
        assert_eq!(rows.last().unwrap().phase, "1st");
        assert_eq!(rows[0].phase, "0th");
    }

    #[test]
    fn gaps_and_missing_params_rejected() {
        let mut s = scenario(ModelKind::Sir);
        s.add(&PhaseAddition::for_days(10), None).unwrap();
        s.add(&PhaseAddition::for_days(10), None).unwrap();
        s.delete(&[PhaseSelector::Index(1)], None).unwrap();
        assert!(matches!(s.track(None), Err(Error::InvalidDateRange(_))));

        // Disabling the phase after the gap restores contiguity.
        s.disable(&[PhaseSelector::Last], None).unwrap();
        assert!(s.track(None).is_ok());

        s.clear(Some("Bare"), None).unwrap();
        assert!(matches!(
            s.track(Some("Bare")),
            Err(Error::MetricUnavailable { .. })
        ));
    }

    #[test]
    fn mixed_models_rejected() {
        let mut s = scenario(ModelKind::Sir);
        let first = s.records().first_date();
        s.separate(first + chrono::Duration::days(20), None).unwrap();
        s.assign(
            PhaseSelector::Last,
            ModelKind::Sird,
            &ModelKind::Sird.example().params,
            None,
        )
        .unwrap();
        assert!(matches!(s.track(None), Err(Error::InvalidParameter(_))));
    }

    #[test]
    fn all_disabled_tracks_nothing() {
        let mut s = scenario(ModelKind::Sir);
        s.disable(&[PhaseSelector::Index(0)], None).unwrap();
        assert!(s.track(None).unwrap().is_empty());
        let description = s.describe().unwrap();
        assert_eq!(description[0].max_infected, None);
        assert!(description[0].rt.is_empty());
    }

    #[test]
    fn describe_reports_peak_and_last_values() {
        let s = scenario(ModelKind::Sirf);
        let rows = s.track(None).unwrap();
        let description = s.describe().unwrap();
        assert_eq!(description.len(), 1);
        let d = &description[0];
        let max = rows
            .iter()
            .map(|r| r.values["Infected"])
            .fold(f64::MIN, f64::max);
        assert_eq!(d.max_infected, Some(max));
        assert_eq!(d.last_date, Some(s.records().last_date()));
        assert!(d.last_fatal.unwrap() > 0.0);
        assert!(d.rt.contains_key("0th"));
    }
}
