//! Phase summaries.

use super::Scenario;
use crate::model::{ModelKind, ParamMap, Tau};
use crate::phase::{Metric, Phase, PhaseSeries};
use chrono::NaiveDate;
use ep_common::{int_to_ordinal, Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// One enabled phase of one series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRow {
    pub series: String,
    pub phase: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub population: u64,
    pub model: Option<ModelKind>,
    pub tau: Option<Tau>,
    pub params: ParamMap,
    pub day_params: ParamMap,
    pub rt: Option<f64>,
    pub rmsle: Option<f64>,
    pub trials: Option<usize>,
    pub runtime_secs: Option<f64>,
}

impl SummaryRow {
    fn new(
        series: &str,
        idx: usize,
        phase: &Phase,
        population: u64,
        default_tau: Option<Tau>,
    ) -> Self {
        let tau = phase.tau().or(default_tau);
        let day_params = match (phase.param_vector(), tau) {
            (Some((model, values)), Some(tau)) => {
                model.to_day_parameters(&values, tau).unwrap_or_default()
            }
            _ => ParamMap::new(),
        };
        SummaryRow {
            series: series.to_string(),
            phase: int_to_ordinal(idx),
            start: phase.start(),
            end: phase.end(),
            population,
            model: phase.model(),
            tau,
            params: phase.params().clone(),
            day_params,
            rt: phase.metric(&Metric::Rt, default_tau),
            rmsle: phase.fit().map(|f| f.rmsle),
            trials: phase.fit().map(|f| f.trials),
            runtime_secs: phase.fit().map(|f| f.runtime_secs),
        }
    }

    /// Value of a named column: a fixed column ("Start", "ODE", "Rt", ...),
    /// a parameter or a day parameter. `None` for unknown names.
    pub fn column(&self, name: &str) -> Option<Value> {
        let value = match name {
            "Series" => json!(self.series),
            "Phase" => json!(self.phase),
            "Start" => json!(self.start),
            "End" => json!(self.end),
            "Population" => json!(self.population),
            "ODE" => json!(self.model.map(ModelKind::name)),
            "tau" => json!(self.tau.map(Tau::minutes)),
            "Rt" => json!(self.rt),
            "RMSLE" => json!(self.rmsle),
            "Trials" => json!(self.trials),
            "Runtime" => json!(self.runtime_secs),
            other => {
                if let Some(v) = self.params.get(other).or_else(|| self.day_params.get(other)) {
                    return Some(json!(v));
                }
                let known = ModelKind::ALL.iter().any(|m| {
                    m.parameters().contains(&other) || m.day_parameters().contains(&other)
                });
                return known.then_some(Value::Null);
            }
        };
        Some(value)
    }
}

impl Scenario {
    /// One row per enabled phase, for one series or (with `None`) all of them.
    pub fn summary(&self, name: Option<&str>) -> Result<Vec<SummaryRow>> {
        let series: Vec<&PhaseSeries> = match name {
            Some(name) => vec![self.series(Some(name))?],
            None => self.series.values().collect(),
        };
        Ok(series
            .into_iter()
            .flat_map(|s| {
                s.enabled().map(move |(idx, phase)| {
                    SummaryRow::new(s.name(), idx, phase, self.population(), self.tau)
                })
            })
            .collect())
    }

    /// Summary restricted to the given columns, in order.
    pub fn summary_table(
        &self,
        name: Option<&str>,
        columns: &[&str],
    ) -> Result<Vec<Map<String, Value>>> {
        self.summary(name)?
            .iter()
            .map(|row| {
                columns
                    .iter()
                    .map(|&col| {
                        row.column(col)
                            .map(|v| (col.to_string(), v))
                            .ok_or_else(|| {
                                Error::InvalidParameter(format!("unknown summary column {col}"))
                            })
                    })
                    .collect::<Result<Map<String, Value>>>()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::example::ExampleData;
    use crate::scenario::MAIN;
    use ep_common::PhaseSelector;
    use ep_config::EngineConfig;

    fn scenario() -> Scenario {
        let records = ExampleData::default()
            .generate(ModelKind::Sir, 40, &ParamMap::new())
            .unwrap();
        let mut config = EngineConfig::default();
        config.tau.fixed = Some(1440);
        let mut s = Scenario::new(records, config).unwrap();
        let start = s.records().first_date();
        s.separate(start + chrono::Duration::days(20), None).unwrap();
        s.assign(PhaseSelector::Index(0), ModelKind::Sir, &ModelKind::Sir.example().params, None)
            .unwrap();
        s
    }

    #[test]
    fn rows_follow_enabled_phases() {
        let mut s = scenario();
        let rows = s.summary(None).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].phase, "0th");
        assert_eq!(rows[0].series, MAIN);
        assert_eq!(rows[0].model, Some(ModelKind::Sir));
        assert!((rows[0].rt.unwrap() - 0.2 / 0.075).abs() < 1e-12);
        assert!((rows[0].day_params["1/beta [day]"] - 5.0).abs() < 1e-12);
        assert_eq!(rows[1].rt, None);

        s.disable(&[PhaseSelector::Index(0)], None).unwrap();
        let rows = s.summary(None).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].phase, "1st");
    }

    #[test]
    fn disabling_everything_gives_empty_summary() {
        let mut s = scenario();
        let all = [PhaseSelector::Index(0), PhaseSelector::Index(1)];
        s.disable(&all, None).unwrap();
        assert!(s.summary(None).unwrap().is_empty());
        s.enable(&all, None).unwrap();
        assert_eq!(s.summary(None).unwrap().len(), 2);
    }

    #[test]
    fn summary_covers_every_series_by_default() {
        let mut s = scenario();
        s.clear(Some("Alt"), Some(MAIN)).unwrap();
        assert_eq!(s.summary(None).unwrap().len(), 4);
        assert_eq!(s.summary(Some("Alt")).unwrap().len(), 2);
        assert!(s.summary(Some("Missing")).is_err());
    }

    #[test]
    fn table_selects_columns() {
        let s = scenario();
        let table = s
            .summary_table(None, &["Start", "ODE", "rho", "Rt", "sigma"])
            .unwrap();
        assert_eq!(table[0]["ODE"], "SIR");
        assert_eq!(table[0]["rho"], 0.2);
        assert_eq!(table[1]["ODE"], Value::Null);
        assert_eq!(table[1]["rho"], Value::Null);
        assert!(s.summary_table(None, &["Bogus"]).is_err());
    }
}
