//! Time course of one quantity across phases and series.

use super::Scenario;
use crate::model::ModelKind;
use crate::phase::Metric;
use chrono::NaiveDate;
use ep_common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Quantity tracked by [`Scenario::history`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryTarget {
    Parameter(String),
    DayParameter(String),
    Rt,
    /// Model variable such as `Infected`, read daily from tracking.
    Variable(String),
}

impl HistoryTarget {
    fn metric(&self) -> Option<Metric> {
        match self {
            HistoryTarget::Parameter(name) => Some(Metric::Parameter(name.clone())),
            HistoryTarget::DayParameter(name) => Some(Metric::DayParameter(name.clone())),
            HistoryTarget::Rt => Some(Metric::Rt),
            HistoryTarget::Variable(_) => None,
        }
    }
}

impl FromStr for HistoryTarget {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let name = s.trim();
        let is_variable = ModelKind::ALL
            .iter()
            .any(|m| m.variables().contains(&name));
        Ok(match s.parse::<Metric>()? {
            Metric::Rt => HistoryTarget::Rt,
            Metric::DayParameter(name) => HistoryTarget::DayParameter(name),
            Metric::Parameter(_) if is_variable => HistoryTarget::Variable(name.to_string()),
            Metric::Parameter(name) => HistoryTarget::Parameter(name),
            other => {
                return Err(Error::InvalidParameter(format!(
                    "{other} has no history"
                )))
            }
        })
    }
}

impl std::fmt::Display for HistoryTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HistoryTarget::Parameter(name)
            | HistoryTarget::DayParameter(name)
            | HistoryTarget::Variable(name) => f.write_str(name),
            HistoryTarget::Rt => f.write_str("Rt"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryPoint {
    pub series: String,
    pub date: NaiveDate,
    /// Owning phase; set for phase-level targets and tracked days alike.
    pub phase: Option<String>,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct History {
    pub target: HistoryTarget,
    pub points: Vec<HistoryPoint>,
}

impl History {
    /// Points of one series, in date order.
    pub fn series<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a HistoryPoint> + 'a {
        self.points.iter().filter(move |p| p.series == name)
    }
}

impl Scenario {
    /// History of `target` for the named series (all series when `None`).
    ///
    /// Parameters, day parameters and Rt give one point per enabled phase,
    /// dated at the phase start; phases without a value are left out.
    /// Variables give one point per tracked day.
    pub fn history(&self, target: &HistoryTarget, names: Option<&[&str]>) -> Result<History> {
        let names: Vec<&str> = match names {
            Some(names) => names.to_vec(),
            None => self.series_names(),
        };

        let mut points = Vec::new();
        for name in names {
            let series = self.series(Some(name))?;
            match (target.metric(), target) {
                (Some(metric), _) => {
                    points.extend(series.enabled().filter_map(|(idx, phase)| {
                        phase.metric(&metric, self.tau).map(|value| HistoryPoint {
                            series: name.to_string(),
                            date: phase.start(),
                            phase: Some(crate::phase::PhaseSeries::label(idx)),
                            value,
                        })
                    }));
                }
                (None, HistoryTarget::Variable(variable)) => {
                    for row in self.track(Some(name))? {
                        let value = row.values.get(variable).copied().ok_or_else(|| {
                            Error::InvalidParameter(format!(
                                "{variable} is not a variable of the {name} series"
                            ))
                        })?;
                        points.push(HistoryPoint {
                            series: name.to_string(),
                            date: row.date,
                            phase: Some(row.phase),
                            value,
                        });
                    }
                }
                (None, _) => {}
            }
        }

        Ok(History {
            target: target.clone(),
            points,
        })
    }
}
