//! Synthetic records from a model's example values.

use crate::model::{ModelKind, ParamMap, Tau};
use crate::simulation::simulate;
use chrono::NaiveDate;
use ep_common::{RecordSet, Result};

/// Generates daily records by simulating a model forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExampleData {
    tau: Tau,
    start_date: NaiveDate,
}

impl Default for ExampleData {
    fn default() -> Self {
        Self {
            tau: Tau::DAY,
            start_date: NaiveDate::from_ymd_opt(2022, 1, 1).unwrap_or_default(),
        }
    }
}

impl ExampleData {
    pub fn new(tau: Tau, start_date: NaiveDate) -> Self {
        Self { tau, start_date }
    }

    pub fn tau(&self) -> Tau {
        self.tau
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    /// Simulate `days` days of `model` from its example state and return
    /// `days + 1` records, the first dated `start_date`.
    ///
    /// `overrides` replaces example parameter values by name; names the model
    /// does not know are rejected.
    pub fn generate(
        &self,
        model: ModelKind,
        days: usize,
        overrides: &ParamMap,
    ) -> Result<RecordSet> {
        let example = model.example();
        let mut values = example.params;
        for (name, &value) in overrides {
            model.check_param(name, value)?;
            values.insert(name.clone(), value);
        }
        let params = model.params_from_map(&values)?;
        let trajectory = simulate(
            model,
            &example.initial,
            &params,
            example.population,
            self.tau,
            days,
        )?;
        let records = trajectory.to_records(self.start_date, example.population)?;
        RecordSet::new(records, example.population)
    }
}
