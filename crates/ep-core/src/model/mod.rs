//! Compartmental ODE models.
//!
//! The closed set of variants lives in [`ModelKind`]. Each variant supplies a
//! [`Compartmental`] definition: state variable names, ordered rate
//! parameters, the right-hand side of its ODE system, a closed-form
//! reproduction number and the mapping between observed records and model
//! state.
//!
//! All rates are per tau step and all state values are absolute counts, so
//! the population is passed to [`Compartmental::derivative`] explicitly.
//!
//! ```
//! use ep_core::model::{ModelKind, Tau};
//!
//! let model = ModelKind::Sir;
//! let params = model.params_from_map(&model.example().params).unwrap();
//! let r0 = model.calc_r0(&params).unwrap();
//! assert!((r0 - 0.2 / 0.075).abs() < 1e-12);
//!
//! let days = model.to_day_parameters(&params, Tau::DAY).unwrap();
//! assert!((days["1/gamma [day]"] - 1.0 / 0.075).abs() < 1e-9);
//! ```

pub mod sewirf;
pub mod sir;
pub mod sird;
pub mod sirf;
pub mod tau;

pub use tau::{Tau, MINUTES_PER_DAY};

use chrono::NaiveDate;
use ep_common::{Error, Record, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

/// Parameter values keyed by name.
pub type ParamMap = BTreeMap<String, f64>;

/// How a rate parameter converts into its day-scaled counterpart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamUnit {
    /// Rate per tau step; the day parameter is `tau / 1440 / rate` days.
    Rate,
    /// Dimensionless fraction; the day parameter equals the value.
    Dimensionless,
}

/// Example values used to generate synthetic records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelExample {
    pub population: u64,
    /// Initial state, aligned with [`Compartmental::variables`].
    pub initial: Vec<f64>,
    pub params: ParamMap,
}

/// Capability set shared by every model variant.
///
/// `parameters`, `units` and `day_parameters` are aligned: the i-th day
/// parameter is derived from the i-th parameter.
pub trait Compartmental: Send + Sync {
    fn name(&self) -> &'static str;

    fn variables(&self) -> &'static [&'static str];

    fn parameters(&self) -> &'static [&'static str];

    fn units(&self) -> &'static [ParamUnit];

    fn day_parameters(&self) -> &'static [&'static str];

    /// Indices of the variables compared against records when fitting.
    fn observed(&self) -> &'static [usize];

    /// Write `d(state)/dt` (per tau step) into `out`.
    fn derivative(&self, state: &[f64], params: &[f64], population: f64, out: &mut [f64]);

    /// Basic reproduction number for validated parameters.
    fn r0(&self, params: &[f64]) -> Result<f64>;

    /// Map an observed record onto the model state.
    fn specialize(&self, record: &Record) -> Vec<f64>;

    /// Persons not yet counted as confirmed.
    fn unconfirmed(&self, state: &[f64]) -> f64;

    fn recovered(&self, state: &[f64]) -> f64;

    fn fatal(&self, state: &[f64]) -> f64;

    fn example(&self) -> ModelExample;
}

/// The closed set of model variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ModelKind {
    #[serde(rename = "SIR")]
    Sir,
    #[serde(rename = "SIR-D")]
    Sird,
    #[serde(rename = "SIR-F")]
    Sirf,
    #[serde(rename = "SEWIR-F")]
    Sewirf,
}

impl ModelKind {
    pub const ALL: &'static [ModelKind] = &[
        ModelKind::Sir,
        ModelKind::Sird,
        ModelKind::Sirf,
        ModelKind::Sewirf,
    ];

    /// The variant's model definition.
    pub fn definition(self) -> &'static dyn Compartmental {
        match self {
            ModelKind::Sir => &sir::Sir,
            ModelKind::Sird => &sird::Sird,
            ModelKind::Sirf => &sirf::Sirf,
            ModelKind::Sewirf => &sewirf::Sewirf,
        }
    }

    pub fn name(self) -> &'static str {
        self.definition().name()
    }

    pub fn variables(self) -> &'static [&'static str] {
        self.definition().variables()
    }

    pub fn parameters(self) -> &'static [&'static str] {
        self.definition().parameters()
    }

    pub fn day_parameters(self) -> &'static [&'static str] {
        self.definition().day_parameters()
    }

    pub fn observed(self) -> &'static [usize] {
        self.definition().observed()
    }

    pub fn example(self) -> ModelExample {
        self.definition().example()
    }

    pub fn dimension(self) -> usize {
        self.variables().len()
    }

    /// Position of a state variable, by name.
    pub fn variable_index(self, name: &str) -> Option<usize> {
        self.variables().iter().position(|v| *v == name)
    }

    /// Box bounds used when fitting: every rate and `theta` lie in [0, 1].
    pub fn bounds(self) -> Vec<(f64, f64)> {
        vec![(0.0, 1.0); self.parameters().len()]
    }

    /// Check a parameter vector: right length, finite, non-negative,
    /// dimensionless fractions at most 1.
    pub fn validate_params(self, params: &[f64]) -> Result<()> {
        let names = self.parameters();
        if params.len() != names.len() {
            return Err(Error::InvalidParameter(format!(
                "{} expects {} parameters, got {}",
                self.name(),
                names.len(),
                params.len()
            )));
        }
        let units = self.definition().units();
        for ((name, unit), &value) in names.iter().zip(units).zip(params) {
            check_value(name, *unit, value)?;
        }
        Ok(())
    }

    /// Order a parameter map by the variant's parameter names.
    ///
    /// Unknown or missing names are rejected.
    pub fn params_from_map(self, map: &ParamMap) -> Result<Vec<f64>> {
        if let Some(unknown) = map.keys().find(|k| !self.parameters().contains(&k.as_str())) {
            return Err(Error::InvalidParameter(format!(
                "{} has no parameter named {unknown}",
                self.name()
            )));
        }
        let params = self
            .parameters()
            .iter()
            .map(|name| {
                map.get(*name).copied().ok_or_else(|| {
                    Error::InvalidParameter(format!("missing value for {name}"))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        self.validate_params(&params)?;
        Ok(params)
    }

    pub fn params_to_map(self, params: &[f64]) -> ParamMap {
        self.parameters()
            .iter()
            .zip(params)
            .map(|(name, value)| (name.to_string(), *value))
            .collect()
    }

    /// Check a single named value as a parameter of this variant.
    pub fn check_param(self, name: &str, value: f64) -> Result<()> {
        let idx = self
            .parameters()
            .iter()
            .position(|p| *p == name)
            .ok_or_else(|| {
                Error::InvalidParameter(format!("{} has no parameter named {name}", self.name()))
            })?;
        check_value(name, self.definition().units()[idx], value)
    }

    pub fn calc_r0(self, params: &[f64]) -> Result<f64> {
        self.validate_params(params)?;
        self.definition().r0(params)
    }

    /// Day-scaled parameters: `tau / 1440 / rate` days, infinite for a zero
    /// rate; dimensionless fractions pass through unchanged.
    pub fn to_day_parameters(self, params: &[f64], tau: Tau) -> Result<ParamMap> {
        self.validate_params(params)?;
        let def = self.definition();
        Ok(def
            .day_parameters()
            .iter()
            .zip(def.units())
            .zip(params)
            .map(|((name, unit), &value)| {
                let day_value = match unit {
                    ParamUnit::Dimensionless => value,
                    ParamUnit::Rate if value == 0.0 => f64::INFINITY,
                    ParamUnit::Rate => tau.days_per_step() / value,
                };
                (name.to_string(), day_value)
            })
            .collect())
    }

    /// Inverse of [`ModelKind::to_day_parameters`].
    pub fn from_day_parameters(self, day_params: &ParamMap, tau: Tau) -> Result<Vec<f64>> {
        let def = self.definition();
        if let Some(unknown) = day_params
            .keys()
            .find(|k| !def.day_parameters().contains(&k.as_str()))
        {
            return Err(Error::InvalidParameter(format!(
                "{} has no day parameter named {unknown}",
                self.name()
            )));
        }
        let params = def
            .day_parameters()
            .iter()
            .zip(def.units())
            .map(|(name, unit)| {
                let value = *day_params.get(*name).ok_or_else(|| {
                    Error::InvalidParameter(format!("missing value for {name}"))
                })?;
                match unit {
                    ParamUnit::Dimensionless => Ok(value),
                    ParamUnit::Rate if value == f64::INFINITY => Ok(0.0),
                    ParamUnit::Rate if value > 0.0 && value.is_finite() => {
                        Ok(tau.days_per_step() / value)
                    }
                    ParamUnit::Rate => Err(Error::InvalidParameter(format!(
                        "{name} must be positive, got {value}"
                    ))),
                }
            })
            .collect::<Result<Vec<_>>>()?;
        self.validate_params(&params)?;
        Ok(params)
    }

    /// Map an observed record onto the model state.
    pub fn specialize(self, record: &Record) -> Vec<f64> {
        self.definition().specialize(record)
    }

    /// Convert a model state back into a record.
    ///
    /// Counts are rounded. Confirmed is the population minus the rounded
    /// unconfirmed mass, raised if needed so the identity
    /// `confirmed = infected + recovered + fatal` holds with non-negative
    /// infected.
    pub fn record_from_state(
        self,
        date: NaiveDate,
        state: &[f64],
        population: u64,
    ) -> Result<Record> {
        let def = self.definition();
        let to_count = |value: f64| value.round().max(0.0) as u64;
        let unconfirmed = to_count(def.unconfirmed(state)).min(population);
        let recovered = to_count(def.recovered(state));
        let fatal = to_count(def.fatal(state));
        let confirmed = (population - unconfirmed).max(recovered + fatal);
        Record::from_cumulative(date, confirmed, recovered, fatal, population)
    }
}

fn check_value(name: &str, unit: ParamUnit, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(Error::InvalidParameter(format!(
            "{name} must be a finite non-negative number, got {value}"
        )));
    }
    if unit == ParamUnit::Dimensionless && value > 1.0 {
        return Err(Error::InvalidParameter(format!(
            "{name} must be at most 1, got {value}"
        )));
    }
    Ok(())
}

/// Reproduction number with a guarded denominator.
pub(crate) fn ratio(numerator: f64, denominator: f64, what: &str) -> Result<f64> {
    if denominator <= 0.0 {
        return Err(Error::InvalidParameter(format!(
            "{what} must be positive to compute R0"
        )));
    }
    Ok(numerator / denominator)
}

impl std::fmt::Display for ModelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for ModelKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_uppercase())
            .collect();
        match normalized.as_str() {
            "SIR" => Ok(ModelKind::Sir),
            "SIRD" => Ok(ModelKind::Sird),
            "SIRF" => Ok(ModelKind::Sirf),
            "SEWIRF" => Ok(ModelKind::Sewirf),
            _ => Err(Error::InvalidParameter(format!(
                "unknown model {s:?} (expected one of SIR, SIR-D, SIR-F, SEWIR-F)"
            ))),
        }
    }
}
