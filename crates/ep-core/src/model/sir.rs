//! SIR: susceptible, infected, and a merged fatal-or-recovered compartment.
//!
//! ```text
//! dS/dt = -rho * S * I / N
//! dI/dt =  rho * S * I / N - sigma * I
//! dR/dt =  sigma * I
//! ```

use super::{ratio, Compartmental, ModelExample, ParamUnit};
use ep_common::{Record, Result};

pub struct Sir;

const S: usize = 0;
const I: usize = 1;
const FR: usize = 2;

impl Compartmental for Sir {
    fn name(&self) -> &'static str {
        "SIR"
    }

    fn variables(&self) -> &'static [&'static str] {
        &["Susceptible", "Infected", "Fatal or Recovered"]
    }

    fn parameters(&self) -> &'static [&'static str] {
        &["rho", "sigma"]
    }

    fn units(&self) -> &'static [ParamUnit] {
        &[ParamUnit::Rate, ParamUnit::Rate]
    }

    fn day_parameters(&self) -> &'static [&'static str] {
        &["1/beta [day]", "1/gamma [day]"]
    }

    fn observed(&self) -> &'static [usize] {
        &[I, FR]
    }

    fn derivative(&self, state: &[f64], params: &[f64], population: f64, out: &mut [f64]) {
        let (rho, sigma) = (params[0], params[1]);
        let infection = rho * state[S] * state[I] / population;
        let recovery = sigma * state[I];
        out[S] = -infection;
        out[I] = infection - recovery;
        out[FR] = recovery;
    }

    fn r0(&self, params: &[f64]) -> Result<f64> {
        ratio(params[0], params[1], "sigma")
    }

    fn specialize(&self, record: &Record) -> Vec<f64> {
        vec![
            record.susceptible as f64,
            record.infected as f64,
            (record.recovered + record.fatal) as f64,
        ]
    }

    fn unconfirmed(&self, state: &[f64]) -> f64 {
        state[S]
    }

    fn recovered(&self, state: &[f64]) -> f64 {
        state[FR]
    }

    fn fatal(&self, _state: &[f64]) -> f64 {
        0.0
    }

    fn example(&self) -> ModelExample {
        ModelExample {
            population: 1_000_000,
            initial: vec![999_000.0, 1_000.0, 0.0],
            params: [("rho", 0.2), ("sigma", 0.075)]
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        }
    }
}
