//! SIR-D: SIR with a separate fatal compartment fed from the infected.
//!
//! ```text
//! dS/dt = -rho * S * I / N
//! dI/dt =  rho * S * I / N - (sigma + kappa) * I
//! dR/dt =  sigma * I
//! dD/dt =  kappa * I
//! ```

use super::{ratio, Compartmental, ModelExample, ParamUnit};
use ep_common::{Record, Result};

pub struct Sird;

const S: usize = 0;
const I: usize = 1;
const R: usize = 2;
const F: usize = 3;

impl Compartmental for Sird {
    fn name(&self) -> &'static str {
        "SIR-D"
    }

    fn variables(&self) -> &'static [&'static str] {
        &["Susceptible", "Infected", "Recovered", "Fatal"]
    }

    fn parameters(&self) -> &'static [&'static str] {
        &["kappa", "rho", "sigma"]
    }

    fn units(&self) -> &'static [ParamUnit] {
        &[ParamUnit::Rate, ParamUnit::Rate, ParamUnit::Rate]
    }

    fn day_parameters(&self) -> &'static [&'static str] {
        &["1/alpha2 [day]", "1/beta [day]", "1/gamma [day]"]
    }

    fn observed(&self) -> &'static [usize] {
        &[I, R, F]
    }

    fn derivative(&self, state: &[f64], params: &[f64], population: f64, out: &mut [f64]) {
        let (kappa, rho, sigma) = (params[0], params[1], params[2]);
        let infection = rho * state[S] * state[I] / population;
        out[S] = -infection;
        out[I] = infection - (sigma + kappa) * state[I];
        out[R] = sigma * state[I];
        out[F] = kappa * state[I];
    }

    fn r0(&self, params: &[f64]) -> Result<f64> {
        let (kappa, rho, sigma) = (params[0], params[1], params[2]);
        ratio(rho, sigma + kappa, "sigma + kappa")
    }

    fn specialize(&self, record: &Record) -> Vec<f64> {
        vec![
            record.susceptible as f64,
            record.infected as f64,
            record.recovered as f64,
            record.fatal as f64,
        ]
    }

    fn unconfirmed(&self, state: &[f64]) -> f64 {
        state[S]
    }

    fn recovered(&self, state: &[f64]) -> f64 {
        state[R]
    }

    fn fatal(&self, state: &[f64]) -> f64 {
        state[F]
    }

    fn example(&self) -> ModelExample {
        ModelExample {
            population: 1_000_000,
            initial: vec![999_000.0, 1_000.0, 0.0, 0.0],
            params: [("kappa", 0.005), ("rho", 0.2), ("sigma", 0.075)]
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derivative_conserves_population() {
        let mut out = [0.0; 4];
        Sird.derivative(&[900.0, 80.0, 15.0, 5.0], &[0.01, 0.3, 0.1], 1_000.0, &mut out);
        assert!(out.iter().sum::<f64>().abs() < 1e-12);
        assert!((out[3] - 0.8).abs() < 1e-12);
    }
}
