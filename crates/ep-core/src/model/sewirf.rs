//! SEWIR-F: SIR-F with two unobserved pre-confirmation stages.
//!
//! Exposed (E) persons become waiting (W), who turn into confirmed cases.
//! Both W and I are infectious.
//!
//! ```text
//! dS/dt = -rho1 * S * (W + I) / N
//! dE/dt =  rho1 * S * (W + I) / N - rho2 * E
//! dW/dt =  rho2 * E - rho3 * W
//! dI/dt =  (1 - theta) * rho3 * W - (sigma + kappa) * I
//! dR/dt =  sigma * I
//! dF/dt =  theta * rho3 * W + kappa * I
//! ```
//!
//! Records carry no E or W counts; they are taken as zero when a record is
//! mapped onto the model state.

use super::{ratio, Compartmental, ModelExample, ParamUnit};
use ep_common::{Record, Result};

pub struct Sewirf;

const S: usize = 0;
const E: usize = 1;
const W: usize = 2;
const I: usize = 3;
const R: usize = 4;
const F: usize = 5;

impl Compartmental for Sewirf {
    fn name(&self) -> &'static str {
        "SEWIR-F"
    }

    fn variables(&self) -> &'static [&'static str] {
        &[
            "Susceptible",
            "Exposed",
            "Waiting",
            "Infected",
            "Recovered",
            "Fatal",
        ]
    }

    fn parameters(&self) -> &'static [&'static str] {
        &["theta", "kappa", "rho1", "rho2", "rho3", "sigma"]
    }

    fn units(&self) -> &'static [ParamUnit] {
        &[
            ParamUnit::Dimensionless,
            ParamUnit::Rate,
            ParamUnit::Rate,
            ParamUnit::Rate,
            ParamUnit::Rate,
            ParamUnit::Rate,
        ]
    }

    fn day_parameters(&self) -> &'static [&'static str] {
        &[
            "alpha1 [-]",
            "1/alpha2 [day]",
            "1/beta1 [day]",
            "1/beta2 [day]",
            "1/beta3 [day]",
            "1/gamma [day]",
        ]
    }

    fn observed(&self) -> &'static [usize] {
        &[I, R, F]
    }

    fn derivative(&self, state: &[f64], params: &[f64], population: f64, out: &mut [f64]) {
        let (theta, kappa, rho1, rho2, rho3, sigma) =
            (params[0], params[1], params[2], params[3], params[4], params[5]);
        let exposure = rho1 * state[S] * (state[W] + state[I]) / population;
        let incubation = rho2 * state[E];
        let onset = rho3 * state[W];
        out[S] = -exposure;
        out[E] = exposure - incubation;
        out[W] = incubation - onset;
        out[I] = (1.0 - theta) * onset - (sigma + kappa) * state[I];
        out[R] = sigma * state[I];
        out[F] = theta * onset + kappa * state[I];
    }

    fn r0(&self, params: &[f64]) -> Result<f64> {
        let (theta, kappa, rho1, sigma) = (params[0], params[1], params[2], params[5]);
        ratio(rho1 * (1.0 - theta), sigma + kappa, "sigma + kappa")
    }

    fn specialize(&self, record: &Record) -> Vec<f64> {
        vec![
            record.susceptible as f64,
            0.0,
            0.0,
            record.infected as f64,
            record.recovered as f64,
            record.fatal as f64,
        ]
    }

    fn unconfirmed(&self, state: &[f64]) -> f64 {
        state[S] + state[E] + state[W]
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
            initial: vec![998_900.0, 90.0, 10.0, 1_000.0, 0.0, 0.0],
            params: [
                ("theta", 0.002),
                ("kappa", 0.005),
                ("rho1", 0.2),
                ("rho2", 0.167),
                ("rho3", 0.167),
                ("sigma", 0.075),
            ]
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
        let mut out = [0.0; 6];
        Sewirf.derivative(
            &[900.0, 30.0, 20.0, 40.0, 8.0, 2.0],
            &[0.05, 0.01, 0.3, 0.2, 0.25, 0.1],
            1_000.0,
            &mut out,
        );
        assert!(out.iter().sum::<f64>().abs() < 1e-12);
    }

    #[test]
    fn unconfirmed_includes_pre_confirmation_stages() {
        let state = [900.0, 30.0, 20.0, 40.0, 8.0, 2.0];
        assert_eq!(Sewirf.unconfirmed(&state), 950.0);
    }
}
