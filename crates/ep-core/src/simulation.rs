//! Forward simulation of a compartmental model.
//!
//! The model is integrated with classical RK4 using `1440 / tau` steps per
//! day and sampled once per day. Values are never clipped: a state that goes
//! non-finite or more than [`NEGATIVE_TOLERANCE`] persons below zero aborts
//! the run with [`Error::SimulationDiverged`].

use crate::model::{ModelKind, Tau};
use chrono::{Duration, NaiveDate};
use ep_common::{Error, Record, Result};
use ep_math::Rk4;
use serde::{Deserialize, Serialize};

/// How far below zero a compartment may drift before the run is rejected.
pub const NEGATIVE_TOLERANCE: f64 = 1e-6;

/// Daily snapshots of a simulated model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    pub model: ModelKind,
    /// `snapshots[d]` is the state at the end of day `d`; day 0 is the
    /// initial state.
    pub snapshots: Vec<Vec<f64>>,
}

impl Trajectory {
    /// Number of snapshots (simulated days + 1).
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn last(&self) -> Option<&[f64]> {
        self.snapshots.last().map(Vec::as_slice)
    }

    /// One variable across all days.
    pub fn column(&self, variable: usize) -> Vec<f64> {
        self.snapshots.iter().map(|s| s[variable]).collect()
    }

    /// Convert every snapshot into a record, day 0 dated `start`.
    pub fn to_records(&self, start: NaiveDate, population: u64) -> Result<Vec<Record>> {
        self.snapshots
            .iter()
            .enumerate()
            .map(|(day, state)| {
                let date = i64::try_from(day)
                    .ok()
                    .and_then(Duration::try_days)
                    .and_then(|offset| start.checked_add_signed(offset))
                    .ok_or_else(|| {
                        Error::InvalidDateRange(format!("day {day} after {start} has no date"))
                    })?;
                self.model.record_from_state(date, state, population)
            })
            .collect()
    }
}

/// Reusable simulator for one model, population and tau.
///
/// Holds the RK4 scratch buffers so the estimator can run many trials
/// without reallocating them.
#[derive(Debug, Clone)]
pub struct Simulator {
    model: ModelKind,
    population: f64,
    tau: Tau,
    stepper: Rk4,
}

impl Simulator {
    pub fn new(model: ModelKind, population: u64, tau: Tau) -> Result<Self> {
        if population == 0 {
            return Err(Error::InvalidParameter("population must be positive".to_string()));
        }
        Ok(Simulator {
            model,
            population: population as f64,
            tau,
            stepper: Rk4::new(model.dimension()),
        })
    }

    pub fn model(&self) -> ModelKind {
        self.model
    }

    pub fn tau(&self) -> Tau {
        self.tau
    }

    /// Simulate `n_days` days from `initial`, returning `n_days + 1` snapshots.
    pub fn run(&mut self, initial: &[f64], params: &[f64], n_days: usize) -> Result<Trajectory> {
        self.model.validate_params(params)?;
        self.check_initial(initial)?;

        let def = self.model.definition();
        let population = self.population;
        let rhs = |y: &[f64], out: &mut [f64]| def.derivative(y, params, population, out);
        let steps_per_day = self.tau.steps_per_day();

        let mut state = initial.to_vec();
        let mut snapshots = Vec::with_capacity(n_days + 1);
        snapshots.push(state.clone());

        for day in 0..n_days {
            for sub in 0..steps_per_day {
                self.stepper.step(&rhs, &mut state, 1.0);
                check_state(self.model, &state, day * steps_per_day + sub + 1)?;
            }
            snapshots.push(state.clone());
        }

        Ok(Trajectory {
            model: self.model,
            snapshots,
        })
    }

    fn check_initial(&self, initial: &[f64]) -> Result<()> {
        if initial.len() != self.model.dimension() {
            return Err(Error::InvalidParameter(format!(
                "{} needs {} initial values, got {}",
                self.model,
                self.model.dimension(),
                initial.len()
            )));
        }
        if let Some((idx, value)) = initial
            .iter()
            .enumerate()
            .find(|(_, v)| !v.is_finite() || **v < 0.0)
        {
            return Err(Error::InvalidParameter(format!(
                "initial {} must be a finite non-negative count, got {value}",
                self.model.variables()[idx]
            )));
        }
        Ok(())
    }
}

fn check_state(model: ModelKind, state: &[f64], step: usize) -> Result<()> {
    match state
        .iter()
        .enumerate()
        .find(|(_, v)| !v.is_finite() || **v < -NEGATIVE_TOLERANCE)
    {
        Some((idx, &value)) => Err(Error::SimulationDiverged {
            step,
            variable: model.variables()[idx].to_string(),
            value,
        }),
        None => Ok(()),
    }
}

/// One-shot simulation.
pub fn simulate(
    model: ModelKind,
    initial: &[f64],
    params: &[f64],
    population: u64,
    tau: Tau,
    n_days: usize,
) -> Result<Trajectory> {
    Simulator::new(model, population, tau)?.run(initial, params, n_days)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn example_run(model: ModelKind, tau: Tau, days: usize) -> Trajectory {
        let example = model.example();
        let params = model.params_from_map(&example.params).unwrap();
        simulate(model, &example.initial, &params, example.population, tau, days).unwrap()
    }

    #[test]
    fn returns_n_plus_one_snapshots() {
        let traj = example_run(ModelKind::Sir, Tau::DAY, 30);
        assert_eq!(traj.len(), 31);
        assert_eq!(traj.snapshots[0], vec![999_000.0, 1_000.0, 0.0]);
    }

    #[test]
    fn zero_days_returns_initial_state() {
        let traj = example_run(ModelKind::Sirf, Tau::DAY, 0);
        assert_eq!(traj.len(), 1);
    }

    #[test]
    fn population_is_conserved() {
        for &model in ModelKind::ALL {
            let traj = example_run(model, Tau::new(360).unwrap(), 120);
            for state in &traj.snapshots {
                let total: f64 = state.iter().sum();
                assert!((total - 1_000_000.0).abs() < 1e-3, "{model}: {total}");
                assert!(state.iter().all(|v| *v >= -NEGATIVE_TOLERANCE));
            }
        }
    }

    #[test]
    fn deterministic() {
        let a = example_run(ModelKind::Sewirf, Tau::new(720).unwrap(), 60);
        let b = example_run(ModelKind::Sewirf, Tau::new(720).unwrap(), 60);
        assert_eq!(a, b);
    }

    #[test]
    fn finer_tau_takes_more_steps_per_day() {
        // With rates per step, halving tau doubles the daily flow.
        let params = [0.0, 0.1];
        let coarse =
            simulate(ModelKind::Sir, &[0.0, 1_000.0, 0.0], &params, 1_000, Tau::DAY, 1).unwrap();
        let fine = simulate(
            ModelKind::Sir,
            &[0.0, 1_000.0, 0.0],
            &params,
            1_000,
            Tau::new(720).unwrap(),
            1,
        )
        .unwrap();
        assert!(fine.snapshots[1][2] > coarse.snapshots[1][2]);
    }

    #[test]
    fn divergence_is_reported_not_clipped() {
        // An infection rate of 50 per step overshoots within the first RK4
        // step and pushes the infected compartment far below zero.
        let mut sim = Simulator::new(ModelKind::Sir, 1_000, Tau::DAY).unwrap();
        let err = sim.run(&[500.0, 500.0, 0.0], &[50.0, 0.0], 5).unwrap_err();
        match err {
            Error::SimulationDiverged {
                step,
                variable,
                value,
            } => {
                assert_eq!(step, 1);
                assert_eq!(variable, "Infected");
                assert!(value < 0.0);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn invalid_inputs_are_rejected() {
        assert!(simulate(ModelKind::Sir, &[1.0, 1.0], &[0.1, 0.1], 2, Tau::DAY, 1).is_err());
        assert!(simulate(ModelKind::Sir, &[1.0, -1.0, 0.0], &[0.1, 0.1], 2, Tau::DAY, 1).is_err());
        assert!(simulate(ModelKind::Sir, &[1.0, 1.0, 0.0], &[0.1, -0.1], 2, Tau::DAY, 1).is_err());
        assert!(Simulator::new(ModelKind::Sir, 0, Tau::DAY).is_err());
    }

    #[test]
    fn records_from_example_are_valid() {
        let traj = example_run(ModelKind::Sirf, Tau::DAY, 90);
        let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let records = traj.to_records(start, 1_000_000).unwrap();
        assert!(ep_common::RecordSet::new(records, 1_000_000).is_ok());
    }

    #[test]
    fn records_past_the_calendar_end_are_rejected() {
        let traj = example_run(ModelKind::Sir, Tau::DAY, 5);
        let start = NaiveDate::MAX - Duration::days(2);
        assert!(matches!(
            traj.to_records(start, 1_000_000),
            Err(Error::InvalidDateRange(_))
        ));
    }
}
