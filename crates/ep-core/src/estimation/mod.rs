//! Per-phase parameter estimation.
//!
//! A phase is fitted by simulating from the state of its first record and
//! scoring RMSLE over the model's observed variables on days `1..n`. The
//! search itself is differential evolution (see [`optimizer`]) whose trial
//! batches run on a rayon pool owned by the [`Estimator`].

pub mod optimizer;

pub use optimizer::{DeOutcome, DeSettings, DifferentialEvolution, StopReason};

use crate::logging::event_names;
use crate::model::{ModelKind, ParamMap, Tau};
use crate::simulation::Simulator;
use chrono::NaiveDate;
use ep_common::{Error, Record, Result};
use ep_config::EstimationConfig;
use rayon::prelude::*;
use rayon::ThreadPool;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Quality and cost of one fit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitMetrics {
    pub rmsle: f64,
    pub trials: usize,
    pub runtime_secs: f64,
}

/// Fitted parameters of one phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Estimate {
    pub model: ModelKind,
    pub tau: Tau,
    pub params: ParamMap,
    pub metrics: FitMetrics,
    pub stop: StopReason,
}

/// Observed against simulated value of one variable on one day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccuracyRow {
    pub date: NaiveDate,
    pub variable: String,
    pub observed: f64,
    pub simulated: f64,
}

/// Read-only comparison of stored parameters with the records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccuracyReport {
    pub model: ModelKind,
    pub tau: Tau,
    pub rmsle: f64,
    pub rows: Vec<AccuracyRow>,
}

/// Outcome of the tau search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TauSelection {
    pub tau: Tau,
    /// Mean RMSLE per candidate; `None` when no phase could be fitted.
    pub scores: Vec<(Tau, Option<f64>)>,
}

/// Fitting problem for one phase: start state and observed targets.
struct FitTarget {
    model: ModelKind,
    population: u64,
    tau: Tau,
    initial: Vec<f64>,
    n_days: usize,
    /// Observed values, day-major: `observed[(day - 1) * k + v]`.
    observed: Vec<f64>,
}

impl FitTarget {
    fn new(model: ModelKind, records: &[Record], population: u64, tau: Tau) -> Result<Self> {
        let first = records.first().ok_or_else(|| Error::InsufficientRecords {
            context: "estimation".to_string(),
            needed: 2,
            available: 0,
        })?;
        let observed_idx = model.observed();
        let observed = records[1..]
            .iter()
            .flat_map(|record| {
                let state = model.specialize(record);
                observed_idx.iter().map(move |&v| state[v])
            })
            .collect();
        Ok(FitTarget {
            model,
            population,
            tau,
            initial: model.specialize(first),
            n_days: records.len() - 1,
            observed,
        })
    }

    fn simulate_observed(&self, simulator: &mut Simulator, params: &[f64]) -> Result<Vec<f64>> {
        let trajectory = simulator.run(&self.initial, params, self.n_days)?;
        let observed_idx = self.model.observed();
        Ok(trajectory.snapshots[1..]
            .iter()
            .flat_map(|state| observed_idx.iter().map(move |&v| state[v]))
            .collect())
    }

    /// RMSLE of `params`, infinite when the run diverges.
    fn score(&self, params: &[f64]) -> f64 {
        let Ok(mut simulator) = Simulator::new(self.model, self.population, self.tau) else {
            return f64::INFINITY;
        };
        match self.simulate_observed(&mut simulator, params) {
            Ok(simulated) => ep_math::rmsle(&self.observed, &simulated).unwrap_or(f64::INFINITY),
            Err(_) => f64::INFINITY,
        }
    }
}

/// Fits phases on a shared worker pool.
#[derive(Clone)]
pub struct Estimator {
    config: EstimationConfig,
    pool: Arc<ThreadPool>,
}

impl std::fmt::Debug for Estimator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Estimator")
            .field("config", &self.config)
            .field("threads", &self.pool.current_num_threads())
            .finish()
    }
}

impl Estimator {
    /// Build an estimator with a pool of `config.workers` threads
    /// (0 = rayon default).
    pub fn new(config: EstimationConfig) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.workers)
            .thread_name(|i| format!("ep-estimate-{i}"))
            .build()
            .map_err(|e| Error::Config(format!("cannot start estimation workers: {e}")))?;
        Ok(Estimator {
            config,
            pool: Arc::new(pool),
        })
    }

    pub fn config(&self) -> &EstimationConfig {
        &self.config
    }

    /// Same pool, different trial budget.
    pub fn with_trial_budget(&self, trial_budget: usize) -> Self {
        let mut config = self.config.clone();
        config.trial_budget = trial_budget;
        Estimator {
            config,
            pool: Arc::clone(&self.pool),
        }
    }

    fn settings(&self, dimension: usize) -> DeSettings {
        let population = match self.config.population {
            0 => (10 * dimension).max(20),
            n => n,
        };
        DeSettings {
            population,
            mutation: self.config.mutation,
            crossover: self.config.crossover,
            trial_budget: self.config.trial_budget,
            // Timeouts past what a Duration can hold mean no time limit.
            timeout: Duration::try_from_secs_f64(self.config.timeout_secs.max(0.0))
                .unwrap_or(Duration::MAX),
            patience: self.config.patience,
            tolerance: self.config.tolerance,
            seed: self.config.seed,
        }
    }

    /// Fit `model` to the records of one phase.
    pub fn estimate(
        &self,
        model: ModelKind,
        records: &[Record],
        population: u64,
        tau: Tau,
    ) -> Result<Estimate> {
        if records.len() < self.config.min_records {
            return Err(Error::InsufficientRecords {
                context: "estimation".to_string(),
                needed: self.config.min_records,
                available: records.len(),
            });
        }
        let target = FitTarget::new(model, records, population, tau)?;
        if target.observed.iter().all(|v| *v == 0.0) {
            return Err(Error::EstimationFailed(format!(
                "observed {} values are all zero",
                model
            )));
        }

        let bounds = model.bounds();
        let de = DifferentialEvolution::new(self.settings(bounds.len()));
        let outcome = de.minimize(&self.pool, &bounds, |params| target.score(params));

        if !outcome.score.is_finite() {
            return Err(Error::EstimationFailed(format!(
                "no trial of {model} produced a finite score in {} trials",
                outcome.trials
            )));
        }

        debug!(
            model = %model,
            tau = tau.minutes(),
            rmsle = outcome.score,
            trials = outcome.trials,
            generations = outcome.generations,
            stop = ?outcome.stop,
            "optimizer finished"
        );

        Ok(Estimate {
            model,
            tau,
            params: model.params_to_map(&outcome.best),
            metrics: FitMetrics {
                rmsle: outcome.score,
                trials: outcome.trials,
                runtime_secs: outcome.elapsed.as_secs_f64(),
            },
            stop: outcome.stop,
        })
    }

    /// Fit several phases concurrently; results keep the order of `phases`.
    pub fn estimate_many(
        &self,
        model: ModelKind,
        phases: &[&[Record]],
        population: u64,
        tau: Tau,
    ) -> Vec<Result<Estimate>> {
        self.pool.install(|| {
            phases
                .par_iter()
                .map(|records| self.estimate(model, records, population, tau))
                .collect()
        })
    }

    /// Choose the tau whose fits give the smallest mean RMSLE.
    ///
    /// Each candidate is fitted on every phase with this estimator's trial
    /// budget; phases that fail to fit are left out of the mean. Ties go to
    /// the larger tau.
    pub fn select_tau(
        &self,
        model: ModelKind,
        phases: &[&[Record]],
        population: u64,
        candidates: &[Tau],
    ) -> Result<TauSelection> {
        let mut ordered = candidates.to_vec();
        ordered.sort();
        ordered.dedup();

        let mut scores = Vec::with_capacity(ordered.len());
        let mut best: Option<(Tau, f64)> = None;
        for tau in ordered {
            let fitted: Vec<f64> = phases
                .iter()
                .filter_map(|records| self.estimate(model, records, population, tau).ok())
                .map(|estimate| estimate.metrics.rmsle)
                .collect();
            let mean =
                (!fitted.is_empty()).then(|| fitted.iter().sum::<f64>() / fitted.len() as f64);
            debug!(
                tau = tau.minutes(),
                mean_rmsle = ?mean,
                fitted = fitted.len(),
                "tau candidate scored"
            );
            if let Some(mean) = mean {
                if best.is_none_or(|(_, score)| mean <= score) {
                    best = Some((tau, mean));
                }
            }
            scores.push((tau, mean));
        }

        let (tau, score) = best.ok_or_else(|| {
            Error::EstimationFailed("no tau candidate produced a fit".to_string())
        })?;
        info!(
            target: event_names::TAU_SELECTED,
            tau = tau.minutes(),
            mean_rmsle = score,
            "tau selected"
        );
        Ok(TauSelection { tau, scores })
    }
}

/// Score stored parameters against the records of one phase.
pub fn estimate_accuracy(
    model: ModelKind,
    params: &ParamMap,
    records: &[Record],
    population: u64,
    tau: Tau,
) -> Result<AccuracyReport> {
    if records.len() < 2 {
        return Err(Error::InsufficientRecords {
            context: "accuracy".to_string(),
            needed: 2,
            available: records.len(),
        });
    }
    let values = model.params_from_map(params)?;
    let target = FitTarget::new(model, records, population, tau)?;
    let mut simulator = Simulator::new(model, population, tau)?;
    let simulated = target.simulate_observed(&mut simulator, &values)?;
    let rmsle = ep_math::rmsle(&target.observed, &simulated).ok_or_else(|| {
        Error::EstimationFailed("accuracy score is not finite".to_string())
    })?;

    let names: Vec<&str> = model.observed().iter().map(|&v| model.variables()[v]).collect();
    let k = names.len();
    let rows = records[1..]
        .iter()
        .enumerate()
        .flat_map(|(day, record)| {
            let (observed, simulated) = (&target.observed, &simulated);
            names.iter().enumerate().map(move |(v, name)| AccuracyRow {
                date: record.date,
                variable: name.to_string(),
                observed: observed[day * k + v],
                simulated: simulated[day * k + v],
            })
        })
        .collect();

    Ok(AccuracyReport {
        model,
        tau,
        rmsle,
        rows,
    })
}
