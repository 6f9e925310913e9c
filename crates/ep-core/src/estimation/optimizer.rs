//! Differential evolution (rand/1/bin) with parallel trial evaluation.
//!
//! Trial vectors are drawn from one seeded RNG on the calling thread and
//! selection runs sequentially in population order, so the outcome depends
//! only on the seed, never on how many threads evaluated the batch.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use rayon::ThreadPool;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Why the search stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The trial budget was spent.
    Budget,
    /// The wall-clock limit was reached.
    Timeout,
    /// No significant improvement for `patience` generations.
    Converged,
}

/// Search settings.
#[derive(Debug, Clone)]
pub struct DeSettings {
    pub population: usize,
    /// Differential weight `F`.
    pub mutation: f64,
    /// Crossover probability `CR`.
    pub crossover: f64,
    pub trial_budget: usize,
    pub timeout: Duration,
    pub patience: usize,
    pub tolerance: f64,
    pub seed: u64,
}

/// Best vector found and the cost of finding it.
#[derive(Debug, Clone)]
pub struct DeOutcome {
    pub best: Vec<f64>,
    /// Objective value of `best`; infinite when no trial scored.
    pub score: f64,
    pub trials: usize,
    pub generations: usize,
    pub elapsed: Duration,
    pub stop: StopReason,
}

#[derive(Debug, Clone)]
pub struct DifferentialEvolution {
    settings: DeSettings,
}

impl DifferentialEvolution {
    pub fn new(settings: DeSettings) -> Self {
        DifferentialEvolution { settings }
    }

    pub fn settings(&self) -> &DeSettings {
        &self.settings
    }

    /// Minimize `objective` inside the box `bounds`.
    ///
    /// Non-finite objective values count as `+inf`. Ties during selection
    /// keep the incumbent's position replaced (`<=`) but the global best only
    /// moves on a strict improvement, so the earliest-found optimum wins.
    pub fn minimize<F>(&self, pool: &ThreadPool, bounds: &[(f64, f64)], objective: F) -> DeOutcome
    where
        F: Fn(&[f64]) -> f64 + Sync,
    {
        let started = Instant::now();
        let s = &self.settings;
        let np = s.population.max(4);
        let dim = bounds.len();
        let mut rng = StdRng::seed_from_u64(s.seed);

        let mut members: Vec<Vec<f64>> = (0..np)
            .map(|_| {
                bounds
                    .iter()
                    .map(|&(lo, hi)| if hi > lo { rng.random_range(lo..=hi) } else { lo })
                    .collect()
            })
            .collect();
        let mut fitness = evaluate(pool, &members, &objective);
        let mut trials = np;

        let (mut best_idx, mut best_score) = (0, fitness[0]);
        for (i, &f) in fitness.iter().enumerate().skip(1) {
            if f < best_score {
                best_idx = i;
                best_score = f;
            }
        }
        let mut best = members[best_idx].clone();

        let mut generations = 0;
        let mut stale = 0;
        let stop = loop {
            if trials >= s.trial_budget {
                break StopReason::Budget;
            }
            if started.elapsed() >= s.timeout {
                break StopReason::Timeout;
            }
            if stale >= s.patience {
                break StopReason::Converged;
            }

            let batch = np.min(s.trial_budget - trials);
            let candidates: Vec<Vec<f64>> = (0..batch)
                .map(|i| self.mutant(&mut rng, &members, i, bounds))
                .collect();
            let scores = evaluate(pool, &candidates, &objective);
            trials += batch;
            generations += 1;

            let before = best_score;
            for (i, (candidate, score)) in candidates.into_iter().zip(scores).enumerate() {
                if score < best_score {
                    best_score = score;
                    best.clone_from(&candidate);
                }
                if score <= fitness[i] {
                    fitness[i] = score;
                    members[i] = candidate;
                }
            }

            if before - best_score > s.tolerance {
                stale = 0;
            } else {
                stale += 1;
            }
        };

        debug_assert_eq!(best.len(), dim);
        DeOutcome {
            best,
            score: best_score,
            trials,
            generations,
            elapsed: started.elapsed(),
            stop,
        }
    }

    /// Build the trial vector for member `target`.
    fn mutant(
        &self,
        rng: &mut StdRng,
        members: &[Vec<f64>],
        target: usize,
        bounds: &[(f64, f64)],
    ) -> Vec<f64> {
        let np = members.len();
        let mut pick = |taken: &[usize]| loop {
            let idx = rng.random_range(0..np);
            if !taken.contains(&idx) {
                break idx;
            }
        };
        let r1 = pick(&[target]);
        let r2 = pick(&[target, r1]);
        let r3 = pick(&[target, r1, r2]);

        let base = &members[target];
        let forced = rng.random_range(0..bounds.len());
        bounds
            .iter()
            .enumerate()
            .map(|(j, &(lo, hi))| {
                if j != forced && rng.random::<f64>() >= self.settings.crossover {
                    return base[j];
                }
                let v = members[r1][j] + self.settings.mutation * (members[r2][j] - members[r3][j]);
                // Bounce back between the violated bound and the parent value.
                if v < lo {
                    lo + rng.random::<f64>() * (base[j] - lo)
                } else if v > hi {
                    hi - rng.random::<f64>() * (hi - base[j])
                } else {
                    v
                }
            })
            .collect()
    }
}

fn evaluate<F>(pool: &ThreadPool, vectors: &[Vec<f64>], objective: &F) -> Vec<f64>
where
    F: Fn(&[f64]) -> f64 + Sync,
{
    pool.install(|| {
        vectors
            .par_iter()
            .map(|v| {
                let score = objective(v);
                if score.is_finite() {
                    score
                } else {
                    f64::INFINITY
                }
            })
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(seed: u64) -> DeSettings {
        DeSettings {
            population: 20,
            mutation: 0.7,
            crossover: 0.9,
            trial_budget: 20_000,
            timeout: Duration::from_secs(30),
            patience: 60,
            tolerance: 1e-12,
            seed,
        }
    }

    fn pool(threads: usize) -> ThreadPool {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .unwrap()
    }

    fn sphere(x: &[f64]) -> f64 {
        x.iter().map(|v| (v - 0.3) * (v - 0.3)).sum()
    }

    #[test]
    fn finds_minimum_of_sphere() {
        let de = DifferentialEvolution::new(settings(7));
        let out = de.minimize(&pool(2), &[(0.0, 1.0); 3], sphere);
        assert!(out.score < 1e-8, "score {}", out.score);
        for v in &out.best {
            assert!((v - 0.3).abs() < 1e-3);
        }
        assert!(out.trials <= 20_000);
    }

    #[test]
    fn result_does_not_depend_on_thread_count() {
        let de = DifferentialEvolution::new(settings(11));
        let a = de.minimize(&pool(1), &[(0.0, 1.0); 2], sphere);
        let b = de.minimize(&pool(4), &[(0.0, 1.0); 2], sphere);
        assert_eq!(a.best, b.best);
        assert_eq!(a.trials, b.trials);
    }

    #[test]
    fn respects_trial_budget() {
        let mut s = settings(3);
        s.trial_budget = 50;
        s.patience = 1_000;
        let out = DifferentialEvolution::new(s).minimize(&pool(1), &[(0.0, 1.0); 2], sphere);
        assert_eq!(out.trials, 50);
        assert_eq!(out.stop, StopReason::Budget);
    }

    #[test]
    fn stays_inside_bounds() {
        let de = DifferentialEvolution::new(settings(5));
        // Unbounded optimum lies outside the box; the search must pin to the edge.
        let out = de.minimize(&pool(1), &[(0.0, 0.1), (0.5, 1.0)], |x| {
            (x[0] - 2.0).powi(2) + (x[1] + 1.0).powi(2)
        });
        assert!(out.best[0] <= 0.1 && out.best[0] > 0.09);
        assert!(out.best[1] >= 0.5 && out.best[1] < 0.51);
    }

    #[test]
    fn non_finite_scores_are_infinite() {
        let de = DifferentialEvolution::new(settings(1));
        let mut s = de.settings().clone();
        s.trial_budget = 100;
        let out = DifferentialEvolution::new(s).minimize(&pool(1), &[(0.0, 1.0)], |_| f64::NAN);
        assert!(out.score.is_infinite());
    }
}
