//! S-R trend analysis and phase segmentation.
//!
//! In the S-R plane each day maps to `x = recovered + fatal` and
//! `y = ln(susceptible)`. While parameters stay constant the points lie close
//! to a straight line, so change points in the line's slope mark phase
//! boundaries.
//!
//! Segmentation is exact optimal partitioning: a penalized dynamic program
//! over segment end points whose per-segment cost is the residual sum of
//! squares of a least-squares line. PELT pruning drops candidate start points
//! that can no longer be optimal. Because segments must be at least
//! `min_phase_days` long, a candidate is only discarded once every later end
//! point could use the pruning witness as its own start.

use crate::logging::event_names;
use chrono::NaiveDate;
use ep_common::{RecordSet, Result};
use ep_config::TrendConfig;
use ep_math::PrefixStats;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Relative tolerance under which two objective values count as tied.
const TIE_TOLERANCE: f64 = 1e-12;

/// Floor on the per-point residual scale used for the penalty.
const MIN_NOISE: f64 = 1e-12;

/// One day in the S-R plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SrPoint {
    pub date: NaiveDate,
    /// Recovered + fatal.
    pub removed: u64,
    /// Natural log of susceptible (zero susceptible maps to 0).
    pub log_susceptible: f64,
}

/// Output of one segmentation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendResult {
    /// Inclusive date ranges, ordered and covering every record.
    pub ranges: Vec<(NaiveDate, NaiveDate)>,
    /// First date of every phase but the first.
    pub change_dates: Vec<NaiveDate>,
    /// Penalty used per additional segment.
    pub penalty: f64,
    /// Minimized objective (total RSS plus penalties).
    pub objective: f64,
    pub points: Vec<SrPoint>,
}

impl TrendResult {
    pub fn phase_count(&self) -> usize {
        self.ranges.len()
    }
}

/// S-R transform of a record set.
pub fn sr_transform(records: &RecordSet) -> Vec<SrPoint> {
    records
        .iter()
        .map(|r| SrPoint {
            date: r.date,
            removed: r.recovered + r.fatal,
            log_susceptible: (r.susceptible as f64).max(1.0).ln(),
        })
        .collect()
}

/// Change-point detector on the S-R trend.
#[derive(Debug, Clone)]
pub struct TrendSegmenter {
    config: TrendConfig,
}

impl TrendSegmenter {
    pub fn new(config: TrendConfig) -> Self {
        TrendSegmenter { config }
    }

    pub fn config(&self) -> &TrendConfig {
        &self.config
    }

    /// Propose an ordered phase partition covering every record.
    pub fn segment(&self, records: &RecordSet) -> Result<TrendResult> {
        let points = sr_transform(records);
        let xs = rescale(&points.iter().map(|p| p.removed as f64).collect::<Vec<_>>());
        let ys = rescale(&points.iter().map(|p| p.log_susceptible).collect::<Vec<_>>());

        let partition = self.partition(&xs, &ys);
        let ranges: Vec<(NaiveDate, NaiveDate)> = partition
            .bounds
            .windows(2)
            .map(|w| (points[w[0]].date, points[w[1] - 1].date))
            .collect();
        let change_dates = ranges.iter().skip(1).map(|(start, _)| *start).collect();

        debug!(
            target: event_names::TREND_SEGMENTED,
            records = points.len(),
            phases = ranges.len(),
            penalty = partition.penalty,
            objective = partition.objective,
            "S-R trend segmented"
        );

        Ok(TrendResult {
            ranges,
            change_dates,
            penalty: partition.penalty,
            objective: partition.objective,
            points,
        })
    }

    /// Optimal partition of already-rescaled points.
    ///
    /// Returns segment boundaries `[0, b1, ..., n]` as half-open index ranges.
    pub fn partition(&self, xs: &[f64], ys: &[f64]) -> Partition {
        let n = xs.len();
        let min_len = self.config.min_phase_days.max(1);
        let single = Partition {
            bounds: vec![0, n],
            penalty: 0.0,
            objective: 0.0,
        };

        let Some(stats) = PrefixStats::new(xs, ys) else {
            return single;
        };
        let single_rss = stats.segment_rss(0, n);
        if n < 2 * min_len {
            return Partition {
                objective: single_rss,
                ..single
            };
        }

        let beta = self.config.penalty * (single_rss / n as f64).max(MIN_NOISE) * (n as f64).ln();
        let (bounds, objective) = optimal_partition(&stats, n, min_len, beta);
        Partition {
            bounds,
            penalty: beta,
            objective,
        }
    }
}

/// Segment boundaries with the penalty and objective that produced them.
#[derive(Debug, Clone, PartialEq)]
pub struct Partition {
    pub bounds: Vec<usize>,
    pub penalty: f64,
    pub objective: f64,
}

/// A start-point candidate and the first end point at which it may be dropped.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    start: usize,
    drop_at: usize,
}

fn optimal_partition(
    stats: &PrefixStats,
    n: usize,
    min_len: usize,
    beta: f64,
) -> (Vec<usize>, f64) {
    let mut f = vec![f64::INFINITY; n + 1];
    let mut last_cp = vec![usize::MAX; n + 1];
    let mut changes = vec![0usize; n + 1];
    f[0] = -beta;
    last_cp[0] = 0;

    let mut candidates = vec![Candidate {
        start: 0,
        drop_at: usize::MAX,
    }];

    for t in min_len..=n {
        let mut best_cost = f64::INFINITY;
        let mut best_start = usize::MAX;
        let mut best_changes = usize::MAX;
        let mut scored = Vec::with_capacity(candidates.len());

        for (idx, cand) in candidates.iter().enumerate() {
            let s = cand.start;
            if t - s < min_len || !f[s].is_finite() {
                continue;
            }
            let score_no_penalty = f[s] + stats.segment_rss(s, t);
            let candidate = score_no_penalty + beta;
            let proposed_changes = if s == 0 { 0 } else { changes[s] + 1 };
            scored.push((idx, score_no_penalty));

            if better(candidate, proposed_changes, best_cost, best_changes) {
                best_cost = candidate;
                best_start = s;
                best_changes = proposed_changes;
            }
        }

        if best_start == usize::MAX {
            continue;
        }
        f[t] = best_cost;
        last_cp[t] = best_start;
        changes[t] = best_changes;

        for (idx, score_no_penalty) in scored {
            let cand = &mut candidates[idx];
            if score_no_penalty > best_cost + tie_slack(score_no_penalty, best_cost)
                && cand.drop_at == usize::MAX
            {
                cand.drop_at = t + min_len;
            }
        }
        candidates.retain(|c| c.drop_at > t);

        if t + min_len <= n {
            candidates.push(Candidate {
                start: t,
                drop_at: usize::MAX,
            });
        }
    }

    let mut bounds = vec![n];
    let mut cursor = n;
    while cursor > 0 {
        let prev = last_cp[cursor];
        if prev == usize::MAX || prev >= cursor {
            // Unreachable for n >= min_len; fall back to one segment.
            return (vec![0, n], stats.segment_rss(0, n));
        }
        bounds.push(prev);
        cursor = prev;
    }
    bounds.reverse();
    bounds.dedup();
    (bounds, f[n])
}

fn tie_slack(a: f64, b: f64) -> f64 {
    TIE_TOLERANCE * a.abs().max(b.abs())
}

/// Lower objective wins; within the tie tolerance fewer change points win.
fn better(cost: f64, changes: usize, best_cost: f64, best_changes: usize) -> bool {
    if !best_cost.is_finite() {
        return cost.is_finite();
    }
    if (cost - best_cost).abs() <= tie_slack(cost, best_cost) {
        return changes < best_changes;
    }
    cost < best_cost
}

/// Min-max scale into [0, 1]; a constant series maps to zeros.
fn rescale(values: &[f64]) -> Vec<f64> {
    let (min, max) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let span = max - min;
    if !span.is_finite() || span <= 0.0 {
        return vec![0.0; values.len()];
    }
    values.iter().map(|v| (v - min) / span).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use ep_common::Record;

    fn segmenter(min_phase_days: usize) -> TrendSegmenter {
        TrendSegmenter::new(TrendConfig {
            min_phase_days,
            penalty: 1.0,
        })
    }

    /// Records whose S-R trend bends at each day listed in `kinks`.
    fn kinked_records(days: usize, kinks: &[usize], slopes: &[f64]) -> RecordSet {
        let population = 1_000_000u64;
        let start = NaiveDate::from_ymd_opt(2020, 4, 1).unwrap();
        let mut log_s = (999_000f64).ln();
        let mut records = Vec::new();
        for day in 0..days {
            if day > 0 {
                let regime = kinks.iter().filter(|&&k| day > k).count();
                log_s -= slopes[regime] * 100.0;
            }
            let removed = 100 * day as u64;
            let susceptible = log_s.exp().round() as u64;
            let confirmed = population - susceptible;
            let date = start + Duration::days(day as i64);
            records.push(Record::from_cumulative(date, confirmed, removed, 0, population).unwrap());
        }
        RecordSet::new(records, population).unwrap()
    }

    #[test]
    fn single_line_gives_one_segment() {
        let xs: Vec<f64> = (0..60).map(|i| i as f64 / 59.0).collect();
        let ys: Vec<f64> = xs.iter().map(|x| 1.0 - x).collect();
        let partition = segmenter(7).partition(&xs, &ys);
        assert_eq!(partition.bounds, vec![0, 60]);
    }

    #[test]
    fn slope_change_is_found() {
        let records = kinked_records(40, &[20], &[1e-6, 1e-5]);
        let result = segmenter(7).segment(&records).unwrap();
        assert_eq!(result.phase_count(), 2, "{:?}", result.ranges);
        let boundary = (result.change_dates[0] - records.first_date()).num_days();
        assert!((18..=22).contains(&boundary), "boundary at day {boundary}");
    }

    #[test]
    fn ranges_are_contiguous_and_cover_records() {
        let records = kinked_records(90, &[25, 55], &[1e-6, 8e-6, 2e-6]);
        let result = segmenter(7).segment(&records).unwrap();
        assert_eq!(result.ranges.first().unwrap().0, records.first_date());
        assert_eq!(result.ranges.last().unwrap().1, records.last_date());
        for pair in result.ranges.windows(2) {
            assert_eq!(pair[0].1 + Duration::days(1), pair[1].0);
        }
        for (start, end) in &result.ranges {
            assert!((*end - *start).num_days() + 1 >= 7);
        }
    }

    #[test]
    fn short_series_is_one_phase() {
        let records = kinked_records(13, &[6], &[1e-6, 1e-4]);
        let result = segmenter(7).segment(&records).unwrap();
        assert_eq!(result.phase_count(), 1);
    }

    #[test]
    fn constant_trend_prefers_fewer_segments() {
        let xs: Vec<f64> = (0..30).map(|i| i as f64 / 29.0).collect();
        let ys = vec![0.0; 30];
        let partition = segmenter(5).partition(&xs, &ys);
        assert_eq!(partition.bounds, vec![0, 30]);
    }

    #[test]
    fn pruned_search_matches_exhaustive_search() {
        let xs: Vec<f64> = (0..48).map(|i| i as f64 / 47.0).collect();
        let ys: Vec<f64> = xs
            .iter()
            .enumerate()
            .map(|(i, x)| match i {
                0..=16 => 0.2 * x,
                17..=32 => 0.3 * x - 0.017,
                _ => 1.5 * x - 0.8,
            })
            .collect();
        let stats = PrefixStats::new(&xs, &ys).unwrap();
        let beta = 1e-4;
        let (bounds, objective) = optimal_partition(&stats, 48, 6, beta);

        // Exhaustive DP without pruning.
        let n = 48;
        let mut f = vec![f64::INFINITY; n + 1];
        f[0] = -beta;
        for t in 6..=n {
            for s in 0..=t - 6 {
                if s != 0 && s < 6 {
                    continue;
                }
                if f[s].is_finite() {
                    f[t] = f[t].min(f[s] + stats.segment_rss(s, t) + beta);
                }
            }
        }
        assert!((objective - f[n]).abs() < 1e-12, "{objective} vs {}", f[n]);
        assert!(bounds.windows(2).all(|w| w[1] - w[0] >= 6));
    }

    #[test]
    fn rescale_handles_constant_input() {
        assert_eq!(rescale(&[3.0, 3.0]), vec![0.0, 0.0]);
        assert_eq!(rescale(&[1.0, 2.0, 3.0]), vec![0.0, 0.5, 1.0]);
    }
}
