//! Least-squares line fits.
//!
//! [`PrefixStats`] stores cumulative sums so that the residual sum of squares
//! of the best line through any contiguous segment costs O(1). This is the
//! segment cost used by change-point search over piecewise-linear trends.

use serde::{Deserialize, Serialize};

/// Variance below which a segment's x-values are treated as constant.
const DEGENERATE_SXX: f64 = 1e-15;

/// Result of an ordinary least-squares fit `y = slope * x + intercept`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    /// Residual sum of squares.
    pub rss: f64,
    pub n: usize,
}

impl LinearFit {
    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Fit a line through paired samples.
///
/// Returns `None` for empty or mismatched input. When all x-values coincide
/// the fit degenerates to the mean of y with zero slope.
pub fn fit_line(xs: &[f64], ys: &[f64]) -> Option<LinearFit> {
    if xs.is_empty() || xs.len() != ys.len() {
        return None;
    }
    let stats = PrefixStats::new(xs, ys)?;
    stats.fit(0, xs.len())
}

/// Cumulative sums supporting O(1) segment fits.
#[derive(Debug, Clone, PartialEq)]
pub struct PrefixStats {
    sx: Vec<f64>,
    sy: Vec<f64>,
    sxx: Vec<f64>,
    syy: Vec<f64>,
    sxy: Vec<f64>,
}

impl PrefixStats {
    /// Build prefix sums; `None` if lengths differ.
    pub fn new(xs: &[f64], ys: &[f64]) -> Option<Self> {
        if xs.len() != ys.len() {
            return None;
        }
        let n = xs.len();
        let mut stats = PrefixStats {
            sx: Vec::with_capacity(n + 1),
            sy: Vec::with_capacity(n + 1),
            sxx: Vec::with_capacity(n + 1),
            syy: Vec::with_capacity(n + 1),
            sxy: Vec::with_capacity(n + 1),
        };
        let (mut sx, mut sy, mut sxx, mut syy, mut sxy) = (0.0, 0.0, 0.0, 0.0, 0.0);
        stats.push(sx, sy, sxx, syy, sxy);
        for (&x, &y) in xs.iter().zip(ys) {
            sx += x;
            sy += y;
            sxx += x * x;
            syy += y * y;
            sxy += x * y;
            stats.push(sx, sy, sxx, syy, sxy);
        }
        Some(stats)
    }

    fn push(&mut self, sx: f64, sy: f64, sxx: f64, syy: f64, sxy: f64) {
        self.sx.push(sx);
        self.sy.push(sy);
        self.sxx.push(sxx);
        self.syy.push(syy);
        self.sxy.push(sxy);
    }

    /// Number of samples covered.
    pub fn len(&self) -> usize {
        self.sx.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Least-squares fit over the half-open segment `[start, end)`.
    pub fn fit(&self, start: usize, end: usize) -> Option<LinearFit> {
        if start >= end || end > self.len() {
            return None;
        }
        let n = (end - start) as f64;
        let sx = self.sx[end] - self.sx[start];
        let sy = self.sy[end] - self.sy[start];
        let sxx = self.sxx[end] - self.sxx[start];
        let syy = self.syy[end] - self.syy[start];
        let sxy = self.sxy[end] - self.sxy[start];

        let cxx = sxx - sx * sx / n;
        let cyy = (syy - sy * sy / n).max(0.0);
        let cxy = sxy - sx * sy / n;

        let (slope, rss) = if cxx <= DEGENERATE_SXX * n {
            (0.0, cyy)
        } else {
            (cxy / cxx, (cyy - cxy * cxy / cxx).max(0.0))
        };
        Some(LinearFit {
            slope,
            intercept: (sy - slope * sx) / n,
            rss,
            n: end - start,
        })
    }

    /// Residual sum of squares over `[start, end)`; infinite for empty segments.
    pub fn segment_rss(&self, start: usize, end: usize) -> f64 {
        self.fit(start, end).map_or(f64::INFINITY, |fit| fit.rss)
    }
}
