//! Property-based tests for ep-math numerical functions.

use ep_math::{fit_line, rmsle, PrefixStats, Rk4};
use proptest::prelude::*;

/// Helper to check approximate equality.
fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
    (a - b).abs() <= tol.max(tol * a.abs().max(b.abs()))
}

// ============================================================================
// rmsle properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// RMSLE is non-negative and zero against itself.
    #[test]
    fn rmsle_non_negative(values in prop::collection::vec(0.0..1e7f64, 1..50)) {
        prop_assert_eq!(rmsle(&values, &values), Some(0.0));
        let shifted: Vec<f64> = values.iter().map(|v| v * 1.5 + 3.0).collect();
        let score = rmsle(&values, &shifted).unwrap();
        prop_assert!(score > 0.0);
    }

    /// RMSLE is symmetric in its arguments.
    #[test]
    fn rmsle_symmetric(
        a in prop::collection::vec(0.0..1e6f64, 8),
        b in prop::collection::vec(0.0..1e6f64, 8),
    ) {
        let ab = rmsle(&a, &b).unwrap();
        let ba = rmsle(&b, &a).unwrap();
        prop_assert!(approx_eq(ab, ba, 1e-12));
    }
}

// ============================================================================
// least-squares properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    /// Exact lines are recovered.
    #[test]
    fn fit_recovers_exact_line(
        slope in -10.0..10.0f64,
        intercept in -100.0..100.0f64,
        n in 3usize..60,
    ) {
        let xs: Vec<f64> = (0..n).map(|i| i as f64 * 0.25).collect();
        let ys: Vec<f64> = xs.iter().map(|x| slope * x + intercept).collect();
        let fit = fit_line(&xs, &ys).unwrap();
        prop_assert!(approx_eq(fit.slope, slope, 1e-7), "slope {} vs {}", fit.slope, slope);
        prop_assert!(fit.rss < 1e-6);
    }

    /// Splitting a segment never increases the total residual.
    #[test]
    fn split_never_increases_rss(
        ys in prop::collection::vec(-5.0..5.0f64, 6..40),
        split_frac in 0.2..0.8f64,
    ) {
        let xs: Vec<f64> = (0..ys.len()).map(|i| i as f64).collect();
        let stats = PrefixStats::new(&xs, &ys).unwrap();
        let n = ys.len();
        let split = ((n as f64 * split_frac) as usize).clamp(1, n - 1);
        let whole = stats.segment_rss(0, n);
        let parts = stats.segment_rss(0, split) + stats.segment_rss(split, n);
        prop_assert!(parts <= whole + 1e-8, "{} > {}", parts, whole);
    }
}

// ============================================================================
// RK4 properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Linear decay stays positive for step sizes inside the stability region.
    #[test]
    fn rk4_decay_stays_positive(rate in 0.0..2.0f64, y0 in 1.0..1e6f64) {
        let rhs = move |y: &[f64], out: &mut [f64]| out[0] = -rate * y[0];
        let mut stepper = Rk4::new(1);
        let mut y = [y0];
        for _ in 0..100 {
            stepper.step(&rhs, &mut y, 1.0);
            prop_assert!(y[0] >= 0.0 && y[0] <= y0);
        }
    }
}
