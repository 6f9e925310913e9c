//! Fit-quality metrics.

/// Root mean squared log error with a +1 offset so zeros are tolerated.
///
/// `sqrt(mean((ln(sim + 1) - ln(obs + 1))^2))`
///
/// Returns `None` for empty or mismatched input, or when any term is not
/// finite (e.g. a value below -1).
pub fn rmsle(observed: &[f64], simulated: &[f64]) -> Option<f64> {
    if observed.is_empty() || observed.len() != simulated.len() {
        return None;
    }
    let mut sum = 0.0;
    for (&obs, &sim) in observed.iter().zip(simulated) {
        let diff = sim.ln_1p() - obs.ln_1p();
        sum += diff * diff;
    }
    let value = (sum / observed.len() as f64).sqrt();
    value.is_finite().then_some(value)
}
