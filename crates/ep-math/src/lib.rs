//! epiphase math utilities.

pub mod math;

pub use math::metrics::rmsle;
pub use math::ode::Rk4;
pub use math::regression::{fit_line, LinearFit, PrefixStats};
