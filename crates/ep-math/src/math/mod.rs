//! Core math modules.

pub mod metrics;
pub mod ode;
pub mod regression;
