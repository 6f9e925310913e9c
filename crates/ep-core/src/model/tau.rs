//! Tau: the length of one simulation step, in minutes.
//!
//! Rate parameters are expressed per tau step, so converting them to days
//! needs the tau they were estimated with. Tau must divide a day evenly.

use ep_common::{Error, Result};
use serde::{Deserialize, Serialize};

/// Minutes in one day.
pub const MINUTES_PER_DAY: u32 = 1440;

/// Minutes per simulation step; always a positive divisor of 1440.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Tau(u32);

impl Tau {
    /// One step per day.
    pub const DAY: Tau = Tau(MINUTES_PER_DAY);

    pub fn new(minutes: u32) -> Result<Self> {
        if minutes == 0 || MINUTES_PER_DAY % minutes != 0 {
            return Err(Error::InvalidTau(minutes));
        }
        Ok(Tau(minutes))
    }

    pub fn minutes(self) -> u32 {
        self.0
    }

    /// Number of integration steps that make up one day.
    pub fn steps_per_day(self) -> usize {
        (MINUTES_PER_DAY / self.0) as usize
    }

    /// Length of one step as a fraction of a day.
    pub fn days_per_step(self) -> f64 {
        f64::from(self.0) / f64::from(MINUTES_PER_DAY)
    }

    /// Every valid tau, ascending.
    pub fn all() -> impl Iterator<Item = Tau> {
        (1..=MINUTES_PER_DAY)
            .filter(|m| MINUTES_PER_DAY % m == 0)
            .map(Tau)
    }
}

impl Default for Tau {
    fn default() -> Self {
        Tau::DAY
    }
}

impl TryFrom<u32> for Tau {
    type Error = Error;

    fn try_from(minutes: u32) -> Result<Self> {
        Tau::new(minutes)
    }
}

impl From<Tau> for u32 {
    fn from(tau: Tau) -> Self {
        tau.0
    }
}

impl std::fmt::Display for Tau {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn divisors_are_accepted() {
        for minutes in [1, 60, 360, 480, 720, 1440] {
            assert_eq!(Tau::new(minutes).unwrap().minutes(), minutes);
        }
    }

    #[test]
    fn non_divisors_are_rejected() {
        for minutes in [0, 7, 700, 1441, 2880] {
            assert!(matches!(Tau::new(minutes), Err(Error::InvalidTau(m)) if m == minutes));
        }
    }

    #[test]
    fn steps_per_day() {
        assert_eq!(Tau::DAY.steps_per_day(), 1);
        assert_eq!(Tau::new(360).unwrap().steps_per_day(), 4);
        assert!((Tau::new(720).unwrap().days_per_step() - 0.5).abs() < 1e-15);
    }

    #[test]
    fn serde_validates() {
        assert_eq!(serde_json::to_string(&Tau::DAY).unwrap(), "1440");
        assert!(serde_json::from_str::<Tau>("720").is_ok());
        assert!(serde_json::from_str::<Tau>("500").is_err());
    }

    #[test]
    fn there_are_36_divisors_of_a_day() {
        assert_eq!(Tau::all().count(), 36);
    }
}
