//! Ordinal phase labels and phase selectors.
//!
//! Phases are addressed at the interface boundary by ordinal ("0th", "1st",
//! "2nd", ...), by plain index ("2"), or by "last". A [`PhaseSelector`] is
//! parsed once and resolved into an index into the live phase list before
//! any mutation happens.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Convert a non-negative integer into its ordinal label ("0th", "1st", "11th", "21st").
pub fn int_to_ordinal(num: usize) -> String {
    format!("{num}{}", ordinal_suffix(num))
}

fn ordinal_suffix(num: usize) -> &'static str {
    if (num / 10) % 10 == 1 {
        return "th";
    }
    match num % 10 {
        1 => "st",
        2 => "nd",
        3 => "rd",
        _ => "th",
    }
}

/// A reference to one phase of a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseSelector {
    /// Zero-based position in the live phase list.
    Index(usize),
    /// The final phase of the list.
    Last,
}

impl PhaseSelector {
    /// Resolve into an index for a series of `len` phases.
    pub fn resolve(&self, len: usize) -> Result<usize> {
        match *self {
            PhaseSelector::Last if len > 0 => Ok(len - 1),
            PhaseSelector::Last => Err(Error::InvalidPhaseSelector(
                "last (series has no phases)".to_string(),
            )),
            PhaseSelector::Index(idx) if idx < len => Ok(idx),
            PhaseSelector::Index(idx) => Err(Error::InvalidPhaseSelector(format!(
                "{} (series has {len} phases)",
                int_to_ordinal(idx)
            ))),
        }
    }

    /// Resolve a list of selectors into sorted, de-duplicated indices.
    pub fn resolve_all(selectors: &[PhaseSelector], len: usize) -> Result<Vec<usize>> {
        if selectors.is_empty() {
            return Err(Error::InvalidPhaseSelector(
                "at least one phase must be selected".to_string(),
            ));
        }
        let mut indices = selectors
            .iter()
            .map(|selector| selector.resolve(len))
            .collect::<Result<Vec<_>>>()?;
        indices.sort_unstable();
        indices.dedup();
        Ok(indices)
    }

    /// Parse a list of textual selectors.
    pub fn parse_all<S: AsRef<str>>(labels: &[S]) -> Result<Vec<PhaseSelector>> {
        labels.iter().map(|label| label.as_ref().parse()).collect()
    }
}

impl FromStr for PhaseSelector {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("last") {
            return Ok(PhaseSelector::Last);
        }
        let digits_end = trimmed
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(trimmed.len());
        let (digits, suffix) = trimmed.split_at(digits_end);
        let num: usize = digits
            .parse()
            .map_err(|_| Error::InvalidPhaseSelector(s.to_string()))?;
        if suffix.is_empty() || suffix.eq_ignore_ascii_case(ordinal_suffix(num)) {
            Ok(PhaseSelector::Index(num))
        } else {
            Err(Error::InvalidPhaseSelector(s.to_string()))
        }
    }
}

impl std::fmt::Display for PhaseSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PhaseSelector::Index(idx) => write!(f, "{}", int_to_ordinal(*idx)),
            PhaseSelector::Last => write!(f, "last"),
        }
    }
}

impl From<usize> for PhaseSelector {
    fn from(idx: usize) -> Self {
        PhaseSelector::Index(idx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int_to_ordinal() {
        let cases = [
            (0, "0th"),
            (1, "1st"),
            (2, "2nd"),
            (3, "3rd"),
            (4, "4th"),
            (11, "11th"),
            (12, "12th"),
            (13, "13th"),
            (21, "21st"),
            (111, "111th"),
            (121, "121st"),
        ];
        for (num, expected) in cases {
            assert_eq!(int_to_ordinal(num), expected);
        }
    }

    #[test]
    fn test_parse_selectors() {
        assert_eq!("0th".parse::<PhaseSelector>().unwrap(), PhaseSelector::Index(0));
        assert_eq!("3rd".parse::<PhaseSelector>().unwrap(), PhaseSelector::Index(3));
        assert_eq!("12th".parse::<PhaseSelector>().unwrap(), PhaseSelector::Index(12));
        assert_eq!("7".parse::<PhaseSelector>().unwrap(), PhaseSelector::Index(7));
        assert_eq!("last".parse::<PhaseSelector>().unwrap(), PhaseSelector::Last);
        assert_eq!("LAST".parse::<PhaseSelector>().unwrap(), PhaseSelector::Last);
    }

    #[test]
    fn test_parse_rejects_mismatched_suffix() {
        assert!("1th".parse::<PhaseSelector>().is_err());
        assert!("11st".parse::<PhaseSelector>().is_err());
        assert!("first".parse::<PhaseSelector>().is_err());
        assert!("".parse::<PhaseSelector>().is_err());
        assert!("-1".parse::<PhaseSelector>().is_err());
    }

    #[test]
    fn test_resolve() {
        assert_eq!(PhaseSelector::Last.resolve(4).unwrap(), 3);
        assert_eq!(PhaseSelector::Index(2).resolve(4).unwrap(), 2);
        assert!(PhaseSelector::Index(4).resolve(4).is_err());
        assert!(PhaseSelector::Last.resolve(0).is_err());
    }

    #[test]
    fn test_resolve_all_sorts_and_dedups() {
        let selectors = PhaseSelector::parse_all(&["last", "1st", "3rd"]).unwrap();
        assert_eq!(PhaseSelector::resolve_all(&selectors, 4).unwrap(), vec![1, 3]);
        assert!(PhaseSelector::resolve_all(&[], 4).is_err());
    }

    #[test]
    fn test_display_round_trips() {
        for selector in [PhaseSelector::Index(0), PhaseSelector::Index(22), PhaseSelector::Last] {
            assert_eq!(selector.to_string().parse::<PhaseSelector>().unwrap(), selector);
        }
    }
}
