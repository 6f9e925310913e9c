//! Property-based tests for phase selector parsing.

use ep_common::{int_to_ordinal, PhaseSelector};
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Every ordinal label parses back to its index.
    #[test]
    fn ordinal_label_round_trips(num in 0usize..100_000) {
        let label = int_to_ordinal(num);
        prop_assert_eq!(label.parse::<PhaseSelector>().unwrap(), PhaseSelector::Index(num));
    }

    /// Resolution never yields an index outside the series.
    #[test]
    fn resolved_index_is_in_bounds(idx in 0usize..50, len in 0usize..50) {
        match PhaseSelector::Index(idx).resolve(len) {
            Ok(resolved) => prop_assert!(resolved < len),
            Err(_) => prop_assert!(idx >= len),
        }
    }

    /// Parsing arbitrary text never panics.
    #[test]
    fn parse_arbitrary_text_does_not_panic(text in "\\PC{0,12}") {
        let _ = text.parse::<PhaseSelector>();
    }
}
