//! Property tests for phase series edits.

use chrono::{Duration, NaiveDate};
use ep_common::{PhaseSelector, RecordSet};
use ep_core::{ExampleData, ModelKind, ParamMap, PhaseAddition, PhaseSeries};
use proptest::prelude::*;
use proptest::sample::Index;
use std::collections::BTreeSet;

const DAYS: usize = 60;

fn records() -> RecordSet {
    ExampleData::default()
        .generate(ModelKind::Sir, DAYS, &ParamMap::new())
        .unwrap()
}

/// Baseline series split at the given day offsets.
fn split_series(records: &RecordSet, cuts: &BTreeSet<usize>) -> PhaseSeries {
    let mut series = PhaseSeries::baseline("Main", records).unwrap();
    for &cut in cuts {
        series
            .separate(records.first_date() + Duration::days(cut as i64))
            .unwrap();
    }
    series
}

fn ranges(series: &PhaseSeries) -> Vec<(NaiveDate, NaiveDate)> {
    series
        .phases()
        .iter()
        .map(|p| (p.start(), p.end()))
        .collect()
}

proptest! {
    #[test]
    fn combine_then_separate_restores_ranges(
        cuts in prop::collection::btree_set(1usize..=DAYS, 1..6),
        pick in any::<Index>(),
    ) {
        let records = records();
        let mut series = split_series(&records, &cuts);
        let before = ranges(&series);

        let i = pick.index(series.len() - 1);
        let boundary = series.phases()[i + 1].start();
        series
            .combine(&[PhaseSelector::Index(i), PhaseSelector::Index(i + 1)])
            .unwrap();
        prop_assert_eq!(series.len(), before.len() - 1);
        prop_assert!(series.phases()[i].model().is_none());

        series.separate(boundary).unwrap();
        prop_assert_eq!(ranges(&series), before);
        prop_assert!(series.phases()[i].params().is_empty());
        prop_assert!(series.phases()[i + 1].params().is_empty());
    }

    #[test]
    fn delete_then_add_restores_last_range(
        cuts in prop::collection::btree_set(1usize..=DAYS, 1..6),
    ) {
        let records = records();
        let mut series = split_series(&records, &cuts);
        series
            .assign(
                PhaseSelector::Last,
                ModelKind::Sir,
                None,
                &ModelKind::Sir.example().params,
            )
            .unwrap();
        let before = ranges(&series);
        let (_, last_end) = *before.last().unwrap();

        series.delete(&[PhaseSelector::Last]).unwrap();
        series.add(&PhaseAddition::until(last_end), &records).unwrap();

        prop_assert_eq!(ranges(&series), before);
        let last = series.phase(PhaseSelector::Last).unwrap();
        prop_assert!(last.fit().is_none());
        prop_assert!(last.is_enabled());
    }

    #[test]
    fn edits_keep_phases_ordered_and_disjoint(
        cuts in prop::collection::btree_set(1usize..=DAYS, 0..8),
        disabled in prop::collection::vec(any::<Index>(), 0..4),
    ) {
        let records = records();
        let mut series = split_series(&records, &cuts);
        let selectors: Vec<PhaseSelector> = disabled
            .iter()
            .map(|idx| PhaseSelector::Index(idx.index(series.len())))
            .collect();
        if !selectors.is_empty() {
            series.disable(&selectors).unwrap();
        }

        prop_assert_eq!(series.len(), cuts.len() + 1);
        prop_assert_eq!(series.phases()[0].start(), records.first_date());
        prop_assert_eq!(series.phase(PhaseSelector::Last).unwrap().end(), records.last_date());
        for pair in series.phases().windows(2) {
            prop_assert_eq!(pair[1].start(), pair[0].end() + Duration::days(1));
        }
        let enabled = series.enabled().count();
        let distinct: BTreeSet<usize> = selectors
            .iter()
            .map(|s| s.resolve(series.len()).unwrap())
            .collect();
        prop_assert_eq!(enabled, series.len() - distinct.len());
    }
}
