//! Fuzz target for sequences of phase edits.
//!
//! Every edit either succeeds or leaves the series untouched, and the
//! phases stay ordered and non-overlapping throughout.

#![no_main]

use arbitrary::Arbitrary;
use chrono::Duration;
use ep_common::PhaseSelector;
use ep_core::{ExampleData, ModelKind, ParamMap, PhaseAddition, PhaseSeries};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
enum Edit {
    Separate(u8),
    Combine(u8, u8),
    Delete(u8),
    Disable(u8),
    Enable(u8),
    Add(u8),
}

fn selector(raw: u8) -> PhaseSelector {
    if raw == u8::MAX {
        PhaseSelector::Last
    } else {
        PhaseSelector::Index((raw % 16) as usize)
    }
}

fuzz_target!(|edits: Vec<Edit>| {
    let Ok(records) = ExampleData::default().generate(ModelKind::Sir, 60, &ParamMap::new()) else {
        return;
    };
    let Ok(mut series) = PhaseSeries::baseline("Main", &records) else {
        return;
    };

    for edit in edits.iter().take(32) {
        let before = series.clone();
        let result = match *edit {
            Edit::Separate(day) => {
                series.separate(records.first_date() + Duration::days(day as i64))
            }
            Edit::Combine(a, b) => series.combine(&[selector(a), selector(b)]),
            Edit::Delete(a) => series.delete(&[selector(a)]),
            Edit::Disable(a) => series.disable(&[selector(a)]),
            Edit::Enable(a) => series.enable(&[selector(a)]),
            Edit::Add(days) => series.add(&PhaseAddition::for_days(days as usize), &records),
        };
        if result.is_err() {
            assert_eq!(series, before);
        }
        for pair in series.phases().windows(2) {
            assert!(pair[0].end() < pair[1].start());
        }
    }
});
