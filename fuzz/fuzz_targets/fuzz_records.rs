//! Fuzz target for record documents.
//!
//! Arbitrary JSON is parsed as a record supply and validated; whatever
//! validates must satisfy the record identities and segment cleanly.

#![no_main]

use ep_common::{RecordSet, RecordSupply};
use ep_config::TrendConfig;
use ep_core::TrendSegmenter;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(supply) = serde_json::from_slice::<RecordSupply>(data) else {
        return;
    };
    let Ok(records) = RecordSet::from_supply(supply) else {
        return;
    };
    for r in records.iter() {
        assert_eq!(r.confirmed, r.infected + r.recovered + r.fatal);
    }
    if let Ok(trend) = TrendSegmenter::new(TrendConfig::default()).segment(&records) {
        assert_eq!(trend.ranges.first().map(|r| r.0), Some(records.first_date()));
        assert_eq!(trend.ranges.last().map(|r| r.1), Some(records.last_date()));
    }
});
