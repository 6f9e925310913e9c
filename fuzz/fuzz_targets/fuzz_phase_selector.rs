//! Fuzz target for ordinal phase labels.
//!
//! Parsing and resolving arbitrary labels must return an error, never panic.

#![no_main]

use ep_common::PhaseSelector;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|input: (&str, u8)| {
    let (label, len) = input;
    if let Ok(selector) = label.parse::<PhaseSelector>() {
        if let Ok(idx) = selector.resolve(len as usize) {
            assert!(idx < len as usize);
        }
    }
});
