//! Fuzz target for config.json parsing and validation.

#![no_main]

use ep_config::{validate_config, EngineConfig};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Parsing and validation should never panic, only return an error
    if let Ok(config) = serde_json::from_slice::<EngineConfig>(data) {
        let _ = validate_config(&config);
    }
});
