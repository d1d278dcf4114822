//! Fuzz target for `aw.toml` parsing.
//!
//! Config parsing and validation must handle arbitrary input without
//! panicking.

#![no_main]

use aw_core::AwConfig;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(config) = AwConfig::from_toml_str(text) {
        let _ = config.validate();
    }
});
