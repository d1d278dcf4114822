//! Fuzz target for bundle reading.
//!
//! Bundles may come from untrusted sources, so parsing and verification must
//! handle arbitrary bytes (JSONL or ZIP) without panicking.

#![no_main]

use aw_bundle::BundleReader;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(reader) = BundleReader::from_bytes(data) {
        let _ = reader.verify();
    }
});
