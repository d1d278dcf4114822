//! Fuzz target for the sanitizer and residue checker.
//!
//! Arbitrary text under arbitrary category toggles must sanitize without
//! panicking, deterministically, and with counts that add up.

#![no_main]

use arbitrary::Arbitrary;
use aw_redact::{residue_check, RedactionConfig, Sanitizer};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct Input {
    text: String,
    secrets: bool,
    pii: bool,
    paths: bool,
    high_entropy: bool,
}

fuzz_target!(|input: Input| {
    let config = RedactionConfig {
        redact_secrets: input.secrets,
        redact_pii: input.pii,
        redact_paths: input.paths,
        enable_high_entropy: input.high_entropy,
        ..RedactionConfig::default()
    };
    let Ok(sanitizer) = Sanitizer::new(&config) else {
        return;
    };

    let (first, report) = sanitizer.sanitize_str(&input.text);
    let (again, again_report) = sanitizer.sanitize_str(&input.text);
    assert_eq!(first, again);
    assert_eq!(report, again_report);
    assert_eq!(
        report.total_redactions,
        report.counts_by_category.values().sum::<usize>()
    );

    let _ = residue_check(&[first.as_str()]);
});
