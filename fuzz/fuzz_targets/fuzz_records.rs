//! Fuzz target for record ingestion and correlation.
//!
//! Malformed records must be skipped, never panic, and correlation must
//! still never assign a hook session or transcript twice.

#![no_main]

use aw_common::RecordSet;
use aw_correlate::Correlator;
use libfuzzer_sys::fuzz_target;
use std::collections::BTreeSet;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(records) = RecordSet::from_json_str(text) else {
        return;
    };

    let output = Correlator::new().run(&records, &[], 0);
    let mut hooks = BTreeSet::new();
    let mut transcripts = BTreeSet::new();
    for conversation in &output.conversations {
        if let Some(hook) = &conversation.hook_session {
            assert!(hooks.insert(hook.session_id.clone()));
        }
        if let Some(transcript) = &conversation.transcript {
            assert!(transcripts.insert(transcript.id.clone()));
        }
    }
});
