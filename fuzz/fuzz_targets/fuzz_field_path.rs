//! Fuzz target for field-path parsing and selection.
//!
//! Any pattern text must either parse or return an error, and selection with
//! a parsed pattern must never panic or grow the document.

#![no_main]

use aw_redact::{FieldPattern, FieldSelector};
use libfuzzer_sys::fuzz_target;
use serde_json::json;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(pattern) = FieldPattern::parse(text) else {
        return;
    };

    let doc = json!({
        "correlation_id": "c1",
        "hook_session": {"cwd": "/work", "commits": [{"hash": "a", "message": "m"}]},
        "tool_usages": [{"tool_name": "Bash", "tool_input": {"command": "ls"}}, 3, null],
        "transcript": null
    });
    let selector = FieldSelector::new(&[pattern]);
    let (selected, stripped) = selector.select_with_report(&doc);
    assert!(selected.to_string().len() <= doc.to_string().len());
    let _ = stripped;
});
