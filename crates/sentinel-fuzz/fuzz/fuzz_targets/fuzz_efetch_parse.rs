#![no_main]

use libfuzzer_sys::fuzz_target;
use paper_surfer::client::xml::parse_efetch;

fuzz_target!(|data: &[u8]| {
    // Arbitrary XML must parse or fail cleanly, never panic
    if let Ok(text) = std::str::from_utf8(data) {
        if let Ok(records) = parse_efetch(text) {
            assert!(records.iter().all(|r| !r.identifier.is_empty()));
        }
    }
});
