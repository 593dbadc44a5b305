#![no_main]

use libfuzzer_sys::fuzz_target;
use paper_surfer::settings::Settings;

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        if let Ok(settings) = Settings::from_json(text) {
            // Validation may reject, but must not panic
            let _ = settings.validate();
        }
    }
});
