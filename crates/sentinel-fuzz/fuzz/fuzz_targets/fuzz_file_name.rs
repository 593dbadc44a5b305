#![no_main]

use libfuzzer_sys::fuzz_target;
use paper_surfer::models::{MetadataRecord, OutputFormat};
use paper_surfer::output::file_name;

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data);
    let mut parts = text.splitn(3, '\n');
    let record = MetadataRecord {
        journal: parts.next().map(str::to_string),
        title: parts.next().map(str::to_string),
        ..MetadataRecord::new(parts.next().unwrap_or("1"))
    };

    let name = file_name(&record, OutputFormat::Markdown);
    assert!(!name.contains('/'));
    assert!(!name.contains('\\'));
    assert!(!name.contains('\0'));
});
