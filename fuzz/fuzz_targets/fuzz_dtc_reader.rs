#![no_main]

use dtc2vcf::{EmitterConfig, VariantRecord, dtc};
use libfuzzer_sys::fuzz_target;
use std::io::Cursor;

fuzz_target!(|data: &[u8]| {
    let reader = dtc::Reader::with_max_line_length(Cursor::new(data), 256);
    let config = EmitterConfig::default();

    // Iterate all records - should never panic
    for record in reader.take(1000).flatten() {
        let _ = format!("{}", record);
        let line = VariantRecord::from_call(&record, "A").to_line(&config);
        assert!(line.ends_with('\n'));
        VariantRecord::from_line(&line).expect("emitted line parses back");
    }
});
