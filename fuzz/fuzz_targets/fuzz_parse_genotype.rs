#![no_main]

use dtc2vcf::dtc::{Call, parse_call};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let input = String::from_utf8_lossy(data);

    // Should never panic; accepted calls are bounded to a pair.
    if let Ok(Call::Observed(alleles)) = parse_call(&input) {
        let _ = format!("{:?}", alleles);
        assert!(input.trim().chars().count() <= 2, "accepted oversized call");
    }
});
