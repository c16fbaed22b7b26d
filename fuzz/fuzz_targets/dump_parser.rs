#![no_main]

use libfuzzer_sys::fuzz_target;
use regfit::dump::parse_dump_bytes;

fuzz_target!(|data: &[u8]| {
    // Invalid UTF-8 is dropped, so every byte string is a valid input
    let registers = parse_dump_bytes(data);

    for name in registers.keys() {
        let lower = name.to_ascii_lowercase();
        assert!(lower.starts_with("mc_") || lower.starts_with("emc_"));
    }
});
