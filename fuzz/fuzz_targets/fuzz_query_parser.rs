#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(line) = std::str::from_utf8(data) {
        // Must reject or parse, never panic
        let _ = anyk::query::parse_query_line(line);
    }
});
