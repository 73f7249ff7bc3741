#![no_main]

use libfuzzer_sys::fuzz_target;
use simai_model::{SimaiDecoder, SimaiEncoder};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(chart) = SimaiDecoder::new().decode_str(text) else {
        return;
    };
    // Durations below 1/1000 measure encode as zero, so the second decode may fail
    if let Ok(encoded) = SimaiEncoder::new().encode(&chart) {
        let _ = SimaiDecoder::new().decode_str(&encoded);
    }
});
