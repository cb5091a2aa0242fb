#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(bilayer) = bilayer_ir::loading::load_str(s) {
            // Encoding a loaded graph must never panic, even when the layers
            // are misaligned or the tangent layer is empty.
            let _ = bilayer_smt::encoder::build_constraints(&bilayer, &[0, 1, 2]);
        }
    }
});
