#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let data = if data.len() > 64 * 1024 {
        &data[..64 * 1024]
    } else {
        data
    };

    // Deserialization of attacker-controlled IR must fail cleanly, never
    // panic.
    let _ = ccimport_core::ir::deserialize_ir(data);
});
