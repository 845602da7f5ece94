#![no_main]

use jsonschema_cue_core::{extract, generate, host, Config, GenerateConfig};
use libfuzzer_sys::fuzz_target;

// Accepts arbitrary bytes, attempts to parse as JSON, feeds the result
// through extract and, when that succeeds, back through generate.
// Neither direction may panic, whatever the input.
fuzz_target!(|data: &[u8]| {
    let Ok(schema) = serde_json::from_slice::<serde_json::Value>(data) else {
        return;
    };
    let Ok(file) = extract(&schema, &Config::default()) else {
        return;
    };
    if let Ok(pkg) = host::compile(&file) {
        let _ = generate(&host::Value::new(pkg), &GenerateConfig::default());
    }
});
