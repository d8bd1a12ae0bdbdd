#![no_main]
use libfuzzer_sys::fuzz_target;

use flagstone_core::expression::ExpressionRegistry;

fuzz_target!(|data: &[u8]| {
    if let Ok(value) = serde_json::from_slice::<serde_json::Value>(data) {
        let _ = ExpressionRegistry::shared().build(&value);
    }
});
