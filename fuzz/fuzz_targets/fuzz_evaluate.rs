#![no_main]
use libfuzzer_sys::fuzz_target;

use flagstone_core::expression::{ExpressionContext, ExpressionRegistry};

fuzz_target!(|data: &[u8]| {
    if let Ok(value) = serde_json::from_slice::<serde_json::Value>(data) {
        if let Ok(expr) = ExpressionRegistry::shared().build(&value) {
            let ctx = ExpressionContext {
                feature_name: "fuzz".to_string(),
                properties: Default::default(),
            };
            let _ = expr.evaluate(&ctx);
        }
    }
});
