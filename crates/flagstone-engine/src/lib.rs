#![forbid(unsafe_code)]

pub mod context;
pub mod feature;
pub mod flags;
pub mod gates;
pub mod memory;

pub use context::EvaluationContext;
pub use feature::{Feature, FeatureState};
pub use flags::Flags;
pub use memory::MemoryAdapter;
