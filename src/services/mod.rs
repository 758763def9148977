pub mod admission;
pub mod ai_provider;
pub mod metrics;
pub mod usage_meter;

pub use ai_provider::*;
pub use metrics::*;
pub use usage_meter::*;
