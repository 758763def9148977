pub mod cors;
pub mod metrics;
pub mod user;

pub use cors::*;
pub use metrics::*;
pub use user::*;
