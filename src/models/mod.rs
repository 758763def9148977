pub mod account;
pub mod chat;
pub mod reservation;
pub mod usage;

pub use account::*;
pub use chat::*;
pub use reservation::*;
pub use usage::*;
