pub mod reminder;
pub mod rule;

pub use chrono;
