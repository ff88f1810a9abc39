pub mod clock;
mod daemon;
pub mod delivery;

pub use daemon::{DaemonSettings, DaemonState, ReminderDaemon, TickReport};
