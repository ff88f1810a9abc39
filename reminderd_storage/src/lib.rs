mod json_store;
mod model;

pub use json_store::{LoadError, LoadOutcome, ReminderStore, SaveError};
pub use model::{RecordError, ReminderRecord};
