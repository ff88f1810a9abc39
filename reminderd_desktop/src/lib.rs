mod delivery;

pub use delivery::{DesktopNotifier, NotificationProgram};
