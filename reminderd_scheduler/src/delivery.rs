use std::{io, process::ExitStatus, time::Duration};

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("No notification program found (tried {0})")]
    Unavailable(String),

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("Notification program exited with {0}")]
    Failed(ExitStatus),

    #[error("Notification was not delivered within {0:?}")]
    Timeout(Duration),
}

#[async_trait]
pub trait ReminderNotifier: Send + Sync + 'static {
    async fn notify(&self, message: &str) -> Result<(), NotifyError>;
}
