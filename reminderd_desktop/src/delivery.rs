use std::path::PathBuf;

use async_trait::async_trait;
use reminderd_scheduler::delivery::{NotifyError, ReminderNotifier};
use tokio::process::Command;

/// Seconds a kdialog popup stays on screen.
const POPUP_TIMEOUT_SECS: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationProgram {
    NotifySend,
    Kdialog,
}

impl NotificationProgram {
    const PREFERENCE: [NotificationProgram; 2] =
        [NotificationProgram::NotifySend, NotificationProgram::Kdialog];

    pub fn binary_name(&self) -> &'static str {
        match self {
            NotificationProgram::NotifySend => "notify-send",
            NotificationProgram::Kdialog => "kdialog",
        }
    }

    pub fn args(&self, title: &str, message: &str) -> Vec<String> {
        match self {
            // Everything after `--` is positional, so a leading dash stays text.
            NotificationProgram::NotifySend => vec![
                "--app-name".to_string(),
                title.to_string(),
                "--".to_string(),
                title.to_string(),
                message.to_string(),
            ],
            // --passivepopup does not block until the user dismisses it.
            NotificationProgram::Kdialog => vec![
                "--title".to_string(),
                title.to_string(),
                "--passivepopup".to_string(),
                message.to_string(),
                POPUP_TIMEOUT_SECS.to_string(),
            ],
        }
    }

    fn locate() -> Result<(NotificationProgram, PathBuf), NotifyError> {
        Self::PREFERENCE
            .into_iter()
            .find_map(|program| {
                which::which(program.binary_name())
                    .ok()
                    .map(|path| (program, path))
            })
            .ok_or_else(|| {
                let tried: Vec<&str> = Self::PREFERENCE.iter().map(|p| p.binary_name()).collect();
                NotifyError::Unavailable(tried.join(", "))
            })
    }
}

pub struct DesktopNotifier {
    title: String,
}

impl DesktopNotifier {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
        }
    }
}

#[async_trait]
impl ReminderNotifier for DesktopNotifier {
    async fn notify(&self, message: &str) -> Result<(), NotifyError> {
        let (program, path) = NotificationProgram::locate()?;
        log::debug!("Sending notification with {}", path.display());

        let status = Command::new(path)
            .args(program.args(&self.title, message))
            .kill_on_drop(true)
            .status()
            .await?;

        if status.success() {
            Ok(())
        } else {
            Err(NotifyError::Failed(status))
        }
    }
}
