use std::time::Duration;

use config::{Config, ConfigError, Environment, File, builder::DefaultState};
use reminderd_scheduler::DaemonSettings;
use serde::Deserialize;

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AppSettings {
    /// Base name of the data and lock files.
    pub app_name: String,
    pub tick_interval_secs: u64,
    pub notify_timeout_secs: u64,
    pub notification_title: String,
    pub save_after_fire: bool,
}

impl AppSettings {
    pub fn load() -> Result<Self, ConfigError> {
        defaults()?
            .add_source(File::with_name("appsettings").required(false))
            .add_source(File::with_name("appsettings.local").required(false))
            .add_source(Environment::with_prefix("REMINDERD").try_parsing(true))
            .build()?
            .try_deserialize()
    }

    pub fn daemon_settings(&self) -> DaemonSettings {
        DaemonSettings {
            tick_interval: Duration::from_secs(self.tick_interval_secs.max(1)),
            notify_timeout: Duration::from_secs(self.notify_timeout_secs.max(1)),
            save_after_fire: self.save_after_fire,
        }
    }
}

fn defaults() -> Result<config::ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("app_name", "reminderd")?
        .set_default("tick_interval_secs", 5)?
        .set_default("notify_timeout_secs", 30)?
        .set_default("notification_title", "Reminder!")?
        .set_default("save_after_fire", true)
}
