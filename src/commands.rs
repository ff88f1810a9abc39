use std::{io::Write, sync::Arc};

use anyhow::Context;
use chrono::{NaiveTime, Weekday};
use reminderd_desktop::DesktopNotifier;
use reminderd_models::{
    reminder::Reminder,
    rule::{ReminderFireTime, RuleError, TimeRule},
};
use reminderd_scheduler::{ReminderDaemon, clock::SystemClock};
use reminderd_storage::ReminderStore;

use crate::{appsettings::AppSettings, lock::ProcessLock, paths, shutdown};

pub async fn daemon(settings: &AppSettings) -> anyhow::Result<()> {
    let data_file = paths::data_file(&settings.app_name, paths::process_env)?;
    let lock_file = paths::lock_file(&settings.app_name, paths::process_env)?;

    let store = ReminderStore::open(&data_file).context("Could not load reminders")?;
    log::info!("Using data file {}", store.path().display());

    let lock = ProcessLock::acquire(&lock_file)?;
    log::info!("Holding process lock {}", lock.path().display());
    let shutdown =
        shutdown::install_signal_handlers().context("Could not install signal handlers")?;

    let notifier = Arc::new(DesktopNotifier::new(settings.notification_title.clone()));
    let mut daemon = ReminderDaemon::new(
        store,
        notifier,
        Arc::new(SystemClock),
        settings.daemon_settings(),
    );

    daemon
        .run(shutdown)
        .await
        .context("Could not save reminders on shutdown")
}

pub fn add(store: &mut ReminderStore, message: String, rule: TimeRule) -> anyhow::Result<()> {
    log::info!("Adding reminder '{message}' ({rule})");
    store.push(Reminder::new(message, rule));
    store.save()?;
    Ok(())
}

/// Removes the reminder numbered `index` as shown by [`list`] (1-based).
pub fn delete(store: &mut ReminderStore, index: usize) -> anyhow::Result<Reminder> {
    let removed = index
        .checked_sub(1)
        .and_then(|position| store.remove(position))
        .with_context(|| {
            format!(
                "There is no reminder number {index}, {} reminders exist",
                store.len()
            )
        })?;

    store.save()?;
    Ok(removed)
}

pub fn list(store: &ReminderStore, out: &mut impl Write) -> std::io::Result<()> {
    if store.is_empty() {
        return writeln!(out, "No reminders.");
    }

    for (position, reminder) in store.reminders().iter().enumerate() {
        writeln!(out, "{:>3}. {} ({})", position + 1, reminder.message, reminder.rule)?;
    }

    Ok(())
}

pub fn build_rule(
    at: NaiveTime,
    weekly: Option<Weekday>,
    monthly: Option<u32>,
) -> Result<TimeRule, RuleError> {
    let fire_at = ReminderFireTime::new(at);
    match (weekly, monthly) {
        (Some(weekday), _) => Ok(TimeRule::weekly(weekday, fire_at)),
        (None, Some(day)) => TimeRule::monthly(day, fire_at),
        (None, None) => Ok(TimeRule::daily(fire_at)),
    }
}
