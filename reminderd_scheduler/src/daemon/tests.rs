use std::{
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use chrono::{NaiveDate, Weekday};
use reminderd_models::{
    reminder::Reminder,
    rule::{ReminderFireTime, TimeRule},
};
use tempfile::TempDir;

use super::*;

type ReceivedMessages = Arc<Mutex<Vec<String>>>;

struct TestNotifier {
    received_messages: ReceivedMessages,
    failing_message: Option<String>,
    delay: Option<Duration>,
}

#[async_trait]
impl ReminderNotifier for TestNotifier {
    async fn notify(&self, message: &str) -> Result<(), NotifyError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing_message.as_deref() == Some(message) {
            return Err(NotifyError::Unavailable("test".to_string()));
        }
        self.received_messages
            .lock()
            .unwrap()
            .push(message.to_string());
        Ok(())
    }
}

/// Adds a reminder to the file while a notification is on screen, the way a
/// concurrent `reminderd add` would.
struct EditingNotifier {
    path: PathBuf,
}

#[async_trait]
impl ReminderNotifier for EditingNotifier {
    async fn notify(&self, _message: &str) -> Result<(), NotifyError> {
        append_to_file(&self.path, daily("added from cli", 18, 0));
        Ok(())
    }
}

struct ManualClock(Mutex<NaiveDateTime>);

impl ManualClock {
    fn set(&self, now: NaiveDateTime) {
        *self.0.lock().unwrap() = now;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> NaiveDateTime {
        *self.0.lock().unwrap()
    }
}

struct TestContext {
    _dir: TempDir,
    path: PathBuf,
    received_messages: ReceivedMessages,
    clock: Arc<ManualClock>,
    daemon: ReminderDaemon,
}

impl TestContext {
    fn new(reminders: Vec<Reminder>) -> Self {
        Self::with_notifier(reminders, None, None)
    }

    fn with_notifier(
        reminders: Vec<Reminder>,
        failing_message: Option<&str>,
        delay: Option<Duration>,
    ) -> Self {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("reminders.json");

        let mut seed = ReminderStore::new(&path);
        for reminder in reminders {
            seed.push(reminder);
        }
        seed.save().unwrap();

        let received_messages = Arc::new(Mutex::new(Vec::new()));
        let notifier = TestNotifier {
            received_messages: received_messages.clone(),
            failing_message: failing_message.map(str::to_string),
            delay,
        };
        let clock = Arc::new(ManualClock(Mutex::new(at(2, 0, 0))));
        let settings = DaemonSettings {
            save_after_fire: false,
            ..DaemonSettings::default()
        };

        let daemon = ReminderDaemon::new(
            ReminderStore::open(&path).unwrap(),
            Arc::new(notifier),
            clock.clone(),
            settings,
        );

        Self {
            _dir: dir,
            path,
            received_messages,
            clock,
            daemon,
        }
    }

    fn received(&self) -> Vec<String> {
        self.received_messages.lock().unwrap().clone()
    }
}

fn fire_time(hour: u32, minute: u32) -> ReminderFireTime {
    ReminderFireTime::from_hm(hour, minute).unwrap()
}

/// June 2025; the 2nd is a Monday.
fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 6, day)
        .unwrap()
        .and_hms_opt(hour, minute, 0)
        .unwrap()
}

/// Appends through a second store and moves the modification time forward,
/// so the change is visible regardless of timestamp granularity.
fn append_to_file(path: &Path, reminder: Reminder) {
    let mut edited = ReminderStore::open(path).unwrap();
    edited.push(reminder);
    edited.save().unwrap();
    std::fs::File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_modified(std::time::SystemTime::now() + Duration::from_secs(5))
        .unwrap();
}

fn persisted_messages(path: &Path) -> Vec<String> {
    ReminderStore::open(path)
        .unwrap()
        .reminders()
        .iter()
        .map(|reminder| reminder.message.clone())
        .collect()
}

fn daily(message: &str, hour: u32, minute: u32) -> Reminder {
    Reminder::new(message, TimeRule::daily(fire_time(hour, minute)))
}

#[tokio::test]
pub async fn tick_notifies_due_reminders_in_store_order() {
    let mut ctx = TestContext::new(vec![
        daily("first", 9, 0),
        daily("later", 18, 0),
        daily("second", 8, 0),
    ]);

    let report = ctx.daemon.tick(at(2, 9, 0)).await;

    assert_eq!(
        report,
        TickReport {
            reloaded: false,
            checked: 3,
            fired: 2,
            failed: 0
        }
    );
    assert_eq!(ctx.received(), vec!["first", "second"]);
}

#[tokio::test]
pub async fn tick_does_not_repeat_within_a_day() {
    let mut ctx = TestContext::new(vec![daily("stand up", 9, 0)]);

    ctx.daemon.tick(at(2, 9, 0)).await;
    ctx.daemon.tick(at(2, 9, 30)).await;
    ctx.daemon.tick(at(3, 9, 0)).await;

    assert_eq!(ctx.received(), vec!["stand up", "stand up"]);
}

#[tokio::test]
pub async fn weekly_reminder_fires_on_matching_day_only() {
    let mut ctx = TestContext::new(vec![Reminder::new(
        "weekly review",
        TimeRule::weekly(Weekday::Mon, fire_time(8, 0)),
    )]);

    ctx.daemon.tick(at(3, 8, 0)).await;
    assert!(ctx.received().is_empty());

    ctx.daemon.tick(at(9, 8, 0)).await;
    assert_eq!(ctx.received(), vec!["weekly review"]);
}

#[tokio::test]
pub async fn failed_notification_does_not_stop_other_reminders() {
    let mut ctx = TestContext::with_notifier(
        vec![daily("broken", 9, 0), daily("works", 9, 0)],
        Some("broken"),
        None,
    );

    let report = ctx.daemon.tick(at(2, 9, 0)).await;

    assert_eq!(report.fired, 2);
    assert_eq!(report.failed, 1);
    assert_eq!(ctx.received(), vec!["works"]);
}

#[tokio::test(start_paused = true)]
pub async fn slow_notification_times_out() {
    let mut ctx = TestContext::with_notifier(
        vec![daily("slow", 9, 0)],
        None,
        Some(Duration::from_secs(600)),
    );

    let report = ctx.daemon.tick(at(2, 9, 0)).await;

    assert_eq!(report.failed, 1);
    assert!(ctx.received().is_empty());
}

#[tokio::test]
pub async fn tick_picks_up_external_changes() {
    let mut ctx = TestContext::new(vec![daily("old", 9, 0)]);

    append_to_file(&ctx.path, daily("new", 9, 0));

    let report = ctx.daemon.tick(at(2, 9, 0)).await;

    assert!(report.reloaded);
    assert_eq!(ctx.received(), vec!["old", "new"]);
}

#[tokio::test]
pub async fn corrupt_refresh_keeps_running_with_last_reminders() {
    let mut ctx = TestContext::new(vec![daily("still here", 9, 0)]);

    std::fs::write(&ctx.path, "{ not json").unwrap();
    std::fs::File::options()
        .write(true)
        .open(&ctx.path)
        .unwrap()
        .set_modified(std::time::SystemTime::now() + Duration::from_secs(5))
        .unwrap();

    let report = ctx.daemon.tick(at(2, 9, 0)).await;

    assert!(!report.reloaded);
    assert_eq!(ctx.received(), vec!["still here"]);
}

#[tokio::test]
pub async fn save_after_fire_persists_fired_state() {
    let mut ctx = TestContext::new(vec![daily("stand up", 9, 0)]);
    ctx.daemon.settings.save_after_fire = true;

    ctx.daemon.tick(at(2, 9, 0)).await;

    let persisted = ReminderStore::open(&ctx.path).unwrap();
    let daily = persisted.reminders()[0].rule.daily_rule();
    assert!(daily.fired_today());
    assert_eq!(daily.fired_at(), Some(at(2, 9, 0)));

    let report = ctx.daemon.tick(at(2, 9, 1)).await;
    assert!(!report.reloaded, "The daemon should not reload its own write.");
}

#[tokio::test]
pub async fn save_after_fire_keeps_reminders_added_during_delivery() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("reminders.json");
    let mut seed = ReminderStore::new(&path);
    seed.push(daily("stand up", 9, 0));
    seed.save().unwrap();

    let mut daemon = ReminderDaemon::new(
        ReminderStore::open(&path).unwrap(),
        Arc::new(EditingNotifier { path: path.clone() }),
        Arc::new(ManualClock(Mutex::new(at(2, 9, 0)))),
        DaemonSettings::default(),
    );

    daemon.tick(at(2, 9, 0)).await;

    assert_eq!(persisted_messages(&path), vec!["stand up", "added from cli"]);
    let persisted = ReminderStore::open(&path).unwrap();
    assert!(persisted.reminders()[0].rule.daily_rule().fired_today());
    assert!(!persisted.reminders()[1].rule.daily_rule().fired_today());
}

#[tokio::test(start_paused = true)]
pub async fn shutdown_save_keeps_reminders_added_after_last_tick() {
    let mut ctx = TestContext::new(vec![daily("stand up", 9, 0)]);
    append_to_file(&ctx.path, daily("added from cli", 18, 0));
    let shutdown = CancellationToken::new();
    shutdown.cancel();

    ctx.daemon.run(shutdown).await.unwrap();

    assert_eq!(persisted_messages(&ctx.path), vec!["stand up", "added from cli"]);
}

#[tokio::test(start_paused = true)]
pub async fn run_ticks_until_shutdown_then_saves() {
    let mut ctx = TestContext::new(vec![daily("stand up", 9, 0)]);
    ctx.clock.set(at(2, 9, 0));
    let shutdown = CancellationToken::new();

    let canceller = {
        let shutdown = shutdown.clone();
        async move {
            tokio::time::sleep(Duration::from_secs(12)).await;
            shutdown.cancel();
        }
    };
    let (result, _) = tokio::join!(ctx.daemon.run(shutdown.clone()), canceller);

    result.unwrap();
    assert_eq!(ctx.daemon.state(), DaemonState::ShuttingDown);
    assert_eq!(ctx.received(), vec!["stand up"]);

    let persisted = ReminderStore::open(&ctx.path).unwrap();
    assert!(persisted.reminders()[0].rule.daily_rule().fired_today());
}

#[tokio::test(start_paused = true)]
pub async fn run_returns_immediately_when_already_cancelled() {
    let mut ctx = TestContext::new(vec![daily("never", 0, 0)]);
    let shutdown = CancellationToken::new();
    shutdown.cancel();

    ctx.daemon.run(shutdown).await.unwrap();

    assert!(ctx.received().is_empty());
    assert_eq!(ctx.daemon.state(), DaemonState::ShuttingDown);
}

#[test]
pub fn daemon_starts_initializing() {
    let ctx = TestContext::new(vec![]);

    assert_eq!(ctx.daemon.state(), DaemonState::Initializing);
    assert!(ctx.daemon.store().is_empty());
}
