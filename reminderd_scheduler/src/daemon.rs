use std::{sync::Arc, time::Duration};

use chrono::NaiveDateTime;
use reminderd_storage::{LoadOutcome, ReminderStore, SaveError};
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::{
    clock::Clock,
    delivery::{NotifyError, ReminderNotifier},
};

const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(5);
const DEFAULT_NOTIFY_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaemonState {
    Initializing,
    Running,
    ShuttingDown,
}

#[derive(Debug, Clone)]
pub struct DaemonSettings {
    pub tick_interval: Duration,
    pub notify_timeout: Duration,
    /// Persist fired-state right after a tick that fired, not only on shutdown.
    pub save_after_fire: bool,
}

impl Default for DaemonSettings {
    fn default() -> Self {
        Self {
            tick_interval: DEFAULT_TICK_INTERVAL,
            notify_timeout: DEFAULT_NOTIFY_TIMEOUT,
            save_after_fire: true,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    pub reloaded: bool,
    pub checked: usize,
    pub fired: usize,
    pub failed: usize,
}

pub struct ReminderDaemon {
    store: ReminderStore,
    notifier: Arc<dyn ReminderNotifier>,
    clock: Arc<dyn Clock>,
    settings: DaemonSettings,
    state: DaemonState,
}

impl ReminderDaemon {
    /// `store` is expected to have gone through its forced initial load.
    pub fn new(
        store: ReminderStore,
        notifier: Arc<dyn ReminderNotifier>,
        clock: Arc<dyn Clock>,
        settings: DaemonSettings,
    ) -> Self {
        Self {
            store,
            notifier,
            clock,
            settings,
            state: DaemonState::Initializing,
        }
    }

    pub fn state(&self) -> DaemonState {
        self.state
    }

    pub fn store(&self) -> &ReminderStore {
        &self.store
    }

    /// Checks reminders every tick until `shutdown` is cancelled, then saves
    /// the store.
    pub async fn run(&mut self, shutdown: CancellationToken) -> Result<(), SaveError> {
        self.transition(DaemonState::Running);

        let mut ticker = time::interval(self.settings.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    log::info!("Shutdown requested");
                    break;
                }
                _ = ticker.tick() => {
                    let now = self.clock.now();
                    let report = self.tick(now).await;
                    log::debug!("Tick finished. {report:?}");
                }
            }
        }

        self.transition(DaemonState::ShuttingDown);

        self.persist().inspect_err(|error| {
            log::error!(
                "Could not save reminders on shutdown, fired-state is lost. [error = {error}]"
            )
        })
    }

    /// One iteration of the loop: refresh the store if the file changed,
    /// verify every reminder against `now`, notify the due ones.
    pub async fn tick(&mut self, now: NaiveDateTime) -> TickReport {
        let mut report = TickReport::default();

        match self.store.load(false) {
            Ok(LoadOutcome::Reloaded) => {
                report.reloaded = true;
                log::info!("[RELOAD] Data file changed, {} reminders loaded", self.store.len());
            }
            Ok(LoadOutcome::Unchanged) => {}
            Err(error) => log::error!(
                "Could not refresh reminders, keeping the last loaded ones. [error = {error}]"
            ),
        }

        let due: Vec<String> = self
            .store
            .iter_mut()
            .filter_map(|reminder| reminder.verify(now).then(|| reminder.message.clone()))
            .collect();
        report.checked = self.store.len();

        for message in due {
            report.fired += 1;
            log::info!("[FIRE] {message}");

            if let Err(error) = self.deliver(&message).await {
                report.failed += 1;
                log::error!("Could not deliver reminder. [error = {error}, message = {message}]");
            }
        }

        if report.fired > 0 && self.settings.save_after_fire {
            if let Err(error) = self.persist() {
                log::error!("Could not persist fired reminders. [error = {error}]");
            }
        }

        report
    }

    async fn deliver(&self, message: &str) -> Result<(), NotifyError> {
        let timeout = self.settings.notify_timeout;
        match time::timeout(timeout, self.notifier.notify(message)).await {
            Ok(result) => result,
            Err(_) => Err(NotifyError::Timeout(timeout)),
        }
    }

    /// Picks up edits made to the file since the last refresh, then writes
    /// the store back.
    fn persist(&mut self) -> Result<(), SaveError> {
        match self.store.load(false) {
            Ok(LoadOutcome::Reloaded) => {
                log::info!("[RELOAD] Data file changed before saving, merging fired-state")
            }
            Ok(LoadOutcome::Unchanged) => {}
            Err(error) => log::error!(
                "Could not refresh reminders before saving, overwriting the file. [error = {error}]"
            ),
        }
        self.store.save()
    }

    fn transition(&mut self, state: DaemonState) {
        log::info!("Daemon state {:?} -> {:?}", self.state, state);
        self.state = state;
    }
}

#[cfg(test)]
mod tests;
