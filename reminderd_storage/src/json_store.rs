use std::{
    fs::{self, OpenOptions},
    io,
    path::{Path, PathBuf},
    time::SystemTime,
};

use reminderd_models::reminder::Reminder;
use thiserror::Error;

use crate::model::{RecordError, ReminderRecord};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Could not read data file {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Data file {} is not a valid reminder list", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Reminder #{index} in {} is invalid", path.display())]
    InvalidRecord {
        path: PathBuf,
        index: usize,
        #[source]
        source: RecordError,
    },
}

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("Could not write data file {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Reloaded,
    Unchanged,
}

/// Reminders backed by a JSON file.
///
/// The store remembers the modification time of the file as of the last
/// successful load or save, and a non-forced [`ReminderStore::load`] only
/// reparses the file when that time has changed.
pub struct ReminderStore {
    path: PathBuf,
    reminders: Vec<Reminder>,
    last_modified: Option<SystemTime>,
}

impl ReminderStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            reminders: Vec::new(),
            last_modified: None,
        }
    }

    /// Creates a store and performs the forced initial load.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, LoadError> {
        let mut store = Self::new(path);
        store.load(true)?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn reminders(&self) -> &[Reminder] {
        &self.reminders
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Reminder> {
        self.reminders.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.reminders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reminders.is_empty()
    }

    pub fn push(&mut self, reminder: Reminder) {
        self.reminders.push(reminder);
    }

    pub fn remove(&mut self, index: usize) -> Option<Reminder> {
        (index < self.reminders.len()).then(|| self.reminders.remove(index))
    }

    pub fn should_reload(&self) -> Result<bool, LoadError> {
        let modified = self.modified_time().map_err(|source| self.io_error(source))?;
        Ok(self.last_modified != Some(modified))
    }

    pub fn load(&mut self, force: bool) -> Result<LoadOutcome, LoadError> {
        if !force && !self.should_reload()? {
            return Ok(LoadOutcome::Unchanged);
        }

        log::info!("Loading reminders from {}", self.path.display());

        self.ensure_file_exists()
            .map_err(|source| self.io_error(source))?;
        let modified = self.modified_time().map_err(|source| self.io_error(source))?;
        let contents = fs::read_to_string(&self.path).map_err(|source| self.io_error(source))?;
        let reloaded = self.parse(&contents)?;

        let previous = std::mem::take(&mut self.reminders);
        self.reminders = if force {
            reloaded
        } else {
            reconcile(previous, reloaded)
        };
        self.last_modified = Some(modified);

        log::info!("Loaded {} reminders", self.reminders.len());
        Ok(LoadOutcome::Reloaded)
    }

    pub fn save(&mut self) -> Result<(), SaveError> {
        let records: Vec<ReminderRecord> = self.reminders.iter().map(Into::into).collect();
        let json = serde_json::to_string_pretty(&records)?;

        let write = || -> io::Result<SystemTime> {
            if let Some(parent) = self.path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&self.path, json)?;
            self.modified_time()
        };

        let modified = write().map_err(|source| SaveError::Io {
            path: self.path.clone(),
            source,
        })?;
        self.last_modified = Some(modified);

        log::info!(
            "Saved {} reminders to {}",
            self.reminders.len(),
            self.path.display()
        );
        Ok(())
    }

    fn parse(&self, contents: &str) -> Result<Vec<Reminder>, LoadError> {
        if contents.trim().is_empty() {
            return Ok(Vec::new());
        }

        let records: Vec<ReminderRecord> =
            serde_json::from_str(contents).map_err(|source| LoadError::Parse {
                path: self.path.clone(),
                source,
            })?;

        records
            .into_iter()
            .enumerate()
            .map(|(index, record)| {
                Reminder::try_from(record).map_err(|source| LoadError::InvalidRecord {
                    path: self.path.clone(),
                    index,
                    source,
                })
            })
            .collect()
    }

    fn ensure_file_exists(&self) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        Ok(())
    }

    fn modified_time(&self) -> io::Result<SystemTime> {
        fs::metadata(&self.path)?.modified()
    }

    fn io_error(&self, source: io::Error) -> LoadError {
        LoadError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

/// Carries fired-state from the in-memory reminders over to the freshly
/// reloaded ones, so an external edit of the file does not re-arm reminders
/// that already fired. Each previous reminder matches at most once.
fn reconcile(previous: Vec<Reminder>, mut reloaded: Vec<Reminder>) -> Vec<Reminder> {
    let mut previous: Vec<Option<Reminder>> = previous.into_iter().map(Some).collect();

    for reminder in &mut reloaded {
        let matched = previous
            .iter_mut()
            .find(|slot| slot.as_ref().is_some_and(|old| old.same_schedule(reminder)))
            .and_then(Option::take);

        if let Some(old) = matched {
            reminder
                .rule
                .daily_rule_mut()
                .adopt_newer_fired_state(old.rule.daily_rule());
        }
    }

    reloaded
}
