//! Store configuration
//!
//! Defaults suit a single local profile; every field can be overridden
//! through `TODO_*` environment variables.

use std::path::PathBuf;

use crate::{Error, Result};

/// Backend key holding the serialized task collection
pub const DEFAULT_TASKS_KEY: &str = "tasks";

/// Configuration for [`crate::task::TaskStore`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Directory for the file backend
    pub data_dir: PathBuf,
    /// Key the task collection is persisted under
    pub tasks_key: String,
    /// Snapshots buffered per subscriber before slow ones start lagging
    pub event_capacity: usize,
    /// Copy an unreadable blob aside before it can be overwritten
    pub quarantine_corrupt: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".todo-data"),
            tasks_key: DEFAULT_TASKS_KEY.to_string(),
            event_capacity: 64,
            quarantine_corrupt: true,
        }
    }
}

impl StoreConfig {
    /// Build a configuration from the process environment.
    ///
    /// Reads `TODO_DATA_DIR`, `TODO_TASKS_KEY`, `TODO_EVENT_CAPACITY` and
    /// `TODO_QUARANTINE_CORRUPT`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a configuration from an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        let var = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let event_capacity = match var("TODO_EVENT_CAPACITY") {
            Some(raw) => match raw.parse::<usize>() {
                Ok(0) | Err(_) => {
                    return Err(Error::Config(format!(
                        "TODO_EVENT_CAPACITY must be a positive integer, got '{}'",
                        raw
                    )))
                }
                Ok(capacity) => capacity,
            },
            None => defaults.event_capacity,
        };

        let quarantine_corrupt = match var("TODO_QUARANTINE_CORRUPT") {
            Some(raw) => parse_flag(&raw).ok_or_else(|| {
                Error::Config(format!(
                    "TODO_QUARANTINE_CORRUPT must be a boolean, got '{}'",
                    raw
                ))
            })?,
            None => defaults.quarantine_corrupt,
        };

        Ok(Self {
            data_dir: var("TODO_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            tasks_key: var("TODO_TASKS_KEY").unwrap_or(defaults.tasks_key),
            event_capacity,
            quarantine_corrupt,
        })
    }

    /// Set the data directory
    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }

    /// Set the tasks key
    pub fn with_tasks_key(mut self, tasks_key: impl Into<String>) -> Self {
        self.tasks_key = tasks_key.into();
        self
    }

    /// Key a corrupt blob is copied to
    pub fn quarantine_key(&self) -> String {
        format!("{}.corrupt", self.tasks_key)
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
