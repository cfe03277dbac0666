//! Task store
//!
//! Owns the task collection, persists it as one JSON blob and publishes a
//! snapshot to subscribers after every change.
//!
//! Mutations are single-flight: each one reads the current collection,
//! writes the full new collection to the backend and only then commits it
//! in memory and publishes it. A failed write leaves memory, backend and
//! subscribers untouched.

use std::sync::Arc;

use kv_store::{FileBackend, KeyValueBackend};
use tokio::sync::{broadcast, Mutex, RwLock};
use tracing::{debug, info, warn};

use super::model::{Note, NoteKind, Task, TaskPatch, TaskStatus};
use crate::config::StoreConfig;
use crate::ports::{Clock, IdGenerator, SystemClock, TimestampIdGenerator};
use crate::{Error, Result};

/// The collection as published to subscribers
#[derive(Debug, Clone)]
pub struct TaskSnapshot {
    /// Incremented on every publish
    pub revision: u64,
    pub tasks: Arc<Vec<Task>>,
}

/// Result of [`TaskStore::load`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Blob found and parsed
    Loaded { count: usize },
    /// Nothing stored yet
    Empty,
    /// Blob present but unreadable; the collection starts empty
    Corrupt { reason: String },
    /// Backend read failed; the collection starts empty and writes are
    /// refused until a later `load` reads the backend, so the unread blob is
    /// never overwritten
    Unavailable { reason: String },
}

/// Builder for [`TaskStore`]
pub struct TaskStoreBuilder {
    backend: Arc<dyn KeyValueBackend>,
    clock: Option<Arc<dyn Clock>>,
    ids: Option<Arc<dyn IdGenerator>>,
    config: StoreConfig,
}

impl TaskStoreBuilder {
    /// Set the clock used for note dates and default ids
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Set the id generator
    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = Some(ids);
        self
    }

    /// Set the configuration
    pub fn with_config(mut self, config: StoreConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> TaskStore {
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let ids = self
            .ids
            .unwrap_or_else(|| Arc::new(TimestampIdGenerator::new(Arc::clone(&clock))));
        let (events, _) = broadcast::channel(self.config.event_capacity.max(1));

        TaskStore {
            inner: Arc::new(Inner {
                backend: self.backend,
                clock,
                ids,
                config: self.config,
                state: RwLock::new(State::default()),
                gate: Mutex::new(()),
                events,
            }),
        }
    }
}

/// Single source of truth for tasks.
///
/// Cheap to clone; clones share the same collection.
#[derive(Clone)]
pub struct TaskStore {
    inner: Arc<Inner>,
}

struct Inner {
    backend: Arc<dyn KeyValueBackend>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
    config: StoreConfig,
    state: RwLock<State>,
    /// Held for the whole read-modify-write of every mutation
    gate: Mutex<()>,
    events: broadcast::Sender<TaskSnapshot>,
}

#[derive(Default)]
struct State {
    tasks: Arc<Vec<Task>>,
    revision: u64,
    draft: String,
    /// Set while the last load could not read the backend
    unread: Option<String>,
}

impl TaskStore {
    /// Create a store over `backend` with the system clock and defaults
    pub fn new(backend: Arc<dyn KeyValueBackend>) -> Self {
        Self::builder(backend).build()
    }

    /// Start building a store over `backend`
    pub fn builder(backend: Arc<dyn KeyValueBackend>) -> TaskStoreBuilder {
        TaskStoreBuilder {
            backend,
            clock: None,
            ids: None,
            config: StoreConfig::default(),
        }
    }

    /// Create a store persisting to files under `config.data_dir`
    pub fn open(config: StoreConfig) -> Self {
        let backend = Arc::new(FileBackend::new(config.data_dir.clone()));
        Self::builder(backend).with_config(config).build()
    }

    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    /// Subscribe to snapshots published after each change
    pub fn subscribe(&self) -> broadcast::Receiver<TaskSnapshot> {
        self.inner.events.subscribe()
    }

    /// Current collection
    pub async fn tasks(&self) -> Arc<Vec<Task>> {
        Arc::clone(&self.inner.state.read().await.tasks)
    }

    /// Current collection with its revision
    pub async fn snapshot(&self) -> TaskSnapshot {
        let state = self.inner.state.read().await;
        TaskSnapshot {
            revision: state.revision,
            tasks: Arc::clone(&state.tasks),
        }
    }

    pub async fn revision(&self) -> u64 {
        self.inner.state.read().await.revision
    }

    /// Get a task by ID
    pub async fn get(&self, id: &str) -> Option<Task> {
        let state = self.inner.state.read().await;
        state.tasks.iter().find(|t| t.id == id).cloned()
    }

    /// Tasks with the given status, in collection order
    pub async fn find_by_status(&self, status: TaskStatus) -> Vec<Task> {
        let state = self.inner.state.read().await;
        state
            .tasks
            .iter()
            .filter(|t| t.status == status)
            .cloned()
            .collect()
    }

    /// Read the collection from the backend, replacing what is in memory.
    ///
    /// Never fails: an absent, unreadable or unparsable blob all leave the
    /// store empty, and the outcome says which one happened.
    pub async fn load(&self) -> LoadOutcome {
        let _gate = self.inner.gate.lock().await;
        let key = self.inner.config.tasks_key.as_str();

        let (tasks, outcome) = match self.inner.backend.get(key).await {
            Ok(None) => (Vec::new(), LoadOutcome::Empty),
            Ok(Some(raw)) => match serde_json::from_str::<Vec<Task>>(&raw) {
                Ok(tasks) => {
                    let count = tasks.len();
                    (tasks, LoadOutcome::Loaded { count })
                }
                Err(e) => {
                    warn!("Stored tasks under '{}' are corrupt: {}", key, e);
                    self.quarantine(&raw).await;
                    (
                        Vec::new(),
                        LoadOutcome::Corrupt {
                            reason: e.to_string(),
                        },
                    )
                }
            },
            Err(e) => {
                warn!("Failed to read tasks from '{}': {}", key, e);
                (
                    Vec::new(),
                    LoadOutcome::Unavailable {
                        reason: e.to_string(),
                    },
                )
            }
        };

        for task in &tasks {
            self.inner.ids.observe(&task.id);
            for id in task.notes.iter().filter_map(|n| n.id.as_deref()) {
                self.inner.ids.observe(id);
            }
        }
        self.inner.state.write().await.unread = match &outcome {
            LoadOutcome::Unavailable { reason } => Some(reason.clone()),
            _ => None,
        };
        info!("Loaded {} tasks ({:?})", tasks.len(), outcome);
        self.commit(tasks).await;
        outcome
    }

    /// Create a pending task named `name` (trimmed) at the end of the list
    pub async fn add_task(&self, name: &str) -> Result<Task> {
        let _gate = self.inner.gate.lock().await;
        self.add_locked(name).await
    }

    /// Apply `patch` to the task with `id`.
    ///
    /// Returns `None` without writing anything when no such task exists.
    pub async fn update_task(&self, id: &str, patch: TaskPatch) -> Result<Option<Task>> {
        let _gate = self.inner.gate.lock().await;
        self.modify_task(id, |task| Ok(patch.apply(task))).await
    }

    /// Remove the task with `id`.
    ///
    /// Returns the removed task, or `None` without writing anything when no
    /// such task exists.
    pub async fn delete_task(&self, id: &str) -> Result<Option<Task>> {
        let _gate = self.inner.gate.lock().await;
        let current = self.tasks().await;

        let Some(position) = current.iter().position(|t| t.id == id) else {
            debug!("Delete of unknown task {} ignored", id);
            return Ok(None);
        };

        let mut tasks = current.to_vec();
        let removed = tasks.remove(position);
        self.persist(&tasks).await?;
        self.commit(tasks).await;

        info!("Deleted task {}", id);
        Ok(Some(removed))
    }

    /// Remove every task and the stored blob
    pub async fn clear_all(&self) -> Result<()> {
        let _gate = self.inner.gate.lock().await;
        self.ensure_writable().await?;
        self.inner
            .backend
            .remove(&self.inner.config.tasks_key)
            .await?;
        self.commit(Vec::new()).await;

        info!("Cleared all tasks");
        Ok(())
    }

    /// Replace the pending task name buffer
    pub async fn set_draft(&self, name: impl Into<String>) {
        self.inner.state.write().await.draft = name.into();
    }

    /// Pending task name buffer
    pub async fn draft(&self) -> String {
        self.inner.state.read().await.draft.clone()
    }

    /// Add a task from the draft buffer, clearing it only on success.
    ///
    /// A draft edited while the write was in flight is kept.
    pub async fn commit_draft(&self) -> Result<Task> {
        let _gate = self.inner.gate.lock().await;
        let draft = self.draft().await;
        let task = self.add_locked(&draft).await?;
        let mut state = self.inner.state.write().await;
        if state.draft == draft {
            state.draft.clear();
        }
        Ok(task)
    }

    /// Set the status of the task with `id`
    pub async fn set_status(&self, id: &str, status: TaskStatus) -> Result<Option<Task>> {
        self.update_task(id, TaskPatch::new().with_status(status))
            .await
    }

    /// Append a note stamped with the current time.
    ///
    /// For media notes `content` is the URI of the captured file.
    pub async fn add_note(
        &self,
        id: &str,
        kind: NoteKind,
        content: &str,
    ) -> Result<Option<Task>> {
        if content.trim().is_empty() {
            return Err(Error::InvalidInput("Note content cannot be empty".into()));
        }

        let _gate = self.inner.gate.lock().await;
        self.modify_task(id, |task| {
            let note = Note::new(
                self.inner.ids.generate_id(),
                kind,
                content,
                self.inner.clock.now(),
            );
            let mut task = task.clone();
            task.notes.push(note);
            Ok(task)
        })
        .await
    }

    /// Replace the text of the text note at `index`, keeping its date
    pub async fn edit_note(&self, id: &str, index: usize, text: &str) -> Result<Option<Task>> {
        if text.trim().is_empty() {
            return Err(Error::InvalidInput("Note text cannot be empty".into()));
        }

        let _gate = self.inner.gate.lock().await;
        self.modify_task(id, |task| {
            let mut task = task.clone();
            let note = task.notes.get_mut(index).ok_or_else(|| Error::NoteNotFound {
                task_id: id.to_string(),
                index,
            })?;
            if note.kind != NoteKind::Text {
                return Err(Error::InvalidInput(format!(
                    "Note {} is a {:?} note and cannot be edited",
                    index, note.kind
                )));
            }
            note.content = text.to_string();
            Ok(task)
        })
        .await
    }

    /// Remove the note at `index`
    pub async fn remove_note(&self, id: &str, index: usize) -> Result<Option<Task>> {
        let _gate = self.inner.gate.lock().await;
        self.modify_task(id, |task| {
            if index >= task.notes.len() {
                return Err(Error::NoteNotFound {
                    task_id: id.to_string(),
                    index,
                });
            }
            let mut task = task.clone();
            task.notes.remove(index);
            Ok(task)
        })
        .await
    }

    async fn add_locked(&self, name: &str) -> Result<Task> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidInput("Task name cannot be empty".into()));
        }

        let task = Task::new(self.inner.ids.generate_id(), name);
        let mut tasks = self.tasks().await.to_vec();
        tasks.push(task.clone());
        self.persist(&tasks).await?;
        self.commit(tasks).await;

        info!("Added task {} '{}'", task.id, task.name);
        Ok(task)
    }

    /// Replace the task with `id` by `change(task)`. Caller holds the gate.
    async fn modify_task<F>(&self, id: &str, change: F) -> Result<Option<Task>>
    where
        F: FnOnce(&Task) -> Result<Task> + Send,
    {
        let current = self.tasks().await;

        let Some(position) = current.iter().position(|t| t.id == id) else {
            debug!("Update of unknown task {} ignored", id);
            return Ok(None);
        };

        let updated = change(&current[position])?;
        let mut tasks = current.to_vec();
        tasks[position] = updated.clone();
        self.persist(&tasks).await?;
        self.commit(tasks).await;

        debug!("Updated task {}", id);
        Ok(Some(updated))
    }

    /// Write the full collection to the backend
    async fn persist(&self, tasks: &[Task]) -> Result<()> {
        self.ensure_writable().await?;
        let content = serde_json::to_string(tasks)?;
        self.inner
            .backend
            .set(&self.inner.config.tasks_key, &content)
            .await
            .map_err(|e| {
                warn!("Failed to persist tasks: {}", e);
                Error::from(e)
            })?;
        debug!("Persisted {} tasks ({} bytes)", tasks.len(), content.len());
        Ok(())
    }

    async fn ensure_writable(&self) -> Result<()> {
        match &self.inner.state.read().await.unread {
            Some(reason) => Err(Error::NotLoaded(reason.clone())),
            None => Ok(()),
        }
    }

    /// Install `tasks` in memory and publish them
    async fn commit(&self, tasks: Vec<Task>) {
        let snapshot = {
            let mut state = self.inner.state.write().await;
            state.tasks = Arc::new(tasks);
            state.revision += 1;
            TaskSnapshot {
                revision: state.revision,
                tasks: Arc::clone(&state.tasks),
            }
        };
        // No subscribers is fine
        let _ = self.inner.events.send(snapshot);
    }

    async fn quarantine(&self, raw: &str) {
        if !self.inner.config.quarantine_corrupt {
            return;
        }
        let key = self.inner.config.quarantine_key();
        match self.inner.backend.set(&key, raw).await {
            Ok(()) => warn!("Copied corrupt tasks blob to '{}'", key),
            Err(e) => warn!("Failed to quarantine corrupt tasks blob: {}", e),
        }
    }
}
