//! Media hand-off between the camera screen and the task detail screen
//!
//! The camera stashes the URI of a captured file under a transient,
//! per-task key. When the detail screen becomes active again it absorbs
//! the breadcrumb into a media note and deletes the key.
//!
//! ```text
//! photoUri-<taskId>   # one pending photo URI
//! videoUri-<taskId>   # one pending video URI
//! ```

use std::sync::Arc;

use kv_store::KeyValueBackend;
use tracing::{debug, info, warn};

use crate::task::{Note, NoteKind, TaskStore};
use crate::{Error, Result};

/// Kind of captured media
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Photo,
    Video,
}

impl MediaKind {
    /// Order breadcrumbs are absorbed in
    pub const ALL: [MediaKind; 2] = [Self::Photo, Self::Video];

    /// Backend key holding the pending URI for `task_id`
    pub fn key(self, task_id: &str) -> String {
        match self {
            Self::Photo => format!("photoUri-{}", task_id),
            Self::Video => format!("videoUri-{}", task_id),
        }
    }

    /// Note kind the breadcrumb becomes
    pub fn note_kind(self) -> NoteKind {
        match self {
            Self::Photo => NoteKind::Photo,
            Self::Video => NoteKind::Video,
        }
    }
}

/// Transient URI breadcrumbs keyed by task
#[derive(Clone)]
pub struct MediaHandoff {
    backend: Arc<dyn KeyValueBackend>,
}

impl MediaHandoff {
    pub fn new(backend: Arc<dyn KeyValueBackend>) -> Self {
        Self { backend }
    }

    /// Leave `uri` for the task's detail screen, replacing any pending one
    pub async fn stash(&self, task_id: &str, kind: MediaKind, uri: &str) -> Result<()> {
        if task_id.trim().is_empty() {
            return Err(Error::InvalidInput("Task id is missing".into()));
        }
        if uri.trim().is_empty() {
            return Err(Error::InvalidInput("Media URI cannot be empty".into()));
        }

        self.backend.set(&kind.key(task_id), uri).await?;
        debug!("Stashed {:?} for task {}: {}", kind, task_id, uri);
        Ok(())
    }

    /// Pending URI without consuming it
    pub async fn peek(&self, task_id: &str, kind: MediaKind) -> Result<Option<String>> {
        Ok(self.backend.get(&kind.key(task_id)).await?)
    }

    /// Turn every pending breadcrumb of `task_id` into a media note.
    ///
    /// A breadcrumb is deleted only after its note has been stored. A
    /// breadcrumb whose note is already the task's last note (its deletion
    /// failed earlier) is deleted without adding it again. If the task no
    /// longer exists the breadcrumb is discarded. Returns the notes that
    /// were added.
    pub async fn absorb(&self, store: &TaskStore, task_id: &str) -> Result<Vec<Note>> {
        let mut added = Vec::new();

        for kind in MediaKind::ALL {
            let key = kind.key(task_id);
            let Some(uri) = self.backend.get(&key).await? else {
                continue;
            };

            if uri.trim().is_empty() {
                warn!("Discarding empty {:?} breadcrumb for task {}", kind, task_id);
                self.backend.remove(&key).await?;
                continue;
            }

            let attached = store.get(task_id).await.is_some_and(|task| {
                task.notes
                    .last()
                    .is_some_and(|n| n.kind == kind.note_kind() && n.content == uri)
            });
            if attached {
                debug!("{:?} for task {} already attached", kind, task_id);
                self.backend.remove(&key).await?;
                continue;
            }

            match store.add_note(task_id, kind.note_kind(), &uri).await? {
                Some(task) => {
                    if let Some(note) = task.notes.last() {
                        added.push(note.clone());
                    }
                    info!("Attached {:?} to task {}", kind, task_id);
                }
                None => warn!(
                    "Discarding {:?} breadcrumb for missing task {}",
                    kind, task_id
                ),
            }
            self.backend.remove(&key).await?;
        }

        Ok(added)
    }
}
