//! Task model definitions
//!
//! The serialized form is the JSON array stored under the tasks key. Older
//! app revisions wrote fewer fields and different labels; deserialization
//! accepts those shapes so existing blobs keep loading.

use chrono::{DateTime, Local, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Format of [`Note::date`], e.g. `07.03.2024 18:05`
pub const NOTE_DATE_FORMAT: &str = "%d.%m.%Y %H:%M";

/// Task status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[serde(alias = "Do zrobienia")]
    Pending,
    #[serde(alias = "W trakcie")]
    InProgress,
    #[serde(alias = "Gotowe")]
    Done,
}

impl Default for TaskStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl TaskStatus {
    /// All statuses in display order
    pub const ALL: [TaskStatus; 3] = [Self::Pending, Self::InProgress, Self::Done];

    /// Label shown to the user
    pub fn label(self) -> &'static str {
        match self {
            Self::Pending => "Do zrobienia",
            Self::InProgress => "W trakcie",
            Self::Done => "Gotowe",
        }
    }
}

/// What a note carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteKind {
    Text,
    Photo,
    Video,
}

/// A timestamped annotation on a task.
///
/// For `Text` notes `content` is the text; for media notes it is the URI of
/// the captured file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "StoredNote")]
pub struct Note {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub kind: NoteKind,
    pub content: String,
    /// Local time the note was written, formatted with [`NOTE_DATE_FORMAT`]
    pub date: String,
}

impl Note {
    /// Create a note stamped with `at` in local time
    pub fn new(
        id: impl Into<String>,
        kind: NoteKind,
        content: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Some(id.into()),
            kind,
            content: content.into(),
            date: format_note_date(at),
        }
    }

    /// Text of the note (the URI for media notes)
    pub fn text(&self) -> &str {
        &self.content
    }

    /// Parse `date` back into a local timestamp, if it is well formed
    pub fn parsed_date(&self) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(&self.date, NOTE_DATE_FORMAT).ok()
    }
}

/// Render an instant as a note date in local time
pub fn format_note_date(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format(NOTE_DATE_FORMAT).to_string()
}

/// Note shapes found in stored blobs
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredNote {
    Typed {
        #[serde(default)]
        id: Option<String>,
        #[serde(rename = "type")]
        kind: NoteKind,
        content: String,
        date: String,
    },
    // Earliest revisions stored plain text notes
    Plain { text: String, date: String },
}

impl From<StoredNote> for Note {
    fn from(stored: StoredNote) -> Self {
        match stored {
            StoredNote::Typed {
                id,
                kind,
                content,
                date,
            } => Self {
                id,
                kind,
                content,
                date,
            },
            StoredNote::Plain { text, date } => Self {
                id: None,
                kind: NoteKind::Text,
                content: text,
                date,
            },
        }
    }
}

/// A to-do item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub notes: Vec<Note>,
}

impl Task {
    /// Create a pending task without notes
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            status: TaskStatus::default(),
            notes: Vec::new(),
        }
    }

    /// Set the status
    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    /// Append a note
    pub fn with_note(mut self, note: Note) -> Self {
        self.notes.push(note);
        self
    }
}

/// Partial update of a task.
///
/// Fields left as `None` keep their current value. Identity and name are
/// not patchable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub status: Option<TaskStatus>,
    pub notes: Option<Vec<Note>>,
}

impl TaskPatch {
    /// Empty patch
    pub fn new() -> Self {
        Self::default()
    }

    /// Patch the status
    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Replace the notes
    pub fn with_notes(mut self, notes: Vec<Note>) -> Self {
        self.notes = Some(notes);
        self
    }

    /// True if applying this patch changes nothing on any task
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.notes.is_none()
    }

    /// Merge this patch over `task`
    pub fn apply(&self, task: &Task) -> Task {
        Task {
            id: task.id.clone(),
            name: task.name.clone(),
            status: self.status.unwrap_or(task.status),
            notes: self.notes.clone().unwrap_or_else(|| task.notes.clone()),
        }
    }
}
