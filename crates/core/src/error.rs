//! Error types for the core library

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Note {index} not found on task {task_id}")]
    NoteNotFound { task_id: String, index: usize },

    #[error("Tasks could not be read, refusing to overwrite them: {0}")]
    NotLoaded(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Storage error: {0}")]
    Kv(#[from] kv_store::KvError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),
}
