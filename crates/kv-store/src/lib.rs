//! Key-value persistence library
//!
//! This crate provides the storage port the task store writes through,
//! plus an in-memory adapter and a file-per-key adapter for device storage.

mod backend;
mod error;
mod file;
mod memory;

pub use backend::KeyValueBackend;
pub use error::{KvError, Result};
pub use file::FileBackend;
pub use memory::MemoryBackend;
