//! Task module
//!
//! This module contains the task model and the store that owns it.

mod model;
mod store;

pub use model::*;
pub use store::{LoadOutcome, TaskSnapshot, TaskStore, TaskStoreBuilder};
