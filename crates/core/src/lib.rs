//! Core library for Pocket Tasks
//!
//! This crate contains the task store and everything it leans on:
//! - Task and note model
//! - Task store with persistence and change notifications
//! - Media hand-off from the camera screen
//! - Clock and id ports

pub mod config;
pub mod error;
pub mod handoff;
pub mod ports;
pub mod task;

pub use config::StoreConfig;
pub use error::Error;
pub type Result<T> = std::result::Result<T, Error>;
