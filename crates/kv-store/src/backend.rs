//! Backend trait
//!
//! Defines the asynchronous get/set/remove interface of on-device storage.

use async_trait::async_trait;

use crate::Result;

/// String blobs stored under string keys.
///
/// Durability and atomicity of a single `set` are the implementor's
/// responsibility. Callers never see partial writes.
#[async_trait]
pub trait KeyValueBackend: Send + Sync {
    /// Read the value stored under `key`, or `None` when absent
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove `key`. Removing an absent key succeeds.
    async fn remove(&self, key: &str) -> Result<()>;
}
