//! File-based backend
//!
//! Stores each key as its own file under a root directory:
//! ```text
//! <root>/
//!   tasks               # JSON task collection
//!   photoUri-1700000000 # transient media hand-off
//! ```

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::backend::KeyValueBackend;
use crate::error::{KvError, Result};

/// Key-value backend persisting one file per key
#[derive(Debug, Clone)]
pub struct FileBackend {
    root: PathBuf,
}

impl FileBackend {
    /// Create a backend rooted at `root`.
    ///
    /// The directory is created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory of this backend
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the file holding `key`
    pub fn path_for(&self, key: &str) -> Result<PathBuf> {
        Ok(self.root.join(encode_key(key)?))
    }
}

/// Map a key onto a portable file name.
///
/// ASCII alphanumerics, `-` and `_` pass through, as does `.` except in
/// leading position. Everything else becomes `%XX` per UTF-8 byte.
fn encode_key(key: &str) -> Result<String> {
    if key.is_empty() {
        return Err(KvError::InvalidKey {
            key: key.to_string(),
        });
    }

    let mut encoded = String::with_capacity(key.len());
    for (i, byte) in key.bytes().enumerate() {
        let keep = byte.is_ascii_alphanumeric()
            || byte == b'-'
            || byte == b'_'
            || (byte == b'.' && i > 0);
        if keep {
            encoded.push(byte as char);
        } else {
            encoded.push_str(&format!("%{:02X}", byte));
        }
    }
    Ok(encoded)
}

#[async_trait]
impl KeyValueBackend for FileBackend {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(KvError::ReadFailed {
                key: key.to_string(),
                path,
                source,
            }),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key)?;
        let write_failed = |source| KvError::WriteFailed {
            key: key.to_string(),
            path: path.clone(),
            source,
        };

        // Ensure root directory exists
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(write_failed)?;

        // Write to a sibling first so readers never observe a torn value
        let tmp = self
            .root
            .join(format!(".{}.{}.tmp", encode_key(key)?, Uuid::new_v4()));
        tokio::fs::write(&tmp, value).await.map_err(write_failed)?;

        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            if let Err(cleanup) = tokio::fs::remove_file(&tmp).await {
                warn!("Failed to remove temp file {}: {}", tmp.display(), cleanup);
            }
            return Err(write_failed(e));
        }

        debug!("Wrote {} bytes to {}", value.len(), path.display());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!("Removed {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(KvError::RemoveFailed {
                key: key.to_string(),
                path,
                source,
            }),
        }
    }
}
