use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

#[cfg(test)]
use mockall::automock;

use crate::error::{AppError, AppResult};

/// Blob holding the opaque OAuth token payload.
pub const TOKENS_KEY: &str = "tokens";
/// Blob holding the serialized event cache.
pub const EVENTS_KEY: &str = "events";

/// Generic persistence for small named blobs. Keys are logical names, not
/// paths; the implementation decides where bytes actually live.
#[cfg_attr(test, automock)]
pub trait BlobStore: Send + Sync {
    /// Returns `Ok(None)` when the blob has never been written.
    fn load(&self, key: &str) -> AppResult<Option<Vec<u8>>>;
    fn save(&self, key: &str, bytes: &[u8]) -> AppResult<()>;
}

/// Stores each blob as `<dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> AppResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| {
            AppError::storage(format!(
                "failed to create data directory {}: {}",
                dir.display(),
                e
            ))
        })?;
        Ok(Self { dir })
    }

    /// Platform data directory for this app, with a cwd fallback for odd
    /// environments without one.
    pub fn default_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("caltray")
    }

    fn blob_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl BlobStore for FileStore {
    fn load(&self, key: &str) -> AppResult<Option<Vec<u8>>> {
        let path = self.blob_path(key);
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::storage(format!(
                "failed to read {}: {}",
                path.display(),
                e
            ))),
        }
    }

    fn save(&self, key: &str, bytes: &[u8]) -> AppResult<()> {
        let path = self.blob_path(key);
        fs::write(&path, bytes).map_err(|e| {
            AppError::storage(format!("failed to write {}: {}", path.display(), e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_save_then_load_round_trips() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path()).unwrap();

        store.save("tokens", b"{\"access_token\":\"abc\"}").unwrap();
        let loaded = store.load("tokens").unwrap();
        assert_eq!(loaded.as_deref(), Some(b"{\"access_token\":\"abc\"}".as_ref()));
    }

    #[test]
    fn test_load_missing_blob_is_none() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path()).unwrap();
        assert!(store.load("events").unwrap().is_none());
    }

    #[test]
    fn test_new_creates_nested_directories() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a").join("b");
        let store = FileStore::new(&nested).unwrap();

        store.save("events", b"[]").unwrap();
        assert!(nested.join("events.json").exists());
    }

    #[test]
    fn test_blobs_do_not_collide() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path()).unwrap();

        store.save("tokens", b"t").unwrap();
        store.save("events", b"e").unwrap();
        assert_eq!(store.load("tokens").unwrap().as_deref(), Some(b"t".as_ref()));
        assert_eq!(store.load("events").unwrap().as_deref(), Some(b"e".as_ref()));
    }
}
