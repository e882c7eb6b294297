use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

use crate::config::UploadConfig;

/// Error raised by an image store.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("could not persist {name}: {source}")]
    Persist {
        name: String,
        #[source]
        source: std::io::Error,
    },
    #[error("could not delete {path}: {source}")]
    Delete {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("blob store unavailable: {0}")]
    Unavailable(String),
}

/// Distinguishes an actual removal from a file that was already gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    Missing,
}

/// Blob boundary for processed images. `store` returns the stable public
/// path later embedded in records; `delete` takes that same path back.
pub trait ImageStore: Send + Sync {
    fn store(&self, bytes: &[u8], filename: &str) -> Result<String, StorageError>;
    fn delete(&self, path: &str) -> Result<DeleteOutcome, StorageError>;
}

/// Filesystem store writing under a configured root and addressing files
/// through a public base path.
pub struct FsImageStore {
    root: PathBuf,
    public_base: String,
}

impl FsImageStore {
    pub fn new(config: &UploadConfig) -> Self {
        Self {
            root: config.directory.clone(),
            public_base: config.public_base.trim_end_matches('/').to_string(),
        }
    }

    /// Maps a public path back to the managed file name. Anything outside
    /// the public base, or containing path structure, is not ours.
    fn managed_name<'a>(&self, path: &'a str) -> Option<&'a str> {
        let name = path.strip_prefix(self.public_base.as_str())?;
        let name = name.strip_prefix('/')?;
        if name.is_empty() || name.contains('/') || name.contains("..") {
            return None;
        }
        Some(name)
    }
}

impl ImageStore for FsImageStore {
    fn store(&self, bytes: &[u8], filename: &str) -> Result<String, StorageError> {
        fs::create_dir_all(&self.root).map_err(|source| StorageError::Persist {
            name: filename.to_string(),
            source,
        })?;
        fs::write(self.root.join(filename), bytes).map_err(|source| StorageError::Persist {
            name: filename.to_string(),
            source,
        })?;
        Ok(format!("{}/{}", self.public_base, filename))
    }

    fn delete(&self, path: &str) -> Result<DeleteOutcome, StorageError> {
        let Some(name) = self.managed_name(path) else {
            return Ok(DeleteOutcome::Missing);
        };
        match fs::remove_file(self.root.join(name)) {
            Ok(()) => Ok(DeleteOutcome::Deleted),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(DeleteOutcome::Missing),
            Err(source) => Err(StorageError::Delete {
                path: path.to_string(),
                source,
            }),
        }
    }
}

/// Store backed by process memory for tests and the demo.
pub struct InMemoryImageStore {
    files: Mutex<HashMap<String, Vec<u8>>>,
    public_base: String,
}

impl Default for InMemoryImageStore {
    fn default() -> Self {
        Self {
            files: Mutex::new(HashMap::new()),
            public_base: "/uploads".to_string(),
        }
    }
}

impl InMemoryImageStore {
    fn files(&self) -> Result<MutexGuard<'_, HashMap<String, Vec<u8>>>, StorageError> {
        self.files
            .lock()
            .map_err(|_| StorageError::Unavailable("image store mutex poisoned".to_string()))
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files
            .lock()
            .map(|files| files.contains_key(path))
            .unwrap_or(false)
    }

    pub fn bytes(&self, path: &str) -> Option<Vec<u8>> {
        self.files.lock().ok()?.get(path).cloned()
    }

    pub fn stored_count(&self) -> usize {
        self.files.lock().map(|files| files.len()).unwrap_or(0)
    }
}

impl ImageStore for InMemoryImageStore {
    fn store(&self, bytes: &[u8], filename: &str) -> Result<String, StorageError> {
        let path = format!("{}/{}", self.public_base, filename);
        self.files()?.insert(path.clone(), bytes.to_vec());
        Ok(path)
    }

    fn delete(&self, path: &str) -> Result<DeleteOutcome, StorageError> {
        match self.files()?.remove(path) {
            Some(_) => Ok(DeleteOutcome::Deleted),
            None => Ok(DeleteOutcome::Missing),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn scratch_store() -> (FsImageStore, PathBuf) {
        let root = std::env::temp_dir().join(format!("collegium-store-{}", Uuid::new_v4()));
        let store = FsImageStore::new(&UploadConfig {
            directory: root.clone(),
            public_base: "/uploads/".to_string(),
        });
        (store, root)
    }

    #[test]
    fn fs_store_roundtrip() {
        let (store, root) = scratch_store();

        let path = store
            .store(b"jpeg-bytes", "campus-test.jpg")
            .expect("store succeeds");
        assert_eq!(path, "/uploads/campus-test.jpg");
        assert!(root.join("campus-test.jpg").exists());

        assert_eq!(
            store.delete(&path).expect("delete succeeds"),
            DeleteOutcome::Deleted
        );
        assert_eq!(
            store.delete(&path).expect("second delete succeeds"),
            DeleteOutcome::Missing
        );

        fs::remove_dir_all(root).ok();
    }

    #[test]
    fn fs_store_ignores_foreign_paths() {
        let (store, root) = scratch_store();

        assert_eq!(
            store
                .delete("/images/placeholder.jpg")
                .expect("delete succeeds"),
            DeleteOutcome::Missing
        );
        assert_eq!(
            store
                .delete("/uploads/../../etc/passwd")
                .expect("delete succeeds"),
            DeleteOutcome::Missing
        );

        fs::remove_dir_all(root).ok();
    }

    #[test]
    fn in_memory_store_tracks_files() {
        let store = InMemoryImageStore::default();

        let path = store.store(b"bytes", "campus-a.jpg").expect("store");
        assert!(store.contains(&path));
        assert_eq!(store.stored_count(), 1);

        assert_eq!(
            store.delete(&path).expect("delete"),
            DeleteOutcome::Deleted
        );
        assert_eq!(store.stored_count(), 0);
        assert_eq!(
            store.delete(&path).expect("delete"),
            DeleteOutcome::Missing
        );
    }
}
