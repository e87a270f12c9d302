//! Key/value stores holding the persisted blobs.

use std::{
    collections::HashMap,
    fs, io,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use crate::PersistenceError;

/// String blobs addressed by key.
pub trait Storage: Send {
    /// Reads the blob stored under `key`, if any.
    fn read(&self, key: &str) -> Result<Option<String>, PersistenceError>;

    /// Replaces the blob stored under `key`.
    fn write(&mut self, key: &str, value: &str) -> Result<(), PersistenceError>;
}

/// In-process storage. Clones share the same entries, so several backends
/// can play separate sessions over one store.
#[derive(Clone, Debug, Default)]
pub struct MemoryStorage {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStorage {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn read(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| PersistenceError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), PersistenceError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| PersistenceError::Poisoned)?;
        let _ = entries.insert(key.to_owned(), value.to_owned());
        Ok(())
    }
}

/// Storage keeping one `<key>.json` file per key inside a directory.
#[derive(Clone, Debug)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Creates a store rooted at `dir`. The directory is created on first write.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// File backing `key`.
    #[must_use]
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl Storage for FileStorage {
    fn read(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(text) => Ok(Some(text)),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(PersistenceError::Io { path, source }),
        }
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), PersistenceError> {
        let path = self.path_for(key);
        write_atomic(&path, value.as_bytes()).map_err(|source| PersistenceError::Io { path, source })
    }
}

/// Writes through a sibling `.tmp` file so readers never see a partial blob.
fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp_path = temp_path_for(path);
    fs::write(&tmp_path, bytes)?;

    match fs::remove_file(path) {
        Ok(()) => {}
        Err(error) if error.kind() == io::ErrorKind::NotFound => {}
        Err(error) => {
            let _ = fs::remove_file(&tmp_path);
            return Err(error);
        }
    }
    if let Err(error) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(error);
    }
    Ok(())
}

fn temp_path_for(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("state");
    path.with_file_name(format!("{file_name}.tmp"))
}
