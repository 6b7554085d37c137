use std::fs;
use std::path::PathBuf;

use thiserror::Error;

pub const PROJECTS_KEY: &str = "projects";
pub const SETTINGS_KEY: &str = "settings";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write '{path}': {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to clear store at '{path}': {source}")]
    Clear {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Durable key-value storage for the repository. Keys are `projects` and
/// `settings`; values are JSON strings. Kept as a trait so the repository
/// can be exercised without touching the filesystem.
pub trait KvStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
    /// Wipes every key. Used by the destructive reset.
    fn clear(&mut self) -> Result<(), StoreError>;
}

/// One `<key>.json` file per key under the data directory.
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        JsonFileStore { dir: dir.into() }
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl KvStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.key_path(key);
        if !path.exists() {
            return Ok(None);
        }
        fs::read_to_string(&path)
            .map(Some)
            .map_err(|source| StoreError::Read { path, source })
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.key_path(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| StoreError::Write {
                path: path.clone(),
                source,
            })?;
        }
        fs::write(&path, value).map_err(|source| StoreError::Write { path, source })
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        for key in [PROJECTS_KEY, SETTINGS_KEY] {
            let path = self.key_path(key);
            if path.exists() {
                fs::remove_file(&path).map_err(|source| StoreError::Clear { path, source })?;
            }
        }
        Ok(())
    }
}
